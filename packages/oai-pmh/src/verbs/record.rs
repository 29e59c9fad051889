//! `GetRecord` and `ListRecords` payload validation.

use crate::error::StructuralError;
use crate::types::{ListResponse, Record};
use crate::verbs::header::parse_header;
use crate::verbs::shared::{
    check_key_count, check_known_keys, check_no_attributes, child_path, element_content,
    optional_single, owned_elements, parse_list, single,
};
use crate::xml::RawElement;

/// Validate a `<record>`: one header, at most one metadata, any number of abouts.
///
/// Metadata content is kept as opaque child nodes.
pub(crate) fn parse_record(
    element: &RawElement<'_, '_>,
    path: &str,
) -> Result<Record, StructuralError> {
    check_no_attributes(element, path)?;
    let record = element_content(element, path)?;
    check_known_keys(&record, path, &["header", "metadata", "about"])?;
    check_key_count(&record, path, 1, 3)?;

    let header = single(&record, path, "header")?;
    let header = parse_header(header, &child_path(path, "header"))?;

    let metadata = optional_single(&record, path, "metadata")?
        .map(|metadata| {
            check_no_attributes(metadata, &child_path(path, "metadata"))?;
            Ok::<_, StructuralError>(metadata.owned_children())
        })
        .transpose()?;

    Ok(Record {
        header,
        metadata,
        about: owned_elements(&record, "about"),
    })
}

pub(crate) fn parse_get_record(payload: &RawElement<'_, '_>) -> Result<Record, StructuralError> {
    const PATH: &str = "OAI-PMH/GetRecord";

    let record = element_content(payload, PATH)?;
    check_known_keys(&record, PATH, &["record"])?;
    let element = single(&record, PATH, "record")?;
    parse_record(element, &child_path(PATH, "record"))
}

pub(crate) fn parse_list_records(
    payload: &RawElement<'_, '_>,
) -> Result<ListResponse<Record>, StructuralError> {
    parse_list(payload, "OAI-PMH/ListRecords", "record", parse_record)
}
