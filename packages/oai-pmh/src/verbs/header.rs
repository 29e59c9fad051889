//! `ListIdentifiers` payload and record header validation.

use crate::error::StructuralError;
use crate::types::{Header, ListResponse};
use crate::verbs::shared::{
    check_key_count, check_known_keys, element_content, key_as_text, key_as_text_list, parse_list,
};
use crate::xml::RawElement;

const PATH: &str = "OAI-PMH/ListIdentifiers";

/// Validate a `<header>`, wherever it appears.
///
/// The only attribute a header may carry is `status="deleted"`.
pub(crate) fn parse_header(
    element: &RawElement<'_, '_>,
    path: &str,
) -> Result<Header, StructuralError> {
    let mut is_deleted = false;
    for attr in &element.attributes {
        if attr.prefix.is_some() || attr.name != "status" {
            return Err(StructuralError::UnexpectedAttribute {
                path: path.to_string(),
                attribute: attr.qualified_name(),
            });
        }
        if attr.value != "deleted" {
            return Err(StructuralError::InvalidValue {
                path: format!("{path}@status"),
                value: attr.value.to_string(),
                expected: "deleted",
            });
        }
        is_deleted = true;
    }

    let record = element_content(element, path)?;
    check_known_keys(&record, path, &["identifier", "datestamp", "setSpec"])?;
    check_key_count(&record, path, 2, 3)?;

    Ok(Header {
        identifier: key_as_text(&record, path, "identifier")?,
        datestamp: key_as_text(&record, path, "datestamp")?,
        set_spec: key_as_text_list(&record, path, "setSpec")?,
        is_deleted,
    })
}

pub(crate) fn parse_list_identifiers(
    payload: &RawElement<'_, '_>,
) -> Result<ListResponse<Header>, StructuralError> {
    parse_list(payload, PATH, "header", parse_header)
}
