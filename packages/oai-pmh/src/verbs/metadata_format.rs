//! `ListMetadataFormats` payload validation.
//!
//! This verb is not paged: the whole list arrives in one response.

use crate::error::StructuralError;
use crate::types::MetadataFormat;
use crate::verbs::shared::{
    check_key_count, check_known_keys, check_no_attributes, child_path, element_content,
    key_as_text,
};
use crate::xml::RawElement;

const PATH: &str = "OAI-PMH/ListMetadataFormats";

fn parse_metadata_format(
    element: &RawElement<'_, '_>,
    path: &str,
) -> Result<MetadataFormat, StructuralError> {
    check_no_attributes(element, path)?;
    let record = element_content(element, path)?;
    check_known_keys(&record, path, &["metadataPrefix", "schema", "metadataNamespace"])?;
    check_key_count(&record, path, 3, 3)?;

    Ok(MetadataFormat {
        metadata_prefix: key_as_text(&record, path, "metadataPrefix")?,
        schema: key_as_text(&record, path, "schema")?,
        metadata_namespace: key_as_text(&record, path, "metadataNamespace")?,
    })
}

pub(crate) fn parse_list_metadata_formats(
    payload: &RawElement<'_, '_>,
) -> Result<Vec<MetadataFormat>, StructuralError> {
    let record = element_content(payload, PATH)?;
    check_known_keys(&record, PATH, &["metadataFormat"])?;

    let path = child_path(PATH, "metadataFormat");
    record
        .get("metadataFormat")
        .unwrap_or_default()
        .iter()
        .map(|element| parse_metadata_format(element, &path))
        .collect()
}
