//! `ListSets` payload validation.

use crate::error::StructuralError;
use crate::types::{ListResponse, Set};
use crate::verbs::shared::{
    check_key_count, check_known_keys, check_no_attributes, element_content, key_as_text,
    owned_elements, parse_list,
};
use crate::xml::RawElement;

fn parse_set(element: &RawElement<'_, '_>, path: &str) -> Result<Set, StructuralError> {
    check_no_attributes(element, path)?;
    let record = element_content(element, path)?;
    check_known_keys(&record, path, &["setSpec", "setName", "setDescription"])?;
    check_key_count(&record, path, 2, 3)?;

    Ok(Set {
        set_spec: key_as_text(&record, path, "setSpec")?,
        set_name: key_as_text(&record, path, "setName")?,
        set_description: owned_elements(&record, "setDescription"),
    })
}

pub(crate) fn parse_list_sets(
    payload: &RawElement<'_, '_>,
) -> Result<ListResponse<Set>, StructuralError> {
    parse_list(payload, "OAI-PMH/ListSets", "set", parse_set)
}
