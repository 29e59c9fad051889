//! Field-level checks shared by the envelope and verb validators.

use std::collections::BTreeMap;

use crate::error::StructuralError;
use crate::types::ListResponse;
use crate::xml::{Content, ElementRecord, RawElement, XmlElement};

/// Path of a child element, for error messages.
pub(crate) fn child_path(path: &str, key: &str) -> String {
    format!("{path}/{key}")
}

/// Normalize an element that must contain element children.
pub(crate) fn element_content<'a, 'input>(
    element: &RawElement<'a, 'input>,
    path: &str,
) -> Result<ElementRecord<'a, 'input>, StructuralError> {
    let normalized = element
        .normalize_children(path)?
        .ok_or_else(|| StructuralError::EmptyElement {
            path: path.to_string(),
        })?;

    match normalized.content {
        Content::Record(record) if record.is_empty() => Err(StructuralError::EmptyElement {
            path: path.to_string(),
        }),
        Content::Record(record) => Ok(record),
        Content::Text(_) => Err(StructuralError::ExpectedElements {
            path: path.to_string(),
        }),
    }
}

/// Reject any element name outside `allowed`.
pub(crate) fn check_known_keys(
    record: &ElementRecord<'_, '_>,
    path: &str,
    allowed: &[&str],
) -> Result<(), StructuralError> {
    match record.keys().find(|key| !allowed.contains(key)) {
        Some(key) => Err(StructuralError::UnexpectedKey {
            path: path.to_string(),
            key: key.to_string(),
        }),
        None => Ok(()),
    }
}

/// Require between `min` and `max` distinct element names.
pub(crate) fn check_key_count(
    record: &ElementRecord<'_, '_>,
    path: &str,
    min: usize,
    max: usize,
) -> Result<(), StructuralError> {
    let found = record.len();
    if (min..=max).contains(&found) {
        Ok(())
    } else {
        Err(StructuralError::KeyCount {
            path: path.to_string(),
            min,
            max,
            found,
        })
    }
}

pub(crate) fn check_no_attributes(
    element: &RawElement<'_, '_>,
    path: &str,
) -> Result<(), StructuralError> {
    match element.attributes.first() {
        Some(attribute) => Err(StructuralError::UnexpectedAttribute {
            path: path.to_string(),
            attribute: attribute.qualified_name(),
        }),
        None => Ok(()),
    }
}

/// The element stored under `key`, which must occur exactly once.
pub(crate) fn single<'r, 'a, 'input>(
    record: &'r ElementRecord<'a, 'input>,
    path: &str,
    key: &str,
) -> Result<&'r RawElement<'a, 'input>, StructuralError> {
    match record.get(key) {
        None => Err(StructuralError::ExpectedKey {
            path: path.to_string(),
            key: key.to_string(),
        }),
        Some([element]) => Ok(element),
        Some(elements) => Err(StructuralError::Cardinality {
            path: child_path(path, key),
            expected: "exactly one",
            found: elements.len(),
        }),
    }
}

/// The element stored under `key`, which may occur at most once.
pub(crate) fn optional_single<'r, 'a, 'input>(
    record: &'r ElementRecord<'a, 'input>,
    path: &str,
    key: &str,
) -> Result<Option<&'r RawElement<'a, 'input>>, StructuralError> {
    match record.get(key) {
        None => Ok(None),
        Some([element]) => Ok(Some(element)),
        Some(elements) => Err(StructuralError::Cardinality {
            path: child_path(path, key),
            expected: "at most one",
            found: elements.len(),
        }),
    }
}

/// Text content of an element, or `None` when it has no content at all.
fn optional_text(
    element: &RawElement<'_, '_>,
    path: &str,
) -> Result<Option<String>, StructuralError> {
    let Some(normalized) = element.normalize_children(path)? else {
        return Ok(None);
    };

    match normalized.content {
        Content::Text(text) => Ok(Some(text)),
        Content::Record(record) if record.is_empty() => Ok(None),
        Content::Record(_) => Err(StructuralError::ExpectedText {
            path: path.to_string(),
        }),
    }
}

/// Text of an element that carries no attributes and must not be empty.
pub(crate) fn text_of(element: &RawElement<'_, '_>, path: &str) -> Result<String, StructuralError> {
    check_no_attributes(element, path)?;
    optional_text(element, path)?.ok_or_else(|| StructuralError::ExpectedText {
        path: path.to_string(),
    })
}

/// Text of the single element under `key`.
pub(crate) fn key_as_text(
    record: &ElementRecord<'_, '_>,
    path: &str,
    key: &str,
) -> Result<String, StructuralError> {
    let element = single(record, path, key)?;
    text_of(element, &child_path(path, key))
}

/// Texts of all elements under `key`, or `None` when the key is absent.
pub(crate) fn key_as_text_list(
    record: &ElementRecord<'_, '_>,
    path: &str,
    key: &str,
) -> Result<Option<Vec<String>>, StructuralError> {
    let Some(elements) = record.get(key) else {
        return Ok(None);
    };
    let path = child_path(path, key);
    elements
        .iter()
        .map(|element| text_of(element, &path))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Text content (possibly empty) plus attribute values by qualified name.
pub(crate) fn text_with_attributes(
    element: &RawElement<'_, '_>,
    path: &str,
) -> Result<(String, BTreeMap<String, String>), StructuralError> {
    let text = optional_text(element, path)?.unwrap_or_default();
    let attributes = element
        .attributes
        .iter()
        .map(|attr| (attr.qualified_name(), attr.value.to_string()))
        .collect();
    Ok((text, attributes))
}

/// Owned copies of all elements under `key`, or `None` when absent.
pub(crate) fn owned_elements(record: &ElementRecord<'_, '_>, key: &str) -> Option<Vec<XmlElement>> {
    record
        .get(key)
        .map(|elements| elements.iter().map(RawElement::to_owned_element).collect())
}

/// The `<resumptionToken>` of a list response.
///
/// Absent, empty and whitespace-only tokens all mean the list is complete.
/// Attributes (`cursor`, `completeListSize`, `expirationDate`) are allowed.
pub(crate) fn resumption_token(
    record: &ElementRecord<'_, '_>,
    path: &str,
) -> Result<Option<String>, StructuralError> {
    let Some(element) = optional_single(record, path, "resumptionToken")? else {
        return Ok(None);
    };
    let token = optional_text(element, &child_path(path, "resumptionToken"))?;
    Ok(token.filter(|t| !t.trim().is_empty()))
}

/// Validate a paged list payload: one or more `item_key` elements and an
/// optional resumption token, nothing else.
pub(crate) fn parse_list<'a, 'input, T>(
    payload: &RawElement<'a, 'input>,
    path: &str,
    item_key: &str,
    parse_item: impl Fn(&RawElement<'a, 'input>, &str) -> Result<T, StructuralError>,
) -> Result<ListResponse<T>, StructuralError> {
    let record = element_content(payload, path)?;
    check_known_keys(&record, path, &[item_key, "resumptionToken"])?;
    check_key_count(&record, path, 1, 2)?;

    let resumption_token = resumption_token(&record, path)?;

    let items = record
        .get(item_key)
        .ok_or_else(|| StructuralError::ExpectedKey {
            path: path.to_string(),
            key: item_key.to_string(),
        })?;

    let item_path = child_path(path, item_key);
    let records = items
        .iter()
        .map(|item| parse_item(item, &item_path))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ListResponse {
        records,
        resumption_token,
    })
}
