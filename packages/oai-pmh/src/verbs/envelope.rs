//! Validation of the `<OAI-PMH>` envelope shared by every response.

use roxmltree::Document;

use crate::error::{ErrorCode, ErrorPayload, ProtocolError, RequestInfo, StructuralError};
use crate::types::Verb;
use crate::verbs::shared::{
    check_key_count, check_no_attributes, child_path, element_content, key_as_text, single,
    text_with_attributes,
};
use crate::verbs::Rejection;
use crate::xml::{normalize, Content, RawElement};

const ROOT: &str = "OAI-PMH";

const ERROR_CODES: &str = "badArgument, badResumptionToken, badVerb, cannotDisseminateFormat, \
    idDoesNotExist, noRecordsMatch, noMetadataFormats, noSetHierarchy";

/// A validated envelope holding one verb payload.
#[derive(Debug)]
pub(crate) struct Envelope<'a, 'input> {
    pub verb: Verb,
    pub payload: RawElement<'a, 'input>,
}

/// Check the envelope shape and locate the verb payload.
///
/// An `<error>` payload is turned into a [`ProtocolError`].
pub(crate) fn open_envelope<'a, 'input>(
    doc: &'a Document<'input>,
) -> Result<Envelope<'a, 'input>, Rejection> {
    let top = normalize(doc.root(), "document")?;
    let top = match top.content {
        Content::Record(record) => record,
        Content::Text(_) => {
            return Err(StructuralError::ExpectedElements {
                path: "document".to_string(),
            }
            .into())
        }
    };

    let oai = single(&top, "document", ROOT)?.clone();
    check_key_count(&top, "document", 1, 1)?;

    let inner = element_content(&oai, ROOT)?;
    let request = single(&inner, ROOT, "request")?;
    single(&inner, ROOT, "responseDate")?;
    check_key_count(&inner, ROOT, 3, 3)?;

    // exactly three keys, two of which are known: the third is the payload
    let payload_key = inner
        .keys()
        .find(|key| *key != "request" && *key != "responseDate")
        .ok_or_else(|| StructuralError::ExpectedKey {
            path: ROOT.to_string(),
            key: "error".to_string(),
        })?;

    if payload_key == "error" {
        let (url, attributes) = text_with_attributes(request, &child_path(ROOT, "request"))?;
        let response_date = key_as_text(&inner, ROOT, "responseDate")?;
        let errors = inner
            .get("error")
            .unwrap_or_default()
            .iter()
            .map(parse_error_payload)
            .collect::<Result<Vec<_>, _>>()?;

        return Err(Rejection::Protocol(ProtocolError {
            errors,
            request: RequestInfo { url, attributes },
            response_date,
        }));
    }

    let verb: Verb = payload_key
        .parse()
        .map_err(|key| StructuralError::UnexpectedKey {
            path: ROOT.to_string(),
            key,
        })?;

    let path = child_path(ROOT, payload_key);
    let payload = single(&inner, ROOT, payload_key)?;
    check_no_attributes(payload, &path)?;
    if !payload.has_children() {
        return Err(StructuralError::EmptyElement { path }.into());
    }

    Ok(Envelope {
        verb,
        payload: payload.clone(),
    })
}

fn parse_error_payload(element: &RawElement<'_, '_>) -> Result<ErrorPayload, StructuralError> {
    let path = child_path(ROOT, "error");
    let (text, attributes) = text_with_attributes(element, &path)?;

    if let Some(other) = attributes.keys().find(|name| *name != "code") {
        return Err(StructuralError::UnexpectedAttribute {
            path,
            attribute: other.clone(),
        });
    }

    let value = attributes
        .get("code")
        .ok_or_else(|| StructuralError::MissingAttribute {
            path: path.clone(),
            attribute: "code",
        })?;

    let code: ErrorCode = value.parse().map_err(|value| StructuralError::InvalidValue {
        path: format!("{path}@code"),
        value,
        expected: ERROR_CODES,
    })?;

    Ok(ErrorPayload {
        code,
        text: (!text.is_empty()).then_some(text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_document;

    fn wrap(payload: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
  <responseDate>2024-01-01T00:00:00Z</responseDate>
  <request verb="ListSets">http://example.org/oai</request>
  {payload}
</OAI-PMH>"#
        )
    }

    fn open(xml: &str) -> Result<Verb, Rejection> {
        let doc = parse_document(xml)?;
        open_envelope(&doc).map(|envelope| envelope.verb)
    }

    fn structural(xml: &str) -> StructuralError {
        match open(xml) {
            Err(Rejection::Structural(e)) => e,
            other => panic!("expected structural error, got {other:?}"),
        }
    }

    #[test]
    fn test_locates_verb_payload() {
        let xml = wrap("<ListSets><set><setSpec>a</setSpec><setName>A</setName></set></ListSets>");
        assert_eq!(open(&xml).unwrap(), Verb::ListSets);
    }

    #[test]
    fn test_error_payload_becomes_protocol_error() {
        let xml = wrap(r#"<error code="noSetHierarchy"/>"#);
        match open(&xml) {
            Err(Rejection::Protocol(err)) => {
                assert_eq!(
                    err.errors,
                    vec![ErrorPayload {
                        code: ErrorCode::NoSetHierarchy,
                        text: None
                    }]
                );
                assert_eq!(err.request.url, "http://example.org/oai");
                assert_eq!(
                    err.request.attributes.get("verb").map(String::as_str),
                    Some("ListSets")
                );
                assert_eq!(err.response_date, "2024-01-01T00:00:00Z");
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[test]
    fn test_multiple_errors_keep_text() {
        let xml = wrap(
            r#"<error code="badArgument">bad from</error><error code="badVerb">no such verb</error>"#,
        );
        match open(&xml) {
            Err(Rejection::Protocol(err)) => {
                assert_eq!(err.errors.len(), 2);
                assert_eq!(err.errors[0].text.as_deref(), Some("bad from"));
                assert_eq!(err.errors[1].code, ErrorCode::BadVerb);
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_error_code_is_structural() {
        let xml = wrap(r#"<error code="tooBusy"/>"#);
        assert!(matches!(
            structural(&xml),
            StructuralError::InvalidValue { .. }
        ));
    }

    #[test]
    fn test_extra_error_attribute_is_structural() {
        let xml = wrap(r#"<error code="badVerb" lang="en"/>"#);
        assert!(matches!(
            structural(&xml),
            StructuralError::UnexpectedAttribute { .. }
        ));
    }

    #[test]
    fn test_prefixed_code_attribute_is_not_the_code() {
        let xml = wrap(r#"<error xmlns:p="urn:p" p:code="tooBusy" code="badVerb"/>"#);
        assert_eq!(
            structural(&xml),
            StructuralError::UnexpectedAttribute {
                path: "OAI-PMH/error".to_string(),
                attribute: "p:code".to_string()
            }
        );
    }

    #[test]
    fn test_missing_request_is_structural() {
        let xml = r#"<OAI-PMH><responseDate>x</responseDate><Identify><a/></Identify></OAI-PMH>"#;
        assert_eq!(
            structural(xml),
            StructuralError::ExpectedKey {
                path: "OAI-PMH".to_string(),
                key: "request".to_string()
            }
        );
    }

    #[test]
    fn test_two_payloads_are_structural() {
        let xml = wrap("<Identify><a/></Identify><ListSets><b/></ListSets>");
        assert!(matches!(
            structural(&xml),
            StructuralError::KeyCount { found: 4, .. }
        ));
    }

    #[test]
    fn test_unknown_payload_is_structural() {
        let xml = wrap("<ListEverything><a/></ListEverything>");
        assert!(matches!(
            structural(&xml),
            StructuralError::UnexpectedKey { .. }
        ));
    }

    #[test]
    fn test_empty_payload_is_structural() {
        let xml = wrap("<ListSets/>");
        assert_eq!(
            structural(&xml),
            StructuralError::EmptyElement {
                path: "OAI-PMH/ListSets".to_string()
            }
        );
    }

    #[test]
    fn test_wrong_root_is_structural() {
        assert!(matches!(
            structural("<html><body/></html>"),
            StructuralError::ExpectedKey { .. }
        ));
    }
}
