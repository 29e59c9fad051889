//! Response validation: the envelope plus one validator per verb.
//!
//! Every function here takes the raw response text and either returns the
//! typed payload or an [`OaiPmhError`]:
//!
//! - malformed or non-conformant XML becomes [`OaiPmhError::Validation`],
//!   carrying the original text;
//! - an `<error>` envelope becomes [`OaiPmhError::Protocol`].
//!
//! Parsing is pure; the same text always gives the same result.

mod envelope;
mod header;
mod identify;
mod metadata_format;
mod record;
mod set;
mod shared;

use crate::error::{OaiPmhError, ProtocolError, Result, StructuralError, ValidationError};
use crate::types::{
    Header, Identify, ListResponse, MetadataFormat, OaiPmhResponse, Record, Set, Verb,
};
use crate::xml::{parse_document, RawElement};

use envelope::open_envelope;

/// Why a response was not accepted, before the raw text is attached.
#[derive(Debug)]
pub(crate) enum Rejection {
    Structural(StructuralError),
    Protocol(ProtocolError),
}

impl From<StructuralError> for Rejection {
    fn from(e: StructuralError) -> Self {
        Self::Structural(e)
    }
}

impl Rejection {
    fn into_error(self, xml: &str) -> OaiPmhError {
        match self {
            Self::Structural(source) => {
                tracing::debug!(error = %source, "response failed validation");
                OaiPmhError::Validation(ValidationError {
                    xml: xml.to_string(),
                    source,
                })
            }
            Self::Protocol(e) => OaiPmhError::Protocol(e),
        }
    }
}

type Validator = fn(&RawElement<'_, '_>) -> std::result::Result<OaiPmhResponse, StructuralError>;

fn validate_identify(
    payload: &RawElement<'_, '_>,
) -> std::result::Result<OaiPmhResponse, StructuralError> {
    identify::parse_identify(payload).map(OaiPmhResponse::Identify)
}

fn validate_get_record(
    payload: &RawElement<'_, '_>,
) -> std::result::Result<OaiPmhResponse, StructuralError> {
    record::parse_get_record(payload).map(OaiPmhResponse::GetRecord)
}

fn validate_list_identifiers(
    payload: &RawElement<'_, '_>,
) -> std::result::Result<OaiPmhResponse, StructuralError> {
    header::parse_list_identifiers(payload).map(OaiPmhResponse::ListIdentifiers)
}

fn validate_list_metadata_formats(
    payload: &RawElement<'_, '_>,
) -> std::result::Result<OaiPmhResponse, StructuralError> {
    metadata_format::parse_list_metadata_formats(payload).map(OaiPmhResponse::ListMetadataFormats)
}

fn validate_list_records(
    payload: &RawElement<'_, '_>,
) -> std::result::Result<OaiPmhResponse, StructuralError> {
    record::parse_list_records(payload).map(OaiPmhResponse::ListRecords)
}

fn validate_list_sets(
    payload: &RawElement<'_, '_>,
) -> std::result::Result<OaiPmhResponse, StructuralError> {
    set::parse_list_sets(payload).map(OaiPmhResponse::ListSets)
}

fn validator_for(verb: Verb) -> Validator {
    match verb {
        Verb::Identify => validate_identify,
        Verb::GetRecord => validate_get_record,
        Verb::ListIdentifiers => validate_list_identifiers,
        Verb::ListMetadataFormats => validate_list_metadata_formats,
        Verb::ListRecords => validate_list_records,
        Verb::ListSets => validate_list_sets,
    }
}

fn validate(xml: &str, expected: Option<Verb>) -> std::result::Result<OaiPmhResponse, Rejection> {
    let doc = parse_document(xml)?;
    let envelope = open_envelope(&doc)?;

    if let Some(expected) = expected {
        if envelope.verb != expected {
            return Err(StructuralError::UnexpectedVerb {
                expected: expected.as_str(),
                found: envelope.verb.as_str(),
            }
            .into());
        }
    }

    Ok(validator_for(envelope.verb)(&envelope.payload)?)
}

/// Validate any OAI-PMH response, whichever verb it answers.
pub fn parse_response(xml: &str) -> Result<OaiPmhResponse> {
    validate(xml, None).map_err(|rejection| rejection.into_error(xml))
}

fn parse_expecting(xml: &str, verb: Verb) -> Result<OaiPmhResponse> {
    validate(xml, Some(verb)).map_err(|rejection| rejection.into_error(xml))
}

// The validator for `verb` only ever produces the matching variant.
fn mismatch(xml: &str, verb: Verb, response: &OaiPmhResponse) -> OaiPmhError {
    OaiPmhError::Validation(ValidationError {
        xml: xml.to_string(),
        source: StructuralError::UnexpectedVerb {
            expected: verb.as_str(),
            found: response.verb().as_str(),
        },
    })
}

/// Validate an `Identify` response.
pub fn parse_identify(xml: &str) -> Result<Identify> {
    match parse_expecting(xml, Verb::Identify)? {
        OaiPmhResponse::Identify(identify) => Ok(identify),
        other => Err(mismatch(xml, Verb::Identify, &other)),
    }
}

/// Validate a `GetRecord` response.
pub fn parse_get_record(xml: &str) -> Result<Record> {
    match parse_expecting(xml, Verb::GetRecord)? {
        OaiPmhResponse::GetRecord(record) => Ok(record),
        other => Err(mismatch(xml, Verb::GetRecord, &other)),
    }
}

/// Validate one `ListIdentifiers` page.
pub fn parse_list_identifiers(xml: &str) -> Result<ListResponse<Header>> {
    match parse_expecting(xml, Verb::ListIdentifiers)? {
        OaiPmhResponse::ListIdentifiers(list) => Ok(list),
        other => Err(mismatch(xml, Verb::ListIdentifiers, &other)),
    }
}

/// Validate a `ListMetadataFormats` response.
pub fn parse_list_metadata_formats(xml: &str) -> Result<Vec<MetadataFormat>> {
    match parse_expecting(xml, Verb::ListMetadataFormats)? {
        OaiPmhResponse::ListMetadataFormats(formats) => Ok(formats),
        other => Err(mismatch(xml, Verb::ListMetadataFormats, &other)),
    }
}

/// Validate one `ListRecords` page.
pub fn parse_list_records(xml: &str) -> Result<ListResponse<Record>> {
    match parse_expecting(xml, Verb::ListRecords)? {
        OaiPmhResponse::ListRecords(list) => Ok(list),
        other => Err(mismatch(xml, Verb::ListRecords, &other)),
    }
}

/// Validate one `ListSets` page.
pub fn parse_list_sets(xml: &str) -> Result<ListResponse<Set>> {
    match parse_expecting(xml, Verb::ListSets)? {
        OaiPmhResponse::ListSets(list) => Ok(list),
        other => Err(mismatch(xml, Verb::ListSets, &other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::types::DeletedRecord;

    fn wrap(verb: &str, payload: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/"
         xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
         xsi:schemaLocation="http://www.openarchives.org/OAI/2.0/ http://www.openarchives.org/OAI/2.0/OAI-PMH.xsd">
  <responseDate>2024-01-01T00:00:00Z</responseDate>
  <request verb="{verb}">http://example.org/oai</request>
  {payload}
</OAI-PMH>"#
        )
    }

    const IDENTIFY: &str = "<Identify>
        <repositoryName>Repo</repositoryName>
        <baseURL>http://example.org/oai</baseURL>
        <protocolVersion>2.0</protocolVersion>
        <adminEmail>admin@example.org</adminEmail>
        <earliestDatestamp>2001-01-01</earliestDatestamp>
        <deletedRecord>persistent</deletedRecord>
        <granularity>YYYY-MM-DDThh:mm:ssZ</granularity>
    </Identify>";

    #[test]
    fn test_parse_identify() {
        let identify = parse_identify(&wrap("Identify", IDENTIFY)).unwrap();
        assert_eq!(identify.repository_name, "Repo");
        assert_eq!(identify.deleted_record, DeletedRecord::Persistent);
    }

    #[test]
    fn test_parse_response_dispatches_by_verb() {
        let response = parse_response(&wrap("Identify", IDENTIFY)).unwrap();
        assert_eq!(response.verb(), Verb::Identify);

        let xml = wrap(
            "ListSets",
            "<ListSets><set><setSpec>a</setSpec><setName>A</setName></set></ListSets>",
        );
        let response = parse_response(&xml).unwrap();
        assert_eq!(response.verb(), Verb::ListSets);
    }

    #[test]
    fn test_wrong_verb_is_validation_error() {
        let err = parse_list_sets(&wrap("Identify", IDENTIFY)).unwrap_err();
        match err {
            OaiPmhError::Validation(e) => {
                assert_eq!(
                    e.source,
                    StructuralError::UnexpectedVerb {
                        expected: "ListSets",
                        found: "Identify"
                    }
                );
                assert!(e.xml.contains("<repositoryName>Repo"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_error_envelope_is_protocol_error() {
        let err = parse_list_sets(&wrap("ListSets", r#"<error code="noSetHierarchy">no sets</error>"#))
            .unwrap_err();
        match err {
            OaiPmhError::Protocol(e) => assert!(e.has_code(ErrorCode::NoSetHierarchy)),
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_xml_keeps_text() {
        let err = parse_response("<OAI-PMH><unclosed></OAI-PMH>").unwrap_err();
        match err {
            OaiPmhError::Validation(e) => {
                assert!(matches!(e.source, StructuralError::MalformedXml(_)));
                assert_eq!(e.xml, "<OAI-PMH><unclosed></OAI-PMH>");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_parsing_is_repeatable() {
        let xml = wrap(
            "ListIdentifiers",
            "<ListIdentifiers>
                <header><identifier>oai:x:1</identifier><datestamp>2024-01-01</datestamp></header>
                <resumptionToken>next</resumptionToken>
            </ListIdentifiers>",
        );
        assert_eq!(
            parse_list_identifiers(&xml).unwrap(),
            parse_list_identifiers(&xml).unwrap()
        );
    }
}
