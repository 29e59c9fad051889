//! `Identify` payload validation.

use crate::error::StructuralError;
use crate::types::{DeletedRecord, Granularity, Identify};
use crate::verbs::shared::{
    check_key_count, check_known_keys, element_content, key_as_text, key_as_text_list,
    owned_elements,
};
use crate::xml::RawElement;

const PATH: &str = "OAI-PMH/Identify";

const FIELDS: [&str; 9] = [
    "repositoryName",
    "baseURL",
    "protocolVersion",
    "earliestDatestamp",
    "deletedRecord",
    "granularity",
    "adminEmail",
    "compression",
    "description",
];

pub(crate) fn parse_identify(payload: &RawElement<'_, '_>) -> Result<Identify, StructuralError> {
    let record = element_content(payload, PATH)?;
    check_known_keys(&record, PATH, &FIELDS)?;
    check_key_count(&record, PATH, 7, 9)?;

    let deleted_record = key_as_text(&record, PATH, "deletedRecord")?;
    let deleted_record: DeletedRecord =
        deleted_record
            .parse()
            .map_err(|value| StructuralError::InvalidValue {
                path: format!("{PATH}/deletedRecord"),
                value,
                expected: DeletedRecord::EXPECTED,
            })?;

    let granularity = key_as_text(&record, PATH, "granularity")?;
    let granularity: Granularity =
        granularity
            .parse()
            .map_err(|value| StructuralError::InvalidValue {
                path: format!("{PATH}/granularity"),
                value,
                expected: Granularity::EXPECTED,
            })?;

    Ok(Identify {
        repository_name: key_as_text(&record, PATH, "repositoryName")?,
        base_url: key_as_text(&record, PATH, "baseURL")?,
        protocol_version: key_as_text(&record, PATH, "protocolVersion")?,
        earliest_datestamp: key_as_text(&record, PATH, "earliestDatestamp")?,
        deleted_record,
        granularity,
        admin_email: key_as_text(&record, PATH, "adminEmail")?,
        compression: key_as_text_list(&record, PATH, "compression")?,
        description: owned_elements(&record, "description"),
    })
}
