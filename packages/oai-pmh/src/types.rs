//! Core data types for OAI-PMH requests and responses.
//!
//! All response types are immutable values created per response.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::xml::{XmlElement, XmlNode};

/// The six OAI-PMH request types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verb {
    Identify,
    GetRecord,
    ListIdentifiers,
    ListMetadataFormats,
    ListRecords,
    ListSets,
}

impl Verb {
    pub const ALL: [Verb; 6] = [
        Self::Identify,
        Self::GetRecord,
        Self::ListIdentifiers,
        Self::ListMetadataFormats,
        Self::ListRecords,
        Self::ListSets,
    ];

    /// Wire value, also the element name of the response payload.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identify => "Identify",
            Self::GetRecord => "GetRecord",
            Self::ListIdentifiers => "ListIdentifiers",
            Self::ListMetadataFormats => "ListMetadataFormats",
            Self::ListRecords => "ListRecords",
            Self::ListSets => "ListSets",
        }
    }

    /// Whether responses to this verb may carry a resumption token.
    #[must_use]
    pub fn is_paged(&self) -> bool {
        matches!(
            self,
            Self::ListIdentifiers | Self::ListRecords | Self::ListSets
        )
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|verb| verb.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// How a repository keeps track of deleted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletedRecord {
    No,
    Transient,
    Persistent,
}

impl DeletedRecord {
    pub(crate) const EXPECTED: &'static str = "no, transient, persistent";

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::No => "no",
            Self::Transient => "transient",
            Self::Persistent => "persistent",
        }
    }
}

impl FromStr for DeletedRecord {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no" => Ok(Self::No),
            "transient" => Ok(Self::Transient),
            "persistent" => Ok(Self::Persistent),
            other => Err(other.to_string()),
        }
    }
}

/// Finest datestamp granularity supported by a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    #[serde(rename = "YYYY-MM-DD")]
    Day,
    #[serde(rename = "YYYY-MM-DDThh:mm:ssZ")]
    Second,
}

impl Granularity {
    pub(crate) const EXPECTED: &'static str = "YYYY-MM-DD, YYYY-MM-DDThh:mm:ssZ";

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "YYYY-MM-DD",
            Self::Second => "YYYY-MM-DDThh:mm:ssZ",
        }
    }

    /// Render a UTC timestamp as a datestamp at this granularity.
    ///
    /// # Examples
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use oai_pmh_client::Granularity;
    ///
    /// let t = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
    /// assert_eq!(Granularity::Day.format_datestamp(t), "2024-03-09");
    /// assert_eq!(Granularity::Second.format_datestamp(t), "2024-03-09T14:05:00Z");
    /// ```
    #[must_use]
    pub fn format_datestamp(&self, timestamp: DateTime<Utc>) -> String {
        match self {
            Self::Day => timestamp.format("%Y-%m-%d").to_string(),
            Self::Second => timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        }
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "YYYY-MM-DD" => Ok(Self::Day),
            "YYYY-MM-DDThh:mm:ssZ" => Ok(Self::Second),
            other => Err(other.to_string()),
        }
    }
}

/// Response to `Identify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identify {
    pub repository_name: String,
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub protocol_version: String,
    pub earliest_datestamp: String,
    pub deleted_record: DeletedRecord,
    pub granularity: Granularity,
    pub admin_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Vec<XmlElement>>,
}

/// Record header, as returned by `ListIdentifiers` and inside every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub identifier: String,
    pub datestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_spec: Option<Vec<String>>,
    /// `status="deleted"` was present on the header.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_deleted: bool,
}

/// A metadata record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub header: Header,
    /// Child nodes of `<metadata>`, left uninterpreted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Vec<XmlNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<Vec<XmlElement>>,
}

impl Record {
    /// The first element inside `<metadata>`, which is the record in the
    /// requested metadata format.
    #[must_use]
    pub fn metadata_root(&self) -> Option<&XmlElement> {
        self.metadata.iter().flatten().find_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }
}

/// A set from `ListSets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Set {
    pub set_spec: String,
    pub set_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_description: Option<Vec<XmlElement>>,
}

/// A metadata format from `ListMetadataFormats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataFormat {
    pub metadata_prefix: String,
    pub schema: String,
    pub metadata_namespace: String,
}

/// One page of a list verb.
///
/// `resumption_token` is `None` when the list is complete; otherwise it must
/// be sent back verbatim to fetch the next page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    pub records: Vec<T>,
    pub resumption_token: Option<String>,
}

/// Any successfully validated response, tagged by verb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OaiPmhResponse {
    Identify(Identify),
    GetRecord(Record),
    ListIdentifiers(ListResponse<Header>),
    ListMetadataFormats(Vec<MetadataFormat>),
    ListRecords(ListResponse<Record>),
    ListSets(ListResponse<Set>),
}

impl OaiPmhResponse {
    #[must_use]
    pub fn verb(&self) -> Verb {
        match self {
            Self::Identify(_) => Verb::Identify,
            Self::GetRecord(_) => Verb::GetRecord,
            Self::ListIdentifiers(_) => Verb::ListIdentifiers,
            Self::ListMetadataFormats(_) => Verb::ListMetadataFormats,
            Self::ListRecords(_) => Verb::ListRecords,
            Self::ListSets(_) => Verb::ListSets,
        }
    }
}

/// Selective harvesting arguments for `ListIdentifiers` and `ListRecords`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOptions {
    pub metadata_prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set: Option<String>,
}

impl ListOptions {
    pub fn new(metadata_prefix: impl Into<String>) -> Self {
        Self {
            metadata_prefix: metadata_prefix.into(),
            ..Self::default()
        }
    }

    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn until(mut self, until: impl Into<String>) -> Self {
        self.until = Some(until.into());
        self
    }

    pub fn set(mut self, set: impl Into<String>) -> Self {
        self.set = Some(set.into());
        self
    }

    /// Request parameters, omitting unset options.
    #[must_use]
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("metadataPrefix", self.metadata_prefix.clone())];
        if let Some(from) = &self.from {
            params.push(("from", from.clone()));
        }
        if let Some(until) = &self.until {
            params.push(("until", until.clone()));
        }
        if let Some(set) = &self.set {
            params.push(("set", set.clone()));
        }
        params
    }
}
