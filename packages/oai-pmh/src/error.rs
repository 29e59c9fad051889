//! Error types for the OAI-PMH client.
//!
//! Uses the dual-error pattern: `OaiPmhError` for library consumers with
//! detailed error context, and `StructuralError` for the normalizer and
//! validators, which only ever reaches callers wrapped in a `ValidationError`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the OAI-PMH client.
#[derive(Debug, Error)]
pub enum OaiPmhError {
    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// The repository base URL could not be parsed.
    #[error("Invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The request could not be completed or the server answered with a non-2xx status.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The provider answered with a well-formed `<error>` envelope.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The response did not have the shape required by OAI-PMH.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The caller cancelled the operation.
    #[error("operation aborted")]
    Aborted,
}

impl OaiPmhError {
    /// Whether the transport should repeat the request that produced this error.
    ///
    /// Only server errors (5xx) qualify. Protocol and validation errors are
    /// semantic rejections and never retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(TransportError::UnexpectedStatus { status, .. }) if (500..600).contains(status)
        )
    }

    /// Whether this error is the result of caller cancellation.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

/// Failures talking to the repository over HTTP.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network failure; the underlying cause is kept.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The per-request deadline elapsed before a response was read.
    #[error("request to {url} timed out after {}ms", .timeout.as_millis())]
    Timeout { url: String, timeout: Duration },

    /// HTTP status outside 2xx.
    #[error("request to {url} failed with HTTP status {status}{}", server_message(.body))]
    UnexpectedStatus { url: String, status: u16, body: String },
}

fn server_message(body: &str) -> String {
    if body.trim().is_empty() {
        String::new()
    } else {
        format!(" | response from server: {body}")
    }
}

/// The eight error codes defined by OAI-PMH 2.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    BadArgument,
    BadResumptionToken,
    BadVerb,
    CannotDisseminateFormat,
    IdDoesNotExist,
    NoRecordsMatch,
    NoMetadataFormats,
    NoSetHierarchy,
}

impl ErrorCode {
    /// Wire value of the code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadArgument => "badArgument",
            Self::BadResumptionToken => "badResumptionToken",
            Self::BadVerb => "badVerb",
            Self::CannotDisseminateFormat => "cannotDisseminateFormat",
            Self::IdDoesNotExist => "idDoesNotExist",
            Self::NoRecordsMatch => "noRecordsMatch",
            Self::NoMetadataFormats => "noMetadataFormats",
            Self::NoSetHierarchy => "noSetHierarchy",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "badArgument" => Ok(Self::BadArgument),
            "badResumptionToken" => Ok(Self::BadResumptionToken),
            "badVerb" => Ok(Self::BadVerb),
            "cannotDisseminateFormat" => Ok(Self::CannotDisseminateFormat),
            "idDoesNotExist" => Ok(Self::IdDoesNotExist),
            "noRecordsMatch" => Ok(Self::NoRecordsMatch),
            "noMetadataFormats" => Ok(Self::NoMetadataFormats),
            "noSetHierarchy" => Ok(Self::NoSetHierarchy),
            other => Err(other.to_string()),
        }
    }
}

/// One `<error code="...">text</error>` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// The `<request>` element echoed back by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestInfo {
    /// Base URL text content.
    pub url: String,
    /// Request attributes (`verb`, `metadataPrefix`, ...) by qualified name.
    pub attributes: std::collections::BTreeMap<String, String>,
}

/// The provider rejected the request with one or more OAI-PMH error codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("OAI-PMH provider returned error(s):{}", format_payloads(.errors))]
pub struct ProtocolError {
    pub errors: Vec<ErrorPayload>,
    pub request: RequestInfo,
    pub response_date: String,
}

impl ProtocolError {
    /// Codes of all returned errors, in document order.
    pub fn codes(&self) -> impl Iterator<Item = ErrorCode> + '_ {
        self.errors.iter().map(|e| e.code)
    }

    /// Whether the provider returned the given code.
    #[must_use]
    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.codes().any(|c| c == code)
    }
}

fn format_payloads(errors: &[ErrorPayload]) -> String {
    errors
        .iter()
        .map(|e| match &e.text {
            Some(text) => format!("\n\t{}: {text}", e.code),
            None => format!("\n\t{}", e.code),
        })
        .collect()
}

/// The response XML did not match the expected envelope or verb shape.
#[derive(Debug, Error)]
#[error("{source}\n(hint: inspect `xml` for the whole response document)")]
pub struct ValidationError {
    /// Raw response text, kept for diagnosis against non-conformant providers.
    pub xml: String,
    #[source]
    pub source: StructuralError,
}

/// A shape constraint that failed while normalizing or validating a response.
///
/// `path` is the slash separated element path, e.g. `OAI-PMH/ListSets/set`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("malformed XML: {0}")]
    MalformedXml(String),

    #[error("invalid XML for OAI-PMH at <{path}>: text and element nodes cannot coexist at this nesting level")]
    MixedContent { path: String },

    #[error("expected <{path}> to contain a <{key}> element")]
    ExpectedKey { path: String, key: String },

    #[error("unexpected element <{key}> in <{path}>")]
    UnexpectedKey { path: String, key: String },

    #[error("expected <{path}> to have {min} to {max} kinds of element child nodes, found {found}")]
    KeyCount {
        path: String,
        min: usize,
        max: usize,
        found: usize,
    },

    #[error("expected {expected} <{path}> element(s), found {found}")]
    Cardinality {
        path: String,
        expected: &'static str,
        found: usize,
    },

    #[error("expected <{path}> to only contain text")]
    ExpectedText { path: String },

    #[error("expected <{path}> to contain element child nodes")]
    ExpectedElements { path: String },

    #[error("expected <{path}> to not be empty")]
    EmptyElement { path: String },

    #[error("unexpected attribute '{attribute}' on <{path}>")]
    UnexpectedAttribute { path: String, attribute: String },

    #[error("expected <{path}> to have a '{attribute}' attribute")]
    MissingAttribute { path: String, attribute: &'static str },

    #[error("invalid value '{value}' for <{path}>, expected one of: {expected}")]
    InvalidValue {
        path: String,
        value: String,
        expected: &'static str,
    },

    #[error("expected a <{expected}> response, found <{found}>")]
    UnexpectedVerb {
        expected: &'static str,
        found: &'static str,
    },
}

impl From<roxmltree::Error> for StructuralError {
    fn from(e: roxmltree::Error) -> Self {
        Self::MalformedXml(e.to_string())
    }
}

/// Result type alias for OAI-PMH operations.
pub type Result<T> = std::result::Result<T, OaiPmhError>;
