//! OAI-PMH Client - Harvest metadata from OAI-PMH 2.0 repositories.
//!
//! This crate sends the six OAI-PMH verbs to a repository, validates every
//! response against the protocol's XML shape and pages through list verbs by
//! following resumption tokens.
//!
//! # Example
//!
//! ```
//! use oai_pmh_client::{parse_identify, DeletedRecord, Granularity};
//!
//! let xml = r#"<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
//!   <responseDate>2024-01-01T00:00:00Z</responseDate>
//!   <request verb="Identify">http://example.org/oai</request>
//!   <Identify>
//!     <repositoryName>Example</repositoryName>
//!     <baseURL>http://example.org/oai</baseURL>
//!     <protocolVersion>2.0</protocolVersion>
//!     <adminEmail>admin@example.org</adminEmail>
//!     <earliestDatestamp>2001-01-01</earliestDatestamp>
//!     <deletedRecord>transient</deletedRecord>
//!     <granularity>YYYY-MM-DD</granularity>
//!   </Identify>
//! </OAI-PMH>"#;
//!
//! let identify = parse_identify(xml).unwrap();
//! assert_eq!(identify.deleted_record, DeletedRecord::Transient);
//! assert_eq!(identify.granularity, Granularity::Day);
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Client configuration, builder and environment loading
//! - [`error`]: Error types and Result alias
//! - [`cancel`]: Composable cancellation signals
//! - [`http`]: Transport with retry, timeout and cancellation
//! - [`xml`]: XML normalization and owned XML values
//! - [`verbs`]: Envelope and per-verb response validation
//! - [`list`]: Resumption token state machine
//! - [`types`]: Domain records (Identify, Header, Record, Set, ...)
//! - [`client`]: The verb call surface

pub mod cancel;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod list;
pub mod types;
pub mod verbs;
pub mod xml;

pub use client::OaiPmhClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{
    ErrorCode, ErrorPayload, OaiPmhError, ProtocolError, Result, StructuralError, TransportError,
    ValidationError,
};
pub use http::{RequestOptions, Transport};
pub use types::{
    DeletedRecord, Granularity, Header, Identify, ListOptions, ListResponse, MetadataFormat,
    OaiPmhResponse, Record, Set, Verb,
};
pub use verbs::{
    parse_get_record, parse_identify, parse_list_identifiers, parse_list_metadata_formats,
    parse_list_records, parse_list_sets, parse_response,
};

// Callers pass their own tokens through `RequestOptions::signal`.
pub use tokio_util::sync::CancellationToken;
