//! The verb call surface.

use futures::stream::BoxStream;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::{RequestOptions, Transport};
use crate::list::paginate;
use crate::types::{Header, Identify, ListOptions, MetadataFormat, Record, Set, Verb};
use crate::verbs;

/// Client for one OAI-PMH repository.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct OaiPmhClient {
    transport: Transport,
}

impl OaiPmhClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            transport: Transport::new(config)?,
        })
    }

    /// Build a client from `OAI_PMH_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(&ClientConfig::from_env()?)
    }

    /// A client with default settings for `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::new(&ClientConfig::builder(base_url).build()?)
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Describe the repository.
    ///
    /// # Returns
    /// Repository name, base URL, datestamp granularity and deletion policy,
    /// plus any `<description>` blocks as owned XML
    pub async fn identify(&self, options: &RequestOptions) -> Result<Identify> {
        let xml = self.transport.send(Verb::Identify, &[], options).await?;
        verbs::parse_identify(&xml)
    }

    /// Fetch one record in the given metadata format.
    ///
    /// # Arguments
    /// * `identifier` - Unique identifier of the item, e.g. `oai:arXiv.org:cs/0112017`
    /// * `metadata_prefix` - Format to disseminate, e.g. `oai_dc`
    /// * `options` - Cancellation token and retry overrides for this call
    ///
    /// # Returns
    /// The record; `metadata` is `None` for a deleted record
    pub async fn get_record(
        &self,
        identifier: &str,
        metadata_prefix: &str,
        options: &RequestOptions,
    ) -> Result<Record> {
        let params = [
            ("identifier", identifier.to_string()),
            ("metadataPrefix", metadata_prefix.to_string()),
        ];
        let xml = self.transport.send(Verb::GetRecord, &params, options).await?;
        verbs::parse_get_record(&xml)
    }

    /// Metadata formats of the repository, or of a single item when
    /// `identifier` is given. Not paged.
    ///
    /// # Arguments
    /// * `identifier` - Restrict the answer to the formats of one item
    /// * `options` - Cancellation token and retry overrides for this call
    pub async fn list_metadata_formats(
        &self,
        identifier: Option<&str>,
        options: &RequestOptions,
    ) -> Result<Vec<MetadataFormat>> {
        let params: Vec<_> = identifier
            .map(|id| ("identifier", id.to_string()))
            .into_iter()
            .collect();
        let xml = self
            .transport
            .send(Verb::ListMetadataFormats, &params, options)
            .await?;
        verbs::parse_list_metadata_formats(&xml)
    }

    /// Headers matching `list_options`, one page per item.
    ///
    /// Nothing is sent until the stream is polled. Each poll fetches one page
    /// and follows its resumption token; a failed page is yielded as the last
    /// item.
    ///
    /// # Arguments
    /// * `list_options` - Metadata prefix plus optional `from`/`until`/`set`
    /// * `options` - Cancellation token and retry overrides, applied to every page
    ///
    /// # Returns
    /// A stream of header batches, one per response page
    pub fn list_identifiers(
        &self,
        list_options: &ListOptions,
        options: RequestOptions,
    ) -> BoxStream<'static, Result<Vec<Header>>> {
        paginate(
            self.transport.clone(),
            Verb::ListIdentifiers,
            list_options.to_params(),
            options,
            verbs::parse_list_identifiers,
        )
    }

    /// Records matching `list_options`, one page per item.
    ///
    /// Paging works as in [`list_identifiers`](Self::list_identifiers).
    ///
    /// # Arguments
    /// * `list_options` - Metadata prefix plus optional `from`/`until`/`set`
    /// * `options` - Cancellation token and retry overrides, applied to every page
    pub fn list_records(
        &self,
        list_options: &ListOptions,
        options: RequestOptions,
    ) -> BoxStream<'static, Result<Vec<Record>>> {
        paginate(
            self.transport.clone(),
            Verb::ListRecords,
            list_options.to_params(),
            options,
            verbs::parse_list_records,
        )
    }

    /// The set hierarchy, one page per item.
    pub fn list_sets(&self, options: RequestOptions) -> BoxStream<'static, Result<Vec<Set>>> {
        paginate(
            self.transport.clone(),
            Verb::ListSets,
            Vec::new(),
            options,
            verbs::parse_list_sets,
        )
    }
}
