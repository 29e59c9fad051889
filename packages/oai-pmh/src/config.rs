//! Client configuration.
//!
//! Everything here is fixed when the client is built; the transport never
//! mutates it afterwards.

use std::time::Duration;

use reqwest::header::HeaderMap;
use url::Url;

use crate::error::{OaiPmhError, Result};

/// User agent string sent when none is configured.
pub const USER_AGENT: &str = concat!("oai-pmh-client/", env!("CARGO_PKG_VERSION"));

/// Number of retries after a 5xx response.
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Fixed delay between retries.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(1000);

/// Configuration for an [`OaiPmhClient`](crate::OaiPmhClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub user_agent: String,
    /// Send requests as `application/x-www-form-urlencoded` POST bodies
    /// instead of GET query strings.
    pub use_post: bool,
    /// Per-attempt deadline. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub retry_count: u32,
    /// `Duration::ZERO` retries immediately.
    pub retry_interval: Duration,
    pub extra_headers: HeaderMap,
}

impl ClientConfig {
    /// Start building a configuration for the repository at `base_url`.
    pub fn builder(base_url: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder {
            base_url: base_url.into(),
            user_agent: USER_AGENT.to_string(),
            use_post: false,
            timeout: None,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            extra_headers: HeaderMap::new(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// `OAI_PMH_BASE_URL` is required. Optional: `OAI_PMH_USER_AGENT`,
    /// `OAI_PMH_USE_POST`, `OAI_PMH_TIMEOUT_MS` (0 disables the timeout),
    /// `OAI_PMH_RETRY_COUNT` and `OAI_PMH_RETRY_INTERVAL_MS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = lookup("OAI_PMH_BASE_URL")
            .ok_or_else(|| OaiPmhError::Config("OAI_PMH_BASE_URL not set".into()))?;

        let mut builder = Self::builder(base_url);

        if let Some(user_agent) = lookup("OAI_PMH_USER_AGENT") {
            builder = builder.user_agent(user_agent);
        }

        if let Some(value) = lookup("OAI_PMH_USE_POST") {
            builder = builder.use_post(parse_bool("OAI_PMH_USE_POST", &value)?);
        }

        if let Some(value) = lookup("OAI_PMH_TIMEOUT_MS") {
            let ms: u64 = parse_number("OAI_PMH_TIMEOUT_MS", &value)?;
            builder = builder.timeout((ms > 0).then(|| Duration::from_millis(ms)));
        }

        if let Some(value) = lookup("OAI_PMH_RETRY_COUNT") {
            builder = builder.retry_count(parse_number("OAI_PMH_RETRY_COUNT", &value)?);
        }

        if let Some(value) = lookup("OAI_PMH_RETRY_INTERVAL_MS") {
            let ms: u64 = parse_number("OAI_PMH_RETRY_INTERVAL_MS", &value)?;
            builder = builder.retry_interval(Duration::from_millis(ms));
        }

        builder.build()
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| OaiPmhError::Config(format!("{key} must be a non-negative integer, got '{value}'")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(OaiPmhError::Config(format!(
            "{key} must be true or false, got '{value}'"
        ))),
    }
}

/// Builder for [`ClientConfig`]. The base URL is checked in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    base_url: String,
    user_agent: String,
    use_post: bool,
    timeout: Option<Duration>,
    retry_count: u32,
    retry_interval: Duration,
    extra_headers: HeaderMap,
}

impl ClientConfigBuilder {
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn use_post(mut self, use_post: bool) -> Self {
        self.use_post = use_post;
        self
    }

    pub fn timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.timeout = timeout.into();
        self
    }

    pub fn retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    /// Headers added to every request, e.g. authentication.
    pub fn extra_headers(mut self, headers: HeaderMap) -> Self {
        self.extra_headers = headers;
        self
    }

    pub fn build(self) -> Result<ClientConfig> {
        let base_url = Url::parse(&self.base_url).map_err(|source| OaiPmhError::InvalidBaseUrl {
            url: self.base_url.clone(),
            source,
        })?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(OaiPmhError::Config(format!(
                "base URL must use http or https, got '{}'",
                base_url.scheme()
            )));
        }

        Ok(ClientConfig {
            base_url,
            user_agent: self.user_agent,
            use_post: self.use_post,
            timeout: self.timeout,
            retry_count: self.retry_count,
            retry_interval: self.retry_interval,
            extra_headers: self.extra_headers,
        })
    }
}
