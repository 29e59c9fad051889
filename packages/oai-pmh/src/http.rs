//! HTTP transport with retry, timeout and cancellation.
//!
//! One [`Transport`] is built per client and shared by every verb call. It
//! holds no per-call state: each call brings its own cancellation token and
//! retry overrides through [`RequestOptions`].

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::cancel::{AbortReason, AbortSignal};
use crate::config::ClientConfig;
use crate::error::{OaiPmhError, Result, TransportError};
use crate::types::Verb;

/// Per-call overrides of the client's request policy.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Cancelling this token aborts the in-flight attempt and any pending retry.
    pub signal: Option<CancellationToken>,
    pub retry_count: Option<u32>,
    pub retry_interval: Option<Duration>,
}

impl RequestOptions {
    pub fn with_signal(token: CancellationToken) -> Self {
        Self {
            signal: Some(token),
            ..Self::default()
        }
    }
}

/// Sends OAI-PMH requests and returns the raw response text.
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
    base_url: Url,
    use_post: bool,
    timeout: Option<Duration>,
    retry_count: u32,
    retry_interval: Duration,
}

impl Transport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(config.extra_headers.clone())
            .build()
            .map_err(|e| OaiPmhError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            use_post: config.use_post,
            timeout: config.timeout,
            retry_count: config.retry_count,
            retry_interval: config.retry_interval,
        })
    }

    /// The repository endpoint every request is sent to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Send `verb` with `params` and return the response body.
    ///
    /// Only 5xx responses are retried, at most `retry_count` times with a
    /// fixed `retry_interval` between attempts. Everything else, including
    /// the last 5xx once retries are exhausted, is returned unchanged.
    /// Cancellation yields [`OaiPmhError::Aborted`] and stops further attempts.
    ///
    /// # Arguments
    /// * `verb` - OAI-PMH verb, sent as the first `verb` parameter
    /// * `params` - Remaining request parameters, in order
    /// * `options` - Cancellation token and retry overrides for this call
    ///
    /// # Returns
    /// Raw text of the first successful (2xx) response
    pub async fn send(
        &self,
        verb: Verb,
        params: &[(&str, String)],
        options: &RequestOptions,
    ) -> Result<String> {
        let caller = options
            .signal
            .clone()
            .map(AbortSignal::from_token)
            .unwrap_or_default();
        let retry_count = options.retry_count.unwrap_or(self.retry_count);
        let retry_interval = options.retry_interval.unwrap_or(self.retry_interval);

        let mut attempt = 0;
        loop {
            if caller.is_aborted() {
                return Err(OaiPmhError::Aborted);
            }

            match self.attempt(verb, params, &caller, attempt).await {
                Err(e) if e.is_retryable() && attempt < retry_count => {
                    attempt += 1;
                    tracing::warn!(
                        error = %e,
                        verb = %verb,
                        attempt,
                        max_retries = retry_count,
                        "Server error, will retry"
                    );

                    if !retry_interval.is_zero() {
                        tokio::select! {
                            biased;

                            _ = caller.aborted() => return Err(OaiPmhError::Aborted),
                            () = tokio::time::sleep(retry_interval) => {}
                        }
                    }
                }
                result => return result,
            }
        }
    }

    async fn attempt(
        &self,
        verb: Verb,
        params: &[(&str, String)],
        caller: &AbortSignal,
        attempt: u32,
    ) -> Result<String> {
        let (url, request) = self.build_request(verb, params);

        let signal = match self.timeout {
            Some(timeout) => AbortSignal::any(caller, &AbortSignal::timeout(timeout)),
            None => caller.clone(),
        };

        let method = if self.use_post { "POST" } else { "GET" };
        tracing::debug!(
            verb = %verb,
            method,
            attempt,
            "sending OAI-PMH request"
        );

        let exchange = async {
            let response = request
                .send()
                .await
                .map_err(|source| TransportError::Request {
                    url: url.clone(),
                    source,
                })?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|source| TransportError::Request {
                    url: url.clone(),
                    source,
                })?;

            if !status.is_success() {
                return Err(TransportError::UnexpectedStatus {
                    url: url.clone(),
                    status: status.as_u16(),
                    body,
                });
            }
            Ok(body)
        };

        // dropping `exchange` on abort tears down the connection
        tokio::select! {
            biased;

            reason = signal.aborted() => match reason {
                AbortReason::Cancelled => Err(OaiPmhError::Aborted),
                AbortReason::TimedOut => Err(TransportError::Timeout {
                    url: url.clone(),
                    timeout: self.timeout.unwrap_or_default(),
                }
                .into()),
            },
            result = exchange => result.map_err(OaiPmhError::from),
        }
    }

    /// The request for one attempt, plus the URL used in error messages.
    fn build_request(
        &self,
        verb: Verb,
        params: &[(&str, String)],
    ) -> (String, reqwest::RequestBuilder) {
        let pairs = std::iter::once(("verb", verb.as_str()))
            .chain(params.iter().map(|(key, value)| (*key, value.as_str())));

        if self.use_post {
            let body = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish();
            let request = self
                .http
                .post(self.base_url.clone())
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body);
            (self.base_url.to_string(), request)
        } else {
            let mut url = self.base_url.clone();
            url.query_pairs_mut().extend_pairs(pairs);
            (url.to_string(), self.http.get(url))
        }
    }
}
