//! HTTP fetcher for the lichess API
//!
//! The fetcher waits for its turn with the rate limiter, sends one GET request
//! through a [`Transport`] and classifies the answer. Only three outcomes matter:
//! 200 is a success, 429 means back off, anything else stops the run.

use async_trait::async_trait;
use reqwest::header::ACCEPT_ENCODING;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use super::rate_limit::RateLimiter;
use super::QueryError;

/// User agent sent with every request
const CLIENT_USER_AGENT: &str = concat!("lichess-client/", env!("CARGO_PKG_VERSION"));

/// A response as received from the wire, body untouched
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Bytes on the wire for the header block: `name: value\r\n` per header
    pub fn header_size(&self) -> usize {
        self.headers
            .iter()
            .map(|(name, value)| name.len() + value.len() + 4)
            .sum()
    }
}

/// Errors raised below the HTTP status level
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport itself reported a rate-limit rejection
    ///
    /// [`ReqwestTransport`] never returns this: it hands every status, 429
    /// included, back as a [`RawResponse`].
    #[error("Request throttled by transport")]
    Throttled,

    /// Connection, TLS or body read failure
    #[error("Network error: {0}")]
    Network(String),
}

/// Sends GET requests
///
/// Implementations must not decompress bodies: the raw bytes are what gets cached.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<RawResponse, TransportError>;
}

/// Production transport backed by a single persistent `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(CLIENT_USER_AGENT)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self::with_client(client))
    }

    /// Create a transport around a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT_ENCODING, "gzip")
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(network_error)?
            .to_vec();

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// reqwest only attaches a status to errors from `error_for_status`, which is
/// never called here, so every error it raises is a network failure.
fn network_error(err: reqwest::Error) -> TransportError {
    TransportError::Network(err.to_string())
}

/// Classified result of one request attempt
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// HTTP 200
    Success(RawResponse),
    /// HTTP 429, retry after the cool-down
    Throttled,
    /// Any other status; not retried
    HardFailure { status: u16 },
}

/// Issues rate-limited requests through a transport
#[derive(Debug)]
pub struct HttpFetcher<T> {
    transport: T,
    limiter: RateLimiter,
}

impl<T: Transport> HttpFetcher<T> {
    pub fn new(transport: T, limiter: RateLimiter) -> Self {
        Self { transport, limiter }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Performs one request attempt
    ///
    /// # Returns
    /// * `Ok(FetchOutcome)` - the classified response
    /// * `Err(QueryError::Transport)` - the request could not be completed at all
    pub async fn fetch(&mut self, url: &str) -> Result<FetchOutcome, QueryError> {
        self.limiter.wait_turn().await;
        debug!("Sending query {}", url);

        let response = match self.transport.get(url).await {
            Ok(response) => response,
            Err(TransportError::Throttled) => return Ok(self.throttled()),
            Err(TransportError::Network(reason)) => {
                self.limiter.record_success();
                return Err(QueryError::Transport {
                    url: url.to_string(),
                    reason,
                });
            }
        };

        debug!("{} status was received", response.status);
        match response.status {
            200 => {
                self.limiter.record_success();
                Ok(FetchOutcome::Success(response))
            }
            429 => Ok(self.throttled()),
            status => {
                self.limiter.record_success();
                Ok(FetchOutcome::HardFailure { status })
            }
        }
    }

    fn throttled(&mut self) -> FetchOutcome {
        warn!(
            "429 status was received. Waiting {:.1} seconds",
            self.limiter.throttle_cooldown().as_secs_f64()
        );
        self.limiter.record_throttled();
        FetchOutcome::Throttled
    }
}
