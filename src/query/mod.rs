//! Rate-limited, cached access to the lichess API
//!
//! [`QueryEngine::perform_query`] is the entry point. Underneath it:
//! - [`fingerprint`] derives cache keys from queries
//! - [`rate_limit`] paces requests
//! - [`fetcher`] sends requests and classifies responses
//! - [`retry`] drives the throttle/retry state machine
//! - [`decode`] turns cached bodies back into JSON

pub mod config;
pub mod decode;
pub mod engine;
pub mod fetcher;
pub mod fingerprint;
pub mod rate_limit;
pub mod retry;

pub use config::{ConfigError, EngineConfig};
pub use engine::{QueryEngine, QueryStats};
pub use fetcher::{FetchOutcome, HttpFetcher, RawResponse, ReqwestTransport, Transport, TransportError};
pub use fingerprint::{Fingerprint, Query};
pub use rate_limit::RateLimiter;
pub use retry::{FetchRetry, RetryState};

use thiserror::Error;

use crate::cache::CacheError;

/// Errors that end a query
///
/// Throttling never shows up here: it is retried internally.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Base URL or path do not form a valid URL
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The request could not be completed
    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// The server answered with a status other than 200 or 429
    #[error("HTTP status {status} received for {url}")]
    HardFailure { status: u16, url: String },

    /// Cache read or write failed
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// `Content-Encoding` we cannot reverse
    #[error("Unsupported content encoding: {0}")]
    UnsupportedEncoding(String),

    /// Compressed body is malformed
    #[error("Failed to decompress response: {0}")]
    Decompress(String),

    /// Non-JSON content type without a charset parameter
    #[error("No charset declared in content type '{0}'")]
    MissingCharset(String),

    /// Charset we cannot decode
    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),

    /// Bytes are not valid in the declared charset
    #[error("Response is not valid text: {0}")]
    InvalidText(String),

    /// Decoded text is not valid JSON
    #[error("Failed to parse JSON response: {0}")]
    Json(#[from] serde_json::Error),
}
