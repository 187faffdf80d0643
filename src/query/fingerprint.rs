//! Logical query identity and its cache fingerprint

use reqwest::Url;
use sha2::{Digest, Sha512};
use std::fmt;

use super::QueryError;

/// Throwaway base used only to run a raw query string through the URL parser
const PARSE_BASE: &str = "http://query.invalid/";

/// A logical API request: endpoint path plus query parameters
///
/// Parameters are kept sorted by key (stable for repeated keys), so two queries
/// listing the same parameters in a different order share one canonical URL and
/// therefore one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    path: String,
    params: Vec<(String, String)>,
}

impl Query {
    /// Creates a query for an endpoint path relative to the API base, e.g. `"user/alice"`
    pub fn new(path: impl Into<String>) -> Self {
        let path: String = path.into();
        Self {
            path: path.trim_start_matches('/').to_string(),
            params: Vec::new(),
        }
    }

    /// Adds a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        let key = key.into();
        let at = self.params.partition_point(|(k, _)| k.as_str() <= key.as_str());
        self.params.insert(at, (key, value.to_string()));
        self
    }

    /// Parses `path?key=value&key2=value2`
    ///
    /// Keys and values are percent-decoded once (`+` is a space), so building the
    /// URL again yields the request that was written.
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let (path, query) = raw.split_once('?').unwrap_or((raw, ""));
        let parsed = Url::parse(&format!("{}?{}", PARSE_BASE, query)).map_err(|e| {
            QueryError::InvalidUrl {
                url: raw.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(parsed
            .query_pairs()
            .fold(Query::new(path), |q, (key, value)| q.param(key, value)))
    }

    /// Endpoint path relative to the API base
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Normalized parameters
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Builds the canonical URL of this query against `base_url`
    pub fn url(&self, base_url: &str) -> Result<Url, QueryError> {
        let base = Url::parse(base_url).map_err(|e| QueryError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        let mut url = base.join(&self.path).map_err(|e| QueryError::InvalidUrl {
            url: format!("{}{}", base_url, self.path),
            reason: e.to_string(),
        })?;
        if !self.params.is_empty() {
            url.query_pairs_mut().clear().extend_pairs(&self.params);
        }
        Ok(url)
    }

    /// Fingerprint of the canonical URL of this query against `base_url`
    pub fn fingerprint(&self, base_url: &str) -> Result<Fingerprint, QueryError> {
        Ok(Fingerprint::of(self.url(base_url)?.as_str()))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        for (i, (key, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, key, value)?;
        }
        Ok(())
    }
}

/// Hex SHA-512 digest of a canonical request URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Length of a fingerprint in hex characters
    pub const LEN: usize = 128;

    /// Hashes a canonical URL
    pub fn of(canonical_url: &str) -> Self {
        Self(format!("{:x}", Sha512::digest(canonical_url.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
