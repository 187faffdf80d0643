//! Query engine: cache-first, rate-limited lichess queries

use serde_json::Value;
use tracing::{debug, info, warn};

use super::config::EngineConfig;
use super::decode::decode_body;
use super::fetcher::{FetchOutcome, HttpFetcher, RawResponse, ReqwestTransport, Transport};
use super::rate_limit::RateLimiter;
use super::retry::FetchRetry;
use super::{Fingerprint, Query, QueryError};
use crate::cache::{CacheEntry, CacheStore, EntryMetadata};

/// Totals accumulated over the life of an engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Queries answered, from cache or network
    pub queries_served: u64,
    /// Queries that needed a network fetch
    pub queries_fetched: u64,
    /// Header and body bytes received from the network
    pub bytes_received: u64,
    /// 429 responses seen
    pub throttled_responses: u64,
}

/// Answers lichess queries from the disk cache, fetching on a miss
///
/// One engine is created per run. It owns the rate limiter and the counters, so
/// every request made through it is paced and accounted for.
pub struct QueryEngine<T = ReqwestTransport> {
    base_url: String,
    cache: CacheStore,
    fetcher: HttpFetcher<T>,
    stats: QueryStats,
}

impl QueryEngine<ReqwestTransport> {
    /// Creates an engine talking to the real API
    pub fn new(config: EngineConfig) -> Result<Self, QueryError> {
        let transport = ReqwestTransport::new().map_err(|e| QueryError::Transport {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> QueryEngine<T> {
    /// Creates an engine over a custom transport
    pub fn with_transport(config: EngineConfig, transport: T) -> Self {
        let limiter = RateLimiter::new(config.request_delay(), config.throttle_cooldown);
        Self {
            base_url: config.base_url,
            cache: CacheStore::new(config.cache_dir),
            fetcher: HttpFetcher::new(transport, limiter),
            stats: QueryStats::default(),
        }
    }

    pub fn stats(&self) -> &QueryStats {
        &self.stats
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn limiter(&self) -> &RateLimiter {
        self.fetcher.limiter()
    }

    pub fn transport(&self) -> &T {
        self.fetcher.transport()
    }

    /// Fingerprint a query resolves to under this engine's base URL
    pub fn fingerprint(&self, query: &Query) -> Result<Fingerprint, QueryError> {
        query.fingerprint(&self.base_url)
    }

    /// Answers a query
    ///
    /// A fresh cache entry is used as is. Otherwise the query is fetched, retrying
    /// throttled responses for as long as it takes, and the response is cached
    /// before being decoded.
    ///
    /// # Returns
    /// * `Ok(Value)` - the parsed JSON document
    /// * `Err(QueryError)` - a fatal failure; the run should stop
    pub async fn perform_query(&mut self, query: &Query) -> Result<Value, QueryError> {
        let url = query.url(&self.base_url)?;
        info!("Query: {}", url);
        let fingerprint = Fingerprint::of(url.as_str());

        let entry = match self.cache.lookup(&fingerprint)? {
            Some(entry) => entry,
            None => self.fetch_into_cache(url.as_str(), &fingerprint).await?,
        };

        let value = decode_body(&entry.body, &entry.metadata)?;
        debug!("Received: {}", value);
        self.stats.queries_served += 1;
        Ok(value)
    }

    async fn fetch_into_cache(
        &mut self,
        url: &str,
        fingerprint: &Fingerprint,
    ) -> Result<CacheEntry, QueryError> {
        let response = self.fetch_until_done(url).await?;

        self.stats.queries_fetched += 1;
        self.stats.bytes_received += (response.header_size() + response.body.len()) as u64;

        let RawResponse {
            status,
            headers,
            body,
        } = response;
        let metadata = EntryMetadata::from_response(url, status, headers);
        Ok(self.cache.put(fingerprint, body, metadata)?)
    }

    async fn fetch_until_done(&mut self, url: &str) -> Result<RawResponse, QueryError> {
        let mut retry = FetchRetry::new();
        loop {
            retry.begin_attempt();
            let outcome = self.fetcher.fetch(url).await?;
            retry.record(&outcome);
            match outcome {
                FetchOutcome::Success(response) => return Ok(response),
                FetchOutcome::Throttled => {
                    self.stats.throttled_responses += 1;
                    warn!("Throttled {} time(s) on {}, retrying", retry.throttles(), url);
                }
                FetchOutcome::HardFailure { status } => {
                    return Err(QueryError::HardFailure {
                        status,
                        url: url.to_string(),
                    })
                }
            }
        }
    }

    /// Logs the run totals
    pub fn report_stats(&self) {
        info!(
            queries = self.stats.queries_served,
            fetched = self.stats.queries_fetched,
            throttled = self.stats.throttled_responses,
            "Received {} bytes.",
            self.stats.bytes_received
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    use crate::query::fetcher::TransportError;

    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<VecDeque<RawResponse>>,
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(&self, url: &str) -> Result<RawResponse, TransportError> {
            self.urls.lock().unwrap().push(url.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| TransportError::Network("script exhausted".into()))
        }
    }

    fn reply(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status,
            headers: vec![
                ("content-type".to_string(), "application/json".to_string()),
                ("cache-control".to_string(), "max-age=600".to_string()),
            ],
            body: body.as_bytes().to_vec(),
        }
    }

    fn engine(replies: Vec<RawResponse>) -> (QueryEngine<ScriptedTransport>, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = EngineConfig::default()
            .with_cache_dir(temp_dir.path())
            .with_request_delay(Duration::from_secs(1))
            .unwrap();
        let transport = ScriptedTransport {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        };
        (QueryEngine::with_transport(config, transport), temp_dir)
    }

    #[tokio::test(start_paused = true)]
    async fn test_miss_fetches_and_counts_bytes() {
        let response = reply(200, r#"{"online": false}"#);
        let expected_bytes = (response.header_size() + response.body.len()) as u64;
        let (mut engine, _dir) = engine(vec![response]);

        let value = engine.perform_query(&Query::new("user/alice")).await.unwrap();

        assert_eq!(value["online"], Value::Bool(false));
        assert_eq!(engine.stats().queries_fetched, 1);
        assert_eq!(engine.stats().queries_served, 1);
        assert_eq!(engine.stats().bytes_received, expected_bytes);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_serves_from_cache_only() {
        let (mut engine, _dir) = engine(vec![reply(200, r#"{"online": true}"#)]);
        let query = Query::new("user/alice");

        engine.perform_query(&query).await.unwrap();
        let bytes_after_first = engine.stats().bytes_received;
        engine.perform_query(&query).await.unwrap();

        assert_eq!(engine.transport().urls.lock().unwrap().len(), 1);
        assert_eq!(engine.stats().queries_fetched, 1);
        assert_eq!(engine.stats().queries_served, 2);
        assert_eq!(engine.stats().bytes_received, bytes_after_first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_is_retried_transparently() {
        let (mut engine, _dir) = engine(vec![reply(429, ""), reply(200, r#"{"ok": 1}"#)]);

        let value = engine.perform_query(&Query::new("user/bob")).await.unwrap();

        assert_eq!(value["ok"], 1);
        assert_eq!(engine.stats().throttled_responses, 1);
        assert_eq!(engine.stats().queries_fetched, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hard_failure_is_fatal_and_not_cached() {
        let (mut engine, _dir) = engine(vec![reply(404, "not found")]);
        let query = Query::new("user/ghost");

        let err = engine.perform_query(&query).await.unwrap_err();

        assert!(matches!(err, QueryError::HardFailure { status: 404, .. }));
        let fp = engine.fingerprint(&query).unwrap();
        assert!(!engine.cache().info_path(&fp).exists());
        assert!(!engine.cache().body_path(&fp).exists());
        assert_eq!(engine.stats().queries_served, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_json_is_fatal() {
        let (mut engine, _dir) = engine(vec![reply(200, "{not json")]);

        let err = engine.perform_query(&Query::new("user/alice")).await.unwrap_err();

        assert!(matches!(err, QueryError::Json(_)));
        assert_eq!(engine.stats().queries_served, 0);
    }
}
