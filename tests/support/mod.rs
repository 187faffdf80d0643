//! Scripted transport shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

use lichess_client::query::{EngineConfig, QueryEngine, RawResponse, Transport, TransportError};

pub const BASE: &str = "https://lichess.org/api/";

/// Serves canned replies per URL and records every request it sees
#[derive(Default)]
pub struct FakeLichess {
    replies: Mutex<HashMap<String, VecDeque<RawResponse>>>,
    requests: Mutex<Vec<(String, Instant)>>,
}

impl FakeLichess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply for a path relative to the API base
    pub fn reply(self, path: &str, response: RawResponse) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(format!("{}{}", BASE, path))
            .or_default()
            .push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<(String, Instant)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for FakeLichess {
    async fn get(&self, url: &str) -> Result<RawResponse, TransportError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));
        self.replies
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| TransportError::Network(format!("no reply scripted for {}", url)))
    }
}

pub fn json_headers(cache_control: &str) -> Vec<(String, String)> {
    vec![
        ("content-type".to_string(), "application/json; charset=utf-8".to_string()),
        ("cache-control".to_string(), cache_control.to_string()),
    ]
}

/// Plain JSON reply cached for ten minutes
pub fn json(body: &str) -> RawResponse {
    RawResponse {
        status: 200,
        headers: json_headers("max-age=600"),
        body: body.as_bytes().to_vec(),
    }
}

/// JSON reply that must not be reused
pub fn uncacheable_json(body: &str) -> RawResponse {
    RawResponse {
        status: 200,
        headers: json_headers("no-cache"),
        body: body.as_bytes().to_vec(),
    }
}

/// Gzip-compressed JSON reply cached for ten minutes
pub fn gzip_json(body: &str) -> RawResponse {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body.as_bytes()).unwrap();
    let mut headers = json_headers("max-age=600");
    headers.push(("content-encoding".to_string(), "gzip".to_string()));
    RawResponse {
        status: 200,
        headers,
        body: encoder.finish().unwrap(),
    }
}

pub fn status(code: u16) -> RawResponse {
    RawResponse {
        status: code,
        headers: Vec::new(),
        body: Vec::new(),
    }
}

pub fn engine_with(fake: FakeLichess, delay: Duration) -> (QueryEngine<FakeLichess>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config = EngineConfig::default()
        .with_base_url(BASE)
        .with_cache_dir(temp_dir.path().join(".cache"))
        .with_request_delay(delay)
        .expect("Delay should be valid");
    (QueryEngine::with_transport(config, fake), temp_dir)
}
