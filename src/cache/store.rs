//! On-disk cache store for raw HTTP responses
//!
//! Provides a `CacheStore` that persists response bodies next to a JSON metadata
//! file, evicting entries lazily once their HTTP freshness deadline has passed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::query::Fingerprint;

/// Suffix of the metadata file that accompanies every body file
const INFO_SUFFIX: &str = ".info";

/// Suffix used while a file is being written, before it is renamed into place
const TMP_SUFFIX: &str = ".tmp";

/// Errors raised by the cache store
///
/// Every variant is fatal to the run.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading, writing or deleting a cache file failed
    #[error("Cache I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A metadata file exists but cannot be parsed
    #[error("Corrupt cache metadata in {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

/// Metadata stored in `<fingerprint>.info` alongside the raw body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Canonical URL the entry was fetched from
    pub url: String,
    /// HTTP status of the response (always 200 for stored entries)
    pub status: u16,
    /// Response headers in the order they were received
    pub headers: Vec<(String, String)>,
    /// Value of the `Content-Type` header, if any
    pub content_type: Option<String>,
    /// Value of the `Content-Encoding` header, if any
    pub content_encoding: Option<String>,
    /// When the response was received
    pub fetched_at: DateTime<Utc>,
}

impl EntryMetadata {
    /// Builds metadata from a response's status and headers, stamped with the current time
    pub fn from_response(url: impl Into<String>, status: u16, headers: Vec<(String, String)>) -> Self {
        let content_type = find_header(&headers, "content-type").map(str::to_string);
        let content_encoding = find_header(&headers, "content-encoding").map(str::to_string);
        Self {
            url: url.into(),
            status,
            headers,
            content_type,
            content_encoding,
            fetched_at: Utc::now(),
        }
    }

    /// Returns the first header value matching `name`, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// A cache entry read back from disk
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Key the entry is stored under
    pub fingerprint: Fingerprint,
    /// Raw response body, still compressed if the server compressed it
    pub body: Vec<u8>,
    /// Response metadata
    pub metadata: EntryMetadata,
}

/// Computes the freshness deadline of a response from its metadata
///
/// `Cache-Control: no-store` and `no-cache` disable caching outright. Otherwise a
/// `max-age` directive takes precedence over the `Expires` header, as in HTTP/1.1.
///
/// # Returns
/// * `Some(deadline)` if the headers carry usable freshness information
/// * `None` if they don't, which callers must treat as "already expired"
pub fn expiry_of(metadata: &EntryMetadata) -> Option<DateTime<Utc>> {
    if let Some(cache_control) = metadata.header("cache-control") {
        let mut max_age = None;
        for directive in cache_control.split(',').map(str::trim) {
            let lower = directive.to_ascii_lowercase();
            if lower == "no-store" || lower == "no-cache" {
                return None;
            }
            if let Some(seconds) = lower.strip_prefix("max-age=") {
                max_age = seconds.trim_matches('"').parse::<i64>().ok();
            }
        }
        if let Some(seconds) = max_age {
            return Duration::try_seconds(seconds)
                .and_then(|age| metadata.fetched_at.checked_add_signed(age));
        }
    }

    let expires = metadata.header("expires")?;
    DateTime::parse_from_rfc2822(expires.trim())
        .ok()
        .map(|deadline| deadline.with_timezone(&Utc))
}

/// Manages the cache directory
///
/// Writes are ordered metadata first, body second, and each file is renamed into
/// place only once fully written. A body without metadata is therefore never
/// served: `lookup` treats it as an orphan and removes it.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl CacheStore {
    /// Creates a cache store rooted at `cache_dir`
    ///
    /// The directory is created on the first write, not here.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Returns the cache directory
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path of the body file for a fingerprint
    pub fn body_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.cache_dir.join(fingerprint.as_str())
    }

    /// Returns the path of the metadata file for a fingerprint
    pub fn info_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.cache_dir
            .join(format!("{}{}", fingerprint.as_str(), INFO_SUFFIX))
    }

    /// Looks up a fresh entry
    ///
    /// Expired entries and half-written leftovers are deleted before returning `None`.
    ///
    /// # Returns
    /// * `Ok(Some(entry))` if a complete, unexpired entry exists
    /// * `Ok(None)` if there is no usable entry
    /// * `Err(CacheError)` on I/O failure or unparsable metadata
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Result<Option<CacheEntry>, CacheError> {
        let info_path = self.info_path(fingerprint);
        let body_path = self.body_path(fingerprint);

        let Some(info) = read_optional(&info_path)? else {
            if remove_if_exists(&body_path)? {
                warn!("Removed cache body without metadata: {}", body_path.display());
            }
            return Ok(None);
        };

        let metadata: EntryMetadata =
            serde_json::from_slice(&info).map_err(|e| CacheError::Corrupt {
                path: info_path.clone(),
                reason: e.to_string(),
            })?;

        let fresh = expiry_of(&metadata).is_some_and(|deadline| deadline > Utc::now());
        if !fresh {
            info!("Cache entry {} expired, evicting", fingerprint.short());
            self.evict(fingerprint)?;
            return Ok(None);
        }

        let Some(body) = read_optional(&body_path)? else {
            warn!("Removed cache metadata without body: {}", info_path.display());
            remove_if_exists(&info_path)?;
            return Ok(None);
        };

        debug!("Cache hit for {}", fingerprint.short());
        Ok(Some(CacheEntry {
            fingerprint: fingerprint.clone(),
            body,
            metadata,
        }))
    }

    /// Stores a new entry, metadata first and body second
    ///
    /// # Arguments
    /// * `fingerprint` - Key of the entry
    /// * `body` - Raw response body exactly as received
    /// * `metadata` - Response metadata
    ///
    /// # Returns
    /// The entry as it now exists on disk
    pub fn put(
        &self,
        fingerprint: &Fingerprint,
        body: Vec<u8>,
        metadata: EntryMetadata,
    ) -> Result<CacheEntry, CacheError> {
        fs::create_dir_all(&self.cache_dir).map_err(|source| CacheError::Io {
            path: self.cache_dir.clone(),
            source,
        })?;

        let info = serde_json::to_vec_pretty(&metadata).map_err(|e| CacheError::Corrupt {
            path: self.info_path(fingerprint),
            reason: e.to_string(),
        })?;

        info!("Creating cache entry {}", self.body_path(fingerprint).display());
        write_atomic(&self.info_path(fingerprint), &info)?;
        write_atomic(&self.body_path(fingerprint), &body)?;

        Ok(CacheEntry {
            fingerprint: fingerprint.clone(),
            body,
            metadata,
        })
    }

    /// Deletes both files of an entry; missing files are ignored
    pub fn evict(&self, fingerprint: &Fingerprint) -> Result<(), CacheError> {
        remove_if_exists(&self.info_path(fingerprint))?;
        remove_if_exists(&self.body_path(fingerprint))?;
        Ok(())
    }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, CacheError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(CacheError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn remove_if_exists(path: &Path) -> Result<bool, CacheError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(CacheError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(TMP_SUFFIX);
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes).map_err(|source| CacheError::Io {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })
}
