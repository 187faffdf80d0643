//! Cache module for storing raw API responses to disk
//!
//! This module provides a content-addressed cache store. Each entry is keyed by the
//! fingerprint of the request URL and backed by two files: the raw response body and
//! a `.info` file carrying the response metadata. Freshness comes from the HTTP
//! headers of the original response; entries without usable freshness information
//! are treated as already expired.

mod store;

pub use store::{expiry_of, CacheEntry, CacheError, CacheStore, EntryMetadata};
