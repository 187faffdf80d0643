//! Lichess Client Library
//!
//! Rate-limited, disk-cached queries against the lichess API, plus the team
//! ratings exporter and online watcher built on top of them.

pub mod cache;
pub mod cli;
pub mod extract;
pub mod logging;
pub mod query;
