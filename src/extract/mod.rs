//! Consumers of the query engine
//!
//! Both front-ends only use [`QueryEngine::perform_query`](crate::query::QueryEngine::perform_query)
//! and work on the JSON it returns.

pub mod online;
pub mod ratings;

pub use online::watch_online;
pub use ratings::{export_team_ratings, RatingsExport};

use thiserror::Error;

use crate::query::QueryError;

/// Errors raised while extracting data from query results
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Writing the CSV output failed
    #[error("CSV output error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),

    /// The JSON document does not have the expected shape
    #[error("Invalid username '{0}'")]
    InvalidUsername(String),

    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),
}
