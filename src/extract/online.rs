//! Waits for a user to come online

use serde_json::Value;
use std::time::Duration;
use tracing::info;

use super::ExtractError;
use crate::query::{Query, QueryEngine, Transport};

/// Default gap between two status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Query for a user's public profile
///
/// Lichess usernames only use ASCII letters, digits, `_` and `-`; anything else
/// is rejected so the name always stays a single path segment.
pub fn user_query(user: &str) -> Result<Query, ExtractError> {
    let valid = !user.is_empty()
        && user
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(ExtractError::InvalidUsername(user.to_string()));
    }
    Ok(Query::new(format!("user/{}", user)))
}

fn is_online(profile: &Value) -> Result<bool, ExtractError> {
    match profile.get("online") {
        Some(Value::Bool(online)) => Ok(*online),
        None => Ok(false),
        Some(other) => Err(ExtractError::UnexpectedShape(format!(
            "'online' is not a boolean: {}",
            other
        ))),
    }
}

/// Polls a user's profile until it reports them online
///
/// Every poll goes through the engine and is therefore rate limited on top of
/// `poll_interval`.
///
/// # Returns
/// The number of polls it took
pub async fn watch_online<T: Transport>(
    engine: &mut QueryEngine<T>,
    user: &str,
    poll_interval: Duration,
) -> Result<u32, ExtractError> {
    let query = user_query(user)?;
    let mut polls = 0;
    loop {
        polls += 1;
        let profile = engine.perform_query(&query).await?;
        if is_online(&profile)? {
            info!("User {} is online", user);
            return Ok(polls);
        }
        info!("User {} is offline, checking again in {:?}", user, poll_interval);
        tokio::time::sleep(poll_interval).await;
    }
}
