//! Engine configuration
//!
//! A typed, validated configuration value handed to [`QueryEngine`](super::QueryEngine)
//! at construction. Validation happens here, before any network activity.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Base URL of the lichess API
pub const DEFAULT_BASE_URL: &str = "https://lichess.org/api/";

/// Cache directory, relative to the working directory
pub const DEFAULT_CACHE_DIR: &str = ".cache";

/// Default gap between two requests
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_secs(2);

/// Smallest gap between two requests the API tolerates
pub const MIN_REQUEST_DELAY: Duration = Duration::from_secs(1);

/// Largest gap between two requests accepted on the command line
pub const MAX_REQUEST_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Back-off after a 429: lichess asks for a full minute
pub const DEFAULT_THROTTLE_COOLDOWN: Duration = Duration::from_secs(61);

/// Configuration errors, detected before the first request
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Requested delay is below the enforced floor
    #[error("Request delay {0:?} is below the minimum of 1 second")]
    DelayBelowFloor(Duration),

    /// Requested delay is above the enforced ceiling
    #[error("Request delay {0:?} is above the maximum of 1 day")]
    DelayAboveCeiling(Duration),

    /// Delay is not a finite, non-negative number of seconds
    #[error("Invalid request delay: '{0}'")]
    InvalidDelay(String),

    /// Poll interval is not a positive number of seconds
    #[error("Invalid poll interval: '{0}'")]
    InvalidInterval(String),
}

/// Settings consumed by the query engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// API base URL; query paths are resolved against it
    pub base_url: String,
    /// Directory holding cache entries
    pub cache_dir: PathBuf,
    request_delay: Duration,
    /// Cool-down after a throttled response
    pub throttle_cooldown: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            request_delay: DEFAULT_REQUEST_DELAY,
            throttle_cooldown: DEFAULT_THROTTLE_COOLDOWN,
        }
    }
}

impl EngineConfig {
    /// Gap enforced after every request
    pub fn request_delay(&self) -> Duration {
        self.request_delay
    }

    /// Sets the request delay, enforcing the one-second floor and the one-day ceiling
    pub fn with_request_delay(mut self, delay: Duration) -> Result<Self, ConfigError> {
        if delay < MIN_REQUEST_DELAY {
            return Err(ConfigError::DelayBelowFloor(delay));
        }
        if delay > MAX_REQUEST_DELAY {
            return Err(ConfigError::DelayAboveCeiling(delay));
        }
        self.request_delay = delay;
        Ok(self)
    }

    /// Sets the request delay from a number of seconds given on the command line
    pub fn with_request_delay_secs(self, secs: f64) -> Result<Self, ConfigError> {
        let delay = Duration::try_from_secs_f64(secs)
            .map_err(|_| ConfigError::InvalidDelay(secs.to_string()))?;
        self.with_request_delay(delay)
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_throttle_cooldown(mut self, cooldown: Duration) -> Self {
        self.throttle_cooldown = cooldown;
        self
    }
}

/// Parses a poll interval in seconds
pub fn parse_interval_secs(secs: f64) -> Result<Duration, ConfigError> {
    match Duration::try_from_secs_f64(secs) {
        Ok(interval) if !interval.is_zero() => Ok(interval),
        _ => Err(ConfigError::InvalidInterval(secs.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.base_url, "https://lichess.org/api/");
        assert_eq!(config.cache_dir, PathBuf::from(".cache"));
        assert_eq!(config.request_delay(), Duration::from_secs(2));
        assert_eq!(config.throttle_cooldown, Duration::from_secs(61));
    }

    #[test]
    fn test_delay_floor_is_enforced() {
        let err = EngineConfig::default()
            .with_request_delay(Duration::from_millis(999))
            .unwrap_err();
        assert_eq!(err, ConfigError::DelayBelowFloor(Duration::from_millis(999)));

        let config = EngineConfig::default()
            .with_request_delay(Duration::from_secs(1))
            .unwrap();
        assert_eq!(config.request_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_delay_ceiling_is_enforced() {
        let config = EngineConfig::default()
            .with_request_delay(MAX_REQUEST_DELAY)
            .unwrap();
        assert_eq!(config.request_delay(), Duration::from_secs(86_400));

        assert_eq!(
            EngineConfig::default()
                .with_request_delay(Duration::from_secs(86_401))
                .unwrap_err(),
            ConfigError::DelayAboveCeiling(Duration::from_secs(86_401))
        );
        assert!(matches!(
            EngineConfig::default().with_request_delay_secs(1e19),
            Err(ConfigError::DelayAboveCeiling(_))
        ));
        assert!(matches!(
            EngineConfig::default().with_request_delay_secs(f64::INFINITY),
            Err(ConfigError::InvalidDelay(_))
        ));
    }

    #[test]
    fn test_throttle_cooldown_override() {
        let config = EngineConfig::default().with_throttle_cooldown(Duration::from_secs(5));
        assert_eq!(config.throttle_cooldown, Duration::from_secs(5));
        assert_eq!(config.request_delay(), DEFAULT_REQUEST_DELAY);
    }

    #[test]
    fn test_delay_from_seconds() {
        let config = EngineConfig::default().with_request_delay_secs(1.5).unwrap();
        assert_eq!(config.request_delay(), Duration::from_millis(1500));

        assert!(matches!(
            EngineConfig::default().with_request_delay_secs(0.5),
            Err(ConfigError::DelayBelowFloor(_))
        ));
        assert!(matches!(
            EngineConfig::default().with_request_delay_secs(-3.0),
            Err(ConfigError::InvalidDelay(_))
        ));
        assert!(matches!(
            EngineConfig::default().with_request_delay_secs(f64::NAN),
            Err(ConfigError::InvalidDelay(_))
        ));
    }

    #[test]
    fn test_interval_must_be_positive() {
        assert_eq!(parse_interval_secs(300.0).unwrap(), Duration::from_secs(300));
        assert!(parse_interval_secs(0.0).is_err());
        assert!(parse_interval_secs(-1.0).is_err());
    }
}
