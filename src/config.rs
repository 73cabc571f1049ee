//! Application configuration loaded from environment variables.
//!
//! The same struct serves the API server and the field client; the
//! server ignores the client-side tuning knobs.

use std::env;
use std::time::Duration;

/// Default Google Maps API root (the directions path is appended).
pub const DEFAULT_DIRECTIONS_BASE_URL: &str = "https://maps.googleapis.com/maps/api";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Dashboard URL, allowed by CORS
    pub frontend_url: String,
    /// Google Maps Directions API key
    pub google_maps_api_key: String,
    /// Directions API root, overridable for tests
    pub directions_base_url: String,
    /// Activity-log API root used by the field client
    pub api_base_url: String,
    /// How long a fetched activity-log page stays fresh
    pub cache_ttl: Duration,
    /// Background reconciliation interval (clamped to 2s minimum by the sync loop)
    pub sync_interval: Duration,
    /// Distance at which a navigation session counts as arrived
    pub arrival_threshold_meters: f64,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            gcp_project_id: "test-project".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            google_maps_api_key: "test_maps_key".to_string(),
            directions_base_url: "http://127.0.0.1:9".to_string(),
            api_base_url: "http://127.0.0.1:8080".to_string(),
            cache_ttl: Duration::from_millis(120_000),
            sync_interval: Duration::from_millis(5_000),
            arrival_threshold_meters: 20.0,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            port: parse_var("PORT", 8080)?,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            google_maps_api_key: env::var("GOOGLE_MAPS_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_MAPS_API_KEY"))?,
            directions_base_url: env::var("DIRECTIONS_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_DIRECTIONS_BASE_URL.to_string()),
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            cache_ttl: Duration::from_millis(parse_var("CACHE_TTL_MS", 120_000)?),
            sync_interval: Duration::from_millis(parse_var("SYNC_INTERVAL_MS", 5_000)?),
            arrival_threshold_meters: parse_var("ARRIVAL_THRESHOLD_METERS", 20.0)?,
        })
    }
}

/// Read an optional variable, falling back to `default` when unset.
/// A set but malformed value is an error rather than silently ignored.
fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("GOOGLE_MAPS_API_KEY", " maps_key ");
        env::set_var("CACHE_TTL_MS", "60000");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.google_maps_api_key, "maps_key");
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.port, 8080);

        env::remove_var("CACHE_TTL_MS");
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        env::set_var("ECOBIN_TEST_BAD_NUMBER", "twelve");
        let result: Result<u64, _> = parse_var("ECOBIN_TEST_BAD_NUMBER", 1);
        assert!(matches!(result, Err(ConfigError::Invalid(_, _))));
    }

    #[test]
    fn test_parse_var_default_when_unset() {
        let value: f64 = parse_var("ECOBIN_TEST_UNSET_VAR", 20.0).unwrap();
        assert_eq!(value, 20.0);
    }
}
