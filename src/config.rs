//! Runtime configuration from environment variables

use std::path::PathBuf;
use std::time::Duration;

use crate::types::VisibilityPolicy;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to listen on
    pub port: u16,
    /// Cadence of the per-session clock ticker
    pub tick_interval: Duration,
    /// Directory for JSON file stores (None = in-memory stores)
    pub data_dir: Option<PathBuf>,
    /// Catalog JSON file (None = built-in catalog)
    pub catalog_path: Option<PathBuf>,
    /// What happens to the clock when a player's page is hidden
    pub visibility: VisibilityPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 6574,
            tick_interval: Duration::from_secs(1),
            data_dir: None,
            catalog_path: None,
            visibility: VisibilityPolicy::PauseWhenHidden,
        }
    }
}

/// Read a trimmed, non-empty environment variable
fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

impl AppConfig {
    /// Load config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env_value("PLAYCLOCK_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);

        let tick_interval = env_value("PLAYCLOCK_TICK_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.tick_interval);

        let visibility = match env_value("PLAYCLOCK_VISIBILITY").as_deref() {
            Some("burn") => VisibilityPolicy::BurnWhenHidden,
            Some("pause") | None => VisibilityPolicy::PauseWhenHidden,
            Some(other) => {
                tracing::warn!(
                    value = other,
                    "Unknown PLAYCLOCK_VISIBILITY, falling back to pause"
                );
                VisibilityPolicy::PauseWhenHidden
            }
        };

        let config = Self {
            port,
            tick_interval,
            data_dir: env_value("PLAYCLOCK_DATA_DIR").map(PathBuf::from),
            catalog_path: env_value("PLAYCLOCK_CATALOG").map(PathBuf::from),
            visibility,
        };

        tracing::info!(
            port = config.port,
            tick_ms = config.tick_interval.as_millis() as u64,
            data_dir = ?config.data_dir,
            catalog = ?config.catalog_path,
            visibility = ?config.visibility,
            "Config loaded"
        );
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "PLAYCLOCK_PORT",
        "PLAYCLOCK_TICK_MS",
        "PLAYCLOCK_DATA_DIR",
        "PLAYCLOCK_CATALOG",
        "PLAYCLOCK_VISIBILITY",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    fn set_env(key: &str, value: &str) {
        std::env::set_var(key, value);
    }

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        clear_env();
        let config = AppConfig::from_env();

        assert_eq!(config.port, 6574);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert!(config.data_dir.is_none());
        assert!(config.catalog_path.is_none());
        assert_eq!(config.visibility, VisibilityPolicy::PauseWhenHidden);
    }

    #[test]
    #[serial]
    fn test_reads_env() {
        clear_env();
        set_env("PLAYCLOCK_PORT", "8080");
        set_env("PLAYCLOCK_TICK_MS", "250");
        set_env("PLAYCLOCK_DATA_DIR", " /var/lib/playclock ");
        set_env("PLAYCLOCK_VISIBILITY", "burn");

        let config = AppConfig::from_env();
        clear_env();

        assert_eq!(config.port, 8080);
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/playclock")));
        assert_eq!(config.visibility, VisibilityPolicy::BurnWhenHidden);
    }

    #[test]
    #[serial]
    fn test_bad_values_fall_back() {
        clear_env();
        set_env("PLAYCLOCK_PORT", "not-a-port");
        set_env("PLAYCLOCK_TICK_MS", "0");
        set_env("PLAYCLOCK_VISIBILITY", "sometimes");

        let config = AppConfig::from_env();
        clear_env();

        assert_eq!(config.port, 6574);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.visibility, VisibilityPolicy::PauseWhenHidden);
    }
}
