use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CityPulseError, Result};

/// Top-level configuration for the CityPulse application.
///
/// Loaded from `~/.citypulse/config.toml` by default. Each section
/// corresponds to a bounded context or cross-cutting concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if
    /// the file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CityPulseError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for SQLite databases and the disk cache.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.citypulse/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Event cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum age before a cache entry is considered expired.
    pub ttl_hours: u64,
    /// Directory for the disk tier, relative to `data_dir` unless absolute.
    pub cache_dir: String,
    /// Whether the remote document tier participates in load/save.
    pub remote_enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 6,
            cache_dir: "cache".to_string(),
            remote_enabled: true,
        }
    }
}

/// Event provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Maximum provider result pages per fetch.
    pub max_pages: u32,
    /// Hard cap on events returned per fetch (0 = unlimited).
    pub max_results: usize,
    /// Timeout for a single provider fetch.
    pub fetch_timeout_secs: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            max_pages: 3,
            max_results: 0,
            fetch_timeout_secs: 30,
        }
    }
}

/// Chat orchestration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Free interactions before anonymous users must register.
    pub trial_limit: u32,
    /// Recent-history window passed to the preference extractor.
    pub history_window: usize,
    /// Maximum recommendations per response.
    pub max_results: usize,
    /// City used when no location can be resolved and fallback is allowed.
    pub fallback_city: String,
    /// When true, follow-up turns with no resolvable location default to
    /// `fallback_city` instead of re-prompting. Initial turns always ask.
    pub allow_location_fallback: bool,
    /// Timeout for the ranking call.
    pub rank_timeout_secs: u64,
    /// Cadence of streaming status notices while fetch+rank runs.
    pub status_interval_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            trial_limit: 10,
            history_window: 6,
            max_results: 5,
            fallback_city: "new york".to_string(),
            allow_location_fallback: false,
            rank_timeout_secs: 20,
            status_interval_ms: 1500,
        }
    }
}
