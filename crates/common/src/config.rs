//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Run pacing and watchdog settings.
    pub run: RunSettings,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Directory that receives the success/error status files.
    pub sentinel_dir: PathBuf,
}

/// Pacing parameters for a single bridge run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Abort the run when no progress was recorded for this long.
    pub inactivity_timeout_secs: u64,

    /// Minimum interval between progress renders (forced updates bypass it).
    pub progress_interval_ms: u64,

    /// Release host caches after this many reconciled items.
    pub release_batch_size: usize,

    /// Pause after a render so the final status stays visible.
    pub post_render_pause_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "aebridge=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            run: RunSettings::default(),
            logging: LoggingConfig::default(),
            sentinel_dir: std::env::temp_dir(),
        }
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: 180,
            progress_interval_ms: 200,
            release_batch_size: 10,
            post_render_pause_ms: 1500,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("aebridge").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults_match_watchdog_budget() {
        let run = RunSettings::default();
        assert_eq!(run.inactivity_timeout_secs, 180);
        assert_eq!(run.progress_interval_ms, 200);
        assert_eq!(run.release_batch_size, 10);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"run": {"release_batch_size": 4}}"#).unwrap();
        assert_eq!(parsed.run.release_batch_size, 4);
        assert_eq!(parsed.run.inactivity_timeout_secs, 180);
        assert_eq!(parsed.logging.level, "info");
    }
}
