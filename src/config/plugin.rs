use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{RewardError, Result};

/// Where a loaded config came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    Defaults,
}

/// Plugin configuration, loaded from a JSON file next to the plugin.
/// Every field has a default so a missing or partial file is fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PluginConfig {
    /// Channel name registered with the host's mod messaging
    pub channel: String,

    /// JSON store of rewarded players
    pub players_file: String,

    /// Flat `}`-delimited file from older installs, imported once
    pub legacy_players_file: Option<String>,

    /// Minimum time between reward scans
    pub scan_interval_ms: u64,

    /// Pause between two grant notices within one scan
    pub send_delay_ms: u64,

    /// Sender name for chat announcements
    pub announcer_name: String,

    pub log_level: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            channel: "Maverick.StartingItems".to_string(),
            players_file: "rewarded_players.json".to_string(),
            legacy_players_file: Some("players.txt".to_string()),
            scan_interval_ms: 1000,
            send_delay_ms: 250,
            announcer_name: "[SERVER]".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl PluginConfig {
    /// Load from a JSON file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RewardError::ConfigLoad {
            path: path.to_string(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| RewardError::ConfigParse {
            path: path.to_string(),
            source: e,
        })
    }

    /// Load from a JSON file, falling back to defaults when it does not exist.
    /// Runs before logging is installed, so the caller reports the source.
    pub fn load_or_default(path: &str) -> Result<(Self, ConfigSource)> {
        if Path::new(path).exists() {
            Ok((Self::load_from_file(path)?, ConfigSource::File))
        } else {
            Ok((Self::default(), ConfigSource::Defaults))
        }
    }

    /// Override fields from `PLAYERS_FILE` and `LOG_LEVEL`
    pub fn apply_env(&mut self) {
        if let Ok(players_file) = std::env::var("PLAYERS_FILE") {
            self.players_file = players_file;
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.log_level = level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.channel.trim().is_empty() {
            return Err(RewardError::ConfigValidation {
                message: "channel must not be empty".to_string(),
            });
        }
        if self.players_file.trim().is_empty() {
            return Err(RewardError::ConfigValidation {
                message: "players_file must not be empty".to_string(),
            });
        }
        if self.scan_interval_ms == 0 {
            return Err(RewardError::ConfigValidation {
                message: "scan_interval_ms must be greater than zero".to_string(),
            });
        }
        crate::logging::parse_level(&self.log_level)?;
        Ok(())
    }

    /// Make file paths absolute against the plugin's install directory
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        self.players_file = resolve(base_dir, &self.players_file);
        self.legacy_players_file = self
            .legacy_players_file
            .as_deref()
            .map(|p| resolve(base_dir, p));
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn send_delay(&self) -> Duration {
        Duration::from_millis(self.send_delay_ms)
    }
}

fn resolve(base_dir: &Path, path: &str) -> String {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path.display().to_string()
    } else {
        base_dir.join(path).display().to_string()
    }
}
