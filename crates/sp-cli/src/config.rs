//! Configuration loading and management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use sp_core::scan_loop::ScanLoopConfig;

/// Application configuration.
///
/// Timing defaults mirror the deployed checkpoint devices; override them per
/// site via the TOML file or `SP_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the attendance store.
    pub store_url: String,
    /// Room this checkpoint guards; sessions in other rooms are ignored.
    pub room: String,
    /// Identity recorded as `scanner_in`/`scanner_out` on log entries.
    pub scanner_id: String,
    /// Reserved token that opens the lock without attendance logic.
    pub pass_token: String,
    /// Schedule refresh cadence.
    pub refresh_interval_secs: u64,
    /// Scanner poll interval.
    pub poll_interval_ms: u64,
    /// Duplicate-scan cooldown per user.
    pub user_cooldown_ms: u64,
    /// Sustained absence required before a token counts as removed.
    pub removal_threshold_ms: u64,
    /// Pause after each handled scan before polling resumes.
    pub settle_ms: u64,
    /// How long the lock stays open after a successful reconciliation.
    pub dwell_ms: u64,
    /// How long the lock stays open in pass mode.
    pub pass_dwell_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_url: "https://attendance.example.com/".to_string(),
            room: "Test Room 1".to_string(),
            scanner_id: "room_1_scanner_1".to_string(),
            pass_token: "hallpasstest".to_string(),
            refresh_interval_secs: 60,
            poll_interval_ms: 100,
            user_cooldown_ms: 5000,
            removal_threshold_ms: 2000,
            settle_ms: 2000,
            dwell_ms: 2000,
            pass_dwell_ms: 2000,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (SP_*)
        figment = figment.merge(Env::prefixed("SP_"));

        figment.extract()
    }

    pub fn scan_loop(&self) -> ScanLoopConfig {
        ScanLoopConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            user_cooldown: Duration::from_millis(self.user_cooldown_ms),
            removal_threshold: Duration::from_millis(self.removal_threshold_ms),
            settle: Duration::from_millis(self.settle_ms),
            pass_dwell: Duration::from_millis(self.pass_dwell_ms),
            pass_token: self.pass_token.clone(),
        }
    }

    pub const fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }

    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// Returns the platform-specific config directory for scanpoint.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("scanpoint"))
}
