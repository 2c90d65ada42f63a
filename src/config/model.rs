//! Configuration data structures.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure containing all settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global application settings.
    #[serde(default)]
    pub global: GlobalConfig,

    /// Engine lifecycle settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Defaults for scan requests.
    #[serde(default)]
    pub scan: ScanDefaults,
}

/// Global application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Engine lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Native engine log verbosity.
    #[serde(default = "default_verbosity")]
    pub verbosity: u32,

    /// Milliseconds between state polls while scanning.
    #[serde(default = "default_poll_interval_ms")]
    pub scan_poll_interval_ms: u64,

    /// Milliseconds between state polls while encoding.
    #[serde(default = "default_poll_interval_ms")]
    pub encode_poll_interval_ms: u64,

    /// Buffered events per subscriber before the slowest one lags.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl EngineConfig {
    pub fn scan_poll_interval(&self) -> Duration {
        Duration::from_millis(self.scan_poll_interval_ms)
    }

    pub fn encode_poll_interval(&self) -> Duration {
        Duration::from_millis(self.encode_poll_interval_ms)
    }
}

/// Defaults applied to scan requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanDefaults {
    /// Preview frames to capture per title.
    #[serde(default = "default_preview_count")]
    pub preview_count: u32,

    /// Titles shorter than this are skipped.
    #[serde(default = "default_min_duration_secs")]
    pub min_duration_secs: u64,
}

// Default value functions

fn default_log_level() -> String {
    "info".to_string()
}

fn default_verbosity() -> u32 {
    1
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_event_capacity() -> usize {
    64
}

fn default_preview_count() -> u32 {
    10
}

fn default_min_duration_secs() -> u64 {
    10
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            verbosity: default_verbosity(),
            scan_poll_interval_ms: default_poll_interval_ms(),
            encode_poll_interval_ms: default_poll_interval_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl Default for ScanDefaults {
    fn default() -> Self {
        Self {
            preview_count: default_preview_count(),
            min_duration_secs: default_min_duration_secs(),
        }
    }
}
