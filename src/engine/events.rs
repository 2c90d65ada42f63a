//! Lifecycle notifications and session metadata.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::state::EngineErrorCode;

/// Kind of engine session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Scan,
    Encode,
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scan => f.write_str("scan"),
            Self::Encode => f.write_str("encode"),
        }
    }
}

/// Identifies one scan or encode session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub kind: SessionKind,
    pub started_at: DateTime<Utc>,
}

impl SessionInfo {
    pub fn new(kind: SessionKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            started_at: Utc::now(),
        }
    }
}

/// Scan progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanProgress {
    /// Fraction of the current title scanned, 0.0 to 1.0.
    pub progress: f64,
    pub current_preview: u32,
    pub previews: u32,
    pub current_title: u32,
    pub titles: u32,
}

/// Encode progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeProgress {
    pub fraction_complete: f64,
    /// Current frames per second.
    pub current_rate: f64,
    /// Average frames per second.
    pub average_rate: f64,
    pub estimated_time_left: std::time::Duration,
    pub pass: u32,
    pub pass_count: u32,
}

/// Notifications published by a [`TranscodeInstance`](super::TranscodeInstance).
#[derive(Debug, Clone, PartialEq)]
pub enum InstanceEvent {
    ScanProgress(ScanProgress),
    ScanCompleted {
        title_count: usize,
        feature_title: u32,
    },
    EncodeProgress(EncodeProgress),
    EncodeCompleted {
        /// True when the engine reported any error, cancellation included.
        error: bool,
        error_code: EngineErrorCode,
    },
}
