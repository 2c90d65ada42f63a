//! Error types for the transcode interop layer.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application errors.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Instance error: {0}")]
    Instance(#[from] InstanceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration loading and parsing errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {message}")]
    ParseFailed { path: PathBuf, message: String },

    #[error("Config validation failed with {error_count} error(s)")]
    ValidationFailed { error_count: usize },
}

/// Task file loading errors.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Failed to read task file '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse task file '{path}': {message}")]
    ParseFailed { path: PathBuf, message: String },
}

/// Task validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Task validation failed with {error_count} error(s)")]
    Rejected { error_count: usize },
}

/// Failures at the native engine boundary.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Native call '{call}' failed: {message}")]
    CallFailed { call: &'static str, message: String },

    #[error("Failed to decode engine state: {0}")]
    StateDecode(#[source] serde_json::Error),

    #[error("Failed to decode title set: {0}")]
    TitleSetDecode(#[source] serde_json::Error),

    #[error("Engine handle has already been released")]
    HandleClosed,
}

impl EngineError {
    /// Creates a call failure for the named native function.
    pub fn call_failed(call: &'static str, message: impl Into<String>) -> Self {
        Self::CallFailed {
            call,
            message: message.into(),
        }
    }
}

/// Errors raised by the scan/encode lifecycle.
#[derive(Error, Debug)]
pub enum InstanceError {
    #[error("Title {title} not found in the current scan; this is probably a bug")]
    TitleNotFound { title: u32 },

    #[error("A {phase} session is already in progress")]
    AlreadyInProgress { phase: &'static str },

    #[error("No scan result is available to build the encode from")]
    NoScanResult,

    #[error("Instance has been disposed")]
    Disposed,

    #[error("Failed to serialize job payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
