//! Task and configuration validation.

pub mod encoder_options;
pub mod paths;
pub mod report;
pub mod task;

use crate::config::model::AppConfig;
use crate::task::model::EncodeTask;

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    /// Blocks loading.
    Error,
    /// Logged but allows loading.
    Warning,
}

/// A validation issue found while checking a task or configuration.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity of the issue.
    pub severity: ValidationSeverity,
    /// Path to the problematic config field (e.g., "audio_tracks[1].sample_rate").
    pub path: String,
    /// Description of the issue.
    pub message: String,
    /// Optional suggestion for fixing the issue.
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Creates a new error-level validation issue.
    pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ValidationSeverity::Error,
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Creates a new warning-level validation issue.
    pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ValidationSeverity::Warning,
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Adds a suggestion to this validation issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Result of a validation pass.
#[derive(Debug, Default)]
pub struct ValidationResult {
    issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Creates an empty validation result.
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Adds an issue to the result.
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Extends the result with issues from another result.
    pub fn extend(&mut self, other: ValidationResult) {
        self.issues.extend(other.issues);
    }

    /// Returns true if there are no errors (warnings are allowed).
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == ValidationSeverity::Error)
    }

    /// Returns an iterator over error-level issues.
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Error)
    }

    /// Returns an iterator over warning-level issues.
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Warning)
    }

    /// Returns the total number of issues.
    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }

    /// Returns the number of errors.
    pub fn error_count(&self) -> usize {
        self.errors().count()
    }
}

/// Validates an encode task without touching the filesystem.
pub fn validate_task(task: &EncodeTask) -> ValidationResult {
    let mut result = task::validate(task);

    let options = if task.show_advanced_tab {
        ("advanced_encoder_options", &task.advanced_encoder_options)
    } else {
        ("extra_advanced_arguments", &task.extra_advanced_arguments)
    };
    result.extend(encoder_options::validate(
        task.video.encoder,
        options.1,
        options.0,
    ));

    result
}

/// Validates the application configuration.
pub fn validate_config(config: &AppConfig) -> ValidationResult {
    let mut result = ValidationResult::new();
    let engine = &config.engine;

    if engine.scan_poll_interval_ms == 0 {
        result.add(ValidationIssue::error(
            "engine.scan_poll_interval_ms",
            "Poll interval must be greater than zero",
        ));
    }
    if engine.encode_poll_interval_ms == 0 {
        result.add(ValidationIssue::error(
            "engine.encode_poll_interval_ms",
            "Poll interval must be greater than zero",
        ));
    }
    if engine.event_capacity == 0 {
        result.add(ValidationIssue::error(
            "engine.event_capacity",
            "Event capacity must be at least 1",
        ));
    }
    if engine.scan_poll_interval_ms > 10_000 || engine.encode_poll_interval_ms > 10_000 {
        result.add(
            ValidationIssue::warning("engine", "Poll interval is over ten seconds")
                .with_suggestion("Progress events will arrive slowly"),
        );
    }

    const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
    if !LEVELS.contains(&config.global.log_level.to_lowercase().as_str()) {
        result.add(
            ValidationIssue::warning(
                "global.log_level",
                format!("Unknown log level: '{}'", config.global.log_level),
            )
            .with_suggestion(format!("Valid levels: {}", LEVELS.join(", "))),
        );
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let result = validate_config(&AppConfig::default());
        assert!(result.is_valid());
        assert_eq!(result.issue_count(), 0);
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let mut config = AppConfig::default();
        config.engine.scan_poll_interval_ms = 0;
        config.engine.event_capacity = 0;

        let result = validate_config(&config);
        assert!(!result.is_valid());
        assert_eq!(result.error_count(), 2);
    }

    #[test]
    fn test_unknown_log_level_warns() {
        let mut config = AppConfig::default();
        config.global.log_level = "chatty".to_string();

        let result = validate_config(&config);
        assert!(result.is_valid());
        assert_eq!(result.warnings().count(), 1);
    }

    #[test]
    fn test_task_uses_active_option_string() {
        let mut task =
            crate::task::loader::parse("source: /in.mkv\ndestination: /out.mp4\n").unwrap();
        task.video.quality = Some(20.0);
        task.extra_advanced_arguments = "refs=4".to_string();
        task.advanced_encoder_options = "ref=4".to_string();

        task.show_advanced_tab = false;
        assert_eq!(validate_task(&task).warnings().count(), 1);

        task.show_advanced_tab = true;
        assert_eq!(validate_task(&task).warnings().count(), 0);
    }
}
