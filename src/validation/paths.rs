//! Filesystem checks for task paths.

use std::path::Path;

use crate::task::model::{EncodeTask, OutputFormat, SubtitleSource};

use super::{ValidationIssue, ValidationResult};

/// Validates that the task's source exists and its destination can be written.
pub fn validate(task: &EncodeTask) -> ValidationResult {
    let mut result = ValidationResult::new();

    if !task.source.exists() {
        result.add(
            ValidationIssue::error(
                "source",
                format!("Source does not exist: '{}'", task.source.display()),
            )
            .with_suggestion("Point the task at a media file or disc folder"),
        );
    }

    match task.destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            validate_directory_writable(parent, "destination", &mut result);
        }
        _ => {}
    }

    if task.destination.is_dir() {
        result.add(ValidationIssue::error(
            "destination",
            format!("Destination is a directory: '{}'", task.destination.display()),
        ));
    }

    if same_file(&task.source, &task.destination) {
        result.add(ValidationIssue::error(
            "destination",
            "Source and destination cannot be the same",
        ));
    }

    validate_extension(task, &mut result);

    for (i, subtitle) in task.subtitle_tracks.iter().enumerate() {
        if let SubtitleSource::File { file_name, .. } = &subtitle.source {
            if !file_name.as_os_str().is_empty() && !file_name.is_file() {
                result.add(ValidationIssue::error(
                    format!("subtitle_tracks[{}].file_name", i),
                    format!("Subtitle file does not exist: '{}'", file_name.display()),
                ));
            }
        }
    }

    result
}

/// Validates that a directory exists and is writable.
fn validate_directory_writable(path: &Path, field: &str, result: &mut ValidationResult) {
    if !path.exists() {
        result.add(
            ValidationIssue::error(
                field,
                format!("Directory does not exist: '{}'", path.display()),
            )
            .with_suggestion("Create the directory or update the path"),
        );
        return;
    }

    if !path.is_dir() {
        result.add(ValidationIssue::error(
            field,
            format!("Path is not a directory: '{}'", path.display()),
        ));
        return;
    }

    // Try to write a marker file to check permissions
    let marker = path.join(".transcode_write_test");
    match std::fs::write(&marker, "test") {
        Ok(()) => {
            let _ = std::fs::remove_file(&marker);
        }
        Err(e) => {
            result.add(
                ValidationIssue::error(
                    field,
                    format!("Directory is not writable '{}': {}", path.display(), e),
                )
                .with_suggestion("Check directory permissions"),
            );
        }
    }
}

fn validate_extension(task: &EncodeTask, result: &mut ValidationResult) {
    let extension = task
        .destination
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let expected: &[&str] = match task.output_format {
        OutputFormat::Mp4 | OutputFormat::M4v => &["mp4", "m4v"],
        OutputFormat::Mkv => &["mkv"],
    };

    if !extension.as_deref().is_some_and(|e| expected.contains(&e)) {
        result.add(
            ValidationIssue::warning(
                "destination",
                format!(
                    "Extension of '{}' does not match the output format",
                    task.destination.display()
                ),
            )
            .with_suggestion(format!("Use .{}", expected[0])),
        );
    }
}

/// Checks if two paths name the same file.
fn same_file(a: &Path, b: &Path) -> bool {
    let canon_a = std::fs::canonicalize(a).unwrap_or_else(|_| a.to_path_buf());
    let canon_b = std::fs::canonicalize(b).unwrap_or_else(|_| b.to_path_buf());

    canon_a == canon_b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::loader::parse;
    use tempfile::TempDir;

    fn task_in(dir: &TempDir, destination: &str) -> EncodeTask {
        let source = dir.path().join("movie.mkv");
        std::fs::write(&source, b"media").unwrap();

        parse(&format!(
            "source: {}\ndestination: {}\n",
            source.display(),
            dir.path().join(destination).display()
        ))
        .unwrap()
    }

    #[test]
    fn test_valid_paths() {
        let dir = TempDir::new().unwrap();
        let result = validate(&task_in(&dir, "out.mp4"));

        assert_eq!(result.issue_count(), 0, "{:?}", result);
        assert!(!dir.path().join(".transcode_write_test").exists());
    }

    #[test]
    fn test_missing_source_and_directory() {
        let dir = TempDir::new().unwrap();
        let mut task = task_in(&dir, "missing/out.mp4");
        task.source = dir.path().join("gone.mkv");

        let result = validate(&task);
        let paths: Vec<_> = result.errors().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["source", "destination"]);
    }

    #[test]
    fn test_source_equals_destination() {
        let dir = TempDir::new().unwrap();
        let mut task = task_in(&dir, "movie.mkv");
        task.output_format = OutputFormat::Mkv;

        let result = validate(&task);
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.warnings().count(), 0);
    }

    #[test]
    fn test_extension_mismatch_warns() {
        let dir = TempDir::new().unwrap();
        let result = validate(&task_in(&dir, "out.mkv"));

        assert!(result.is_valid());
        assert_eq!(result.warnings().next().unwrap().suggestion.as_deref(), Some("Use .mp4"));
    }

    #[test]
    fn test_missing_subtitle_file() {
        let dir = TempDir::new().unwrap();
        let mut task = task_in(&dir, "out.mp4");
        task.subtitle_tracks = parse(&format!(
            "source: a\ndestination: b\nsubtitle_tracks:\n  - source: {{ kind: file, file_name: {} }}\n",
            dir.path().join("subs.srt").display()
        ))
        .unwrap()
        .subtitle_tracks;

        let result = validate(&task);
        assert_eq!(result.errors().next().unwrap().path, "subtitle_tracks[0].file_name");
    }
}
