//! Validation report formatting.

use super::{ValidationIssue, ValidationResult, ValidationSeverity};

/// Formats a validation result into a human-readable report.
///
/// `subject` names what was checked, e.g. "Task" or "Config".
pub fn format_report(result: &ValidationResult, subject: &str) -> String {
    let errors: Vec<_> = result.errors().collect();
    let warnings: Vec<_> = result.warnings().collect();

    if errors.is_empty() && warnings.is_empty() {
        return format!("{} is valid.", subject);
    }

    let mut report = String::new();

    if !errors.is_empty() {
        let title = format!("{} Validation Failed", subject);
        report.push('\n');
        report.push_str(&title);
        report.push('\n');
        report.push_str(&"=".repeat(title.len()));
        report.push_str("\n\n");
    }

    for issue in &errors {
        report.push_str(&format_issue(issue));
        report.push('\n');
    }

    if !warnings.is_empty() {
        if !errors.is_empty() {
            report.push_str("\nWarnings:\n");
            report.push_str("---------\n\n");
        }
        for issue in &warnings {
            report.push_str(&format_issue(issue));
            report.push('\n');
        }
    }

    report.push_str("---\n");
    report.push_str(&format!(
        "{} warning(s), {} error(s)\n",
        warnings.len(),
        errors.len()
    ));

    if !errors.is_empty() {
        report.push_str(&format!("{} rejected.\n", subject));
    }

    report
}

/// Formats a single validation issue.
fn format_issue(issue: &ValidationIssue) -> String {
    let prefix = match issue.severity {
        ValidationSeverity::Error => "ERROR",
        ValidationSeverity::Warning => "WARNING",
    };

    let mut output = format!("{} {}\n", prefix, issue.path);
    output.push_str(&format!("  └─ {}\n", issue.message));

    if let Some(suggestion) = &issue.suggestion {
        output.push_str(&format!("     {}\n", suggestion));
    }

    output
}

/// One-line summary for log output.
pub fn format_brief_summary(result: &ValidationResult, subject: &str) -> String {
    let error_count = result.error_count();
    let warning_count = result.warnings().count();

    if error_count == 0 && warning_count == 0 {
        format!("{} valid", subject)
    } else if error_count == 0 {
        format!("{} valid with {} warning(s)", subject, warning_count)
    } else {
        format!(
            "{} invalid: {} error(s), {} warning(s)",
            subject, error_count, warning_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_report() {
        let result = ValidationResult::new();
        assert_eq!(format_report(&result, "Task"), "Task is valid.");
        assert_eq!(format_brief_summary(&result, "Task"), "Task valid");
    }

    #[test]
    fn test_report_lists_errors_before_warnings() {
        let mut result = ValidationResult::new();
        result.add(ValidationIssue::warning("video.fast_decode", "ignored"));
        result.add(
            ValidationIssue::error("picture.modulus", "Modulus 3 is not supported")
                .with_suggestion("Use one of 2, 4, 8 or 16"),
        );

        let report = format_report(&result, "Task");
        let error_at = report.find("ERROR picture.modulus").unwrap();
        let warning_at = report.find("WARNING video.fast_decode").unwrap();

        assert!(report.contains("Task Validation Failed\n======================\n"));
        assert!(error_at < warning_at);
        assert!(report.contains("     Use one of 2, 4, 8 or 16\n"));
        assert!(report.ends_with("1 warning(s), 1 error(s)\nTask rejected.\n"));
        assert_eq!(
            format_brief_summary(&result, "Task"),
            "Task invalid: 1 error(s), 1 warning(s)"
        );
    }
}
