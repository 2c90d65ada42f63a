//! Checks for advanced encoder option strings.
//!
//! x264, x265 and QuickSync take options as `key=value:key=value`. Other
//! encoders pass the string through untouched.

use std::collections::HashSet;

use crate::task::model::VideoEncoder;

use super::{ValidationIssue, ValidationResult};

/// Known x264 option names.
const X264_OPTIONS: &[&str] = &[
    "ref", "bframes", "b-adapt", "b-pyramid", "direct", "weightb", "weightp",
    "me", "subme", "merange", "analyse", "8x8dct", "cabac", "trellis",
    "psy-rd", "aq-mode", "aq-strength", "deblock", "no-fast-pskip",
    "no-dct-decimate", "mixed-refs", "keyint", "min-keyint", "scenecut",
    "rc-lookahead", "mbtree", "vbv-bufsize", "vbv-maxrate", "qcomp",
    "nr", "interlaced", "fake-interlaced", "slices", "threads", "level",
    "colorprim", "transfer", "colormatrix", "open-gop", "bluray-compat",
];

/// Known x265 option names.
const X265_OPTIONS: &[&str] = &[
    "ref", "bframes", "b-adapt", "b-pyramid", "me", "subme", "merange",
    "rd", "psy-rd", "psy-rdoq", "rdoq-level", "aq-mode", "aq-strength",
    "deblock", "sao", "no-sao", "keyint", "min-keyint", "scenecut",
    "rc-lookahead", "cutree", "vbv-bufsize", "vbv-maxrate", "qcomp",
    "ctu", "max-tu-size", "tu-intra-depth", "tu-inter-depth", "limit-refs",
    "limit-modes", "rect", "amp", "early-skip", "strong-intra-smoothing",
    "weightp", "weightb", "frame-threads", "pools", "wpp", "open-gop",
    "colorprim", "transfer", "colormatrix", "hdr10", "hdr10-opt",
    "master-display", "max-cll", "repeat-headers",
];

/// Known QuickSync option names.
const QSV_OPTIONS: &[&str] = &[
    "target-usage", "tu", "num-ref-frame", "gop-ref-dist", "gop-pic-size",
    "async-depth", "mbbrc", "extbrc", "b-pyramid", "lookahead", "la-depth",
    "trellis", "cavlc", "rate-distor-opt", "adaptive-i", "adaptive-b",
];

/// Validates an option string for the given encoder.
pub fn validate(encoder: VideoEncoder, options: &str, path: &str) -> ValidationResult {
    let mut result = ValidationResult::new();

    if options.trim().is_empty() || !encoder.uses_colon_options() {
        return result;
    }

    let known: HashSet<&str> = match encoder {
        VideoEncoder::X265 => X265_OPTIONS,
        VideoEncoder::QuickSync => QSV_OPTIONS,
        _ => X264_OPTIONS,
    }
    .iter()
    .copied()
    .collect();

    for option in parse_options(options) {
        let Some(option) = option else {
            result.add(
                ValidationIssue::error(path, "Empty option name")
                    .with_suggestion("Options are written as 'key=value:key=value'"),
            );
            continue;
        };

        if !known.contains(option.name) {
            let mut issue = ValidationIssue::warning(
                format!("{}.{}", path, option.name),
                format!("Unknown {} option: '{}'", encoder.as_str(), option.name),
            );
            if let Some(similar) = find_similar_option(option.name, &known) {
                issue = issue.with_suggestion(format!("Did you mean '{}'?", similar));
            }
            result.add(issue);
            continue;
        }

        if let Some(value) = option.value {
            validate_value(option.name, value, path, &mut result);
        }
    }

    result
}

fn validate_value(name: &str, value: &str, path: &str, result: &mut ValidationResult) {
    match name {
        "ref" | "bframes" => match value.parse::<u32>() {
            Ok(n) if n > 16 => {
                result.add(
                    ValidationIssue::warning(
                        format!("{}.{}", path, name),
                        format!("{} {} is unusually high", name, n),
                    )
                    .with_suggestion("Typical values are 3-8"),
                );
            }
            Ok(_) => {}
            Err(_) => {
                result.add(ValidationIssue::error(
                    format!("{}.{}", path, name),
                    format!("Invalid {} value: '{}'", name, value),
                ));
            }
        },
        "aq-strength" | "qcomp" => {
            if value.parse::<f32>().is_err() {
                result.add(ValidationIssue::error(
                    format!("{}.{}", path, name),
                    format!("Invalid {} value: '{}'", name, value),
                ));
            }
        }
        _ => {}
    }
}

/// A parsed option with name and optional value.
struct ParsedOption<'a> {
    name: &'a str,
    value: Option<&'a str>,
}

/// Splits an option string. `None` marks an entry without a name.
fn parse_options(options: &str) -> Vec<Option<ParsedOption<'_>>> {
    options
        .split(':')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, value) = match entry.split_once('=') {
                Some((name, value)) => (name.trim(), Some(value.trim())),
                None => (entry, None),
            };
            (!name.is_empty()).then_some(ParsedOption { name, value })
        })
        .collect()
}

/// Finds the closest known option within a small edit distance.
fn find_similar_option<'a>(input: &str, known: &HashSet<&'a str>) -> Option<&'a str> {
    known
        .iter()
        .map(|option| (strsim::levenshtein(input, option), *option))
        .filter(|(distance, _)| *distance <= 3)
        .min()
        .map(|(_, option)| option)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_options_pass() {
        let result = validate(VideoEncoder::X264, "ref=4:bframes=3:me=umh", "opts");
        assert_eq!(result.issue_count(), 0);
    }

    #[test]
    fn test_unknown_option_suggests() {
        let result = validate(VideoEncoder::X264, "refs=4", "opts");
        let issue = result.warnings().next().unwrap();

        assert_eq!(issue.path, "opts.refs");
        assert_eq!(issue.suggestion.as_deref(), Some("Did you mean 'ref'?"));
    }

    #[test]
    fn test_x265_option_set() {
        assert_eq!(validate(VideoEncoder::X265, "sao=0:ctu=32", "o").issue_count(), 0);
        assert_eq!(validate(VideoEncoder::X264, "ctu=32", "o").warnings().count(), 1);
    }

    #[test]
    fn test_bad_values() {
        let result = validate(VideoEncoder::X264, "ref=lots:bframes=20", "o");
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.warnings().count(), 1);
    }

    #[test]
    fn test_empty_name_is_error() {
        let result = validate(VideoEncoder::X264, "=4", "o");
        assert!(!result.is_valid());
    }

    #[test]
    fn test_other_encoders_pass_through() {
        assert_eq!(validate(VideoEncoder::Theora, "anything goes", "o").issue_count(), 0);
    }
}
