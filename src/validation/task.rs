//! Semantic checks for encode task values.

use crate::task::model::{
    Anamorphic, AudioTrack, EncodeTask, PictureSettings, PointToPointMode, SubtitleSource,
    VideoEncodeRateType, VideoEncoder,
};

use super::{ValidationIssue, ValidationResult};

/// Modulus values the engine accepts.
const VALID_MODULI: &[u32] = &[2, 4, 8, 16];

/// Audio sample rates (kHz) with an engine mapping. Zero means auto.
const KNOWN_SAMPLE_RATES: &[f64] = &[0.0, 22.05, 24.0, 44.1, 48.0];

/// Validates semantic correctness of a task.
pub fn validate(task: &EncodeTask) -> ValidationResult {
    let mut result = ValidationResult::new();

    if task.title == 0 {
        result.add(ValidationIssue::error("title", "Title numbers start at 1"));
    }

    validate_range(task, &mut result);
    validate_picture(&task.picture, &mut result);
    validate_video(task, &mut result);

    for (i, track) in task.audio_tracks.iter().enumerate() {
        validate_audio_track(track, &format!("audio_tracks[{}]", i), &mut result);
    }

    let mut burned = 0;
    for (i, subtitle) in task.subtitle_tracks.iter().enumerate() {
        let prefix = format!("subtitle_tracks[{}]", i);
        if subtitle.burned {
            burned += 1;
        }
        match &subtitle.source {
            SubtitleSource::Track { track_number: None } => {
                result.add(
                    ValidationIssue::warning(
                        format!("{}.track_number", prefix),
                        "Subtitle track reference is missing and will be skipped",
                    )
                    .with_suggestion("Rescan the source and pick the track again"),
                );
            }
            SubtitleSource::Track {
                track_number: Some(0),
            } => {
                result.add(ValidationIssue::error(
                    format!("{}.track_number", prefix),
                    "Subtitle track numbers start at 1",
                ));
            }
            SubtitleSource::File { file_name, .. } if file_name.as_os_str().is_empty() => {
                result.add(ValidationIssue::error(
                    format!("{}.file_name", prefix),
                    "Subtitle file name is empty",
                ));
            }
            _ => {}
        }
    }
    if burned > 1 {
        result.add(ValidationIssue::error(
            "subtitle_tracks",
            format!("{} subtitle tracks are burned in", burned),
        )
        .with_suggestion("Only one subtitle track can be burned into the video"));
    }

    for (i, marker) in task.chapter_names.iter().enumerate() {
        if marker.number == 0 {
            result.add(ValidationIssue::error(
                format!("chapter_names[{}].number", i),
                "Chapter numbers start at 1",
            ));
        }
    }

    result
}

fn validate_range(task: &EncodeTask, result: &mut ValidationResult) {
    let (start, end) = (task.start_point, task.end_point);

    match task.point_to_point_mode {
        PointToPointMode::Preview => return,
        PointToPointMode::Chapters if start < 1 || end < 1 => {
            result.add(
                ValidationIssue::error(
                    "start_point",
                    format!("Chapter range {}-{} is not 1-based", start, end),
                )
                .with_suggestion("The first chapter is 1"),
            );
        }
        _ if start < 0 || end < 0 => {
            result.add(ValidationIssue::error(
                "start_point",
                format!("Range {}-{} contains a negative point", start, end),
            ));
        }
        _ => {}
    }

    if start > end {
        result.add(ValidationIssue::error(
            "end_point",
            format!("Range end {} is before its start {}", end, start),
        ));
    }
}

fn validate_picture(picture: &PictureSettings, result: &mut ValidationResult) {
    if let Some(modulus) = picture.modulus {
        if !VALID_MODULI.contains(&modulus) {
            result.add(
                ValidationIssue::error(
                    "picture.modulus",
                    format!("Modulus {} is not supported", modulus),
                )
                .with_suggestion("Use one of 2, 4, 8 or 16"),
            );
        }
    }

    let crop = &picture.cropping;
    for (side, value) in [
        ("top", crop.top),
        ("bottom", crop.bottom),
        ("left", crop.left),
        ("right", crop.right),
    ] {
        if value < 0 {
            result.add(ValidationIssue::error(
                format!("picture.cropping.{}", side),
                format!("Crop of {} is negative", value),
            ));
        }
    }

    if picture.anamorphic == Anamorphic::Custom {
        let has_par = picture.pixel_aspect_x > 0 && picture.pixel_aspect_y > 0;
        let has_display = picture.display_width.is_some_and(|w| w > 0.0);
        if !has_par && !has_display {
            result.add(
                ValidationIssue::error(
                    "picture.anamorphic",
                    "Custom anamorphic needs a pixel aspect or a display width",
                )
                .with_suggestion("Set pixel_aspect_x/pixel_aspect_y or display_width"),
            );
        }
    }

    if let (Some(width), Some(max_width)) = (picture.width, picture.max_width) {
        if max_width > 0 && width > max_width {
            result.add(ValidationIssue::warning(
                "picture.width",
                format!("Width {} exceeds max width {} and will be clamped", width, max_width),
            ));
        }
    }
    if let (Some(height), Some(max_height)) = (picture.height, picture.max_height) {
        if max_height > 0 && height > max_height {
            result.add(ValidationIssue::warning(
                "picture.height",
                format!("Height {} exceeds max height {} and will be clamped", height, max_height),
            ));
        }
    }
}

fn validate_video(task: &EncodeTask, result: &mut ValidationResult) {
    let video = &task.video;

    match video.rate_type {
        VideoEncodeRateType::ConstantQuality if video.quality.is_none() => {
            result.add(
                ValidationIssue::warning("video.quality", "No quality value is set; 0 is used")
                    .with_suggestion("Set video.quality explicitly"),
            );
        }
        VideoEncodeRateType::AverageBitrate if video.bitrate.is_none() => {
            result.add(ValidationIssue::error(
                "video.bitrate",
                "Average bitrate encodes need a bitrate",
            ));
        }
        _ => {}
    }

    if video.fast_decode && video.encoder != VideoEncoder::X264 {
        result.add(ValidationIssue::warning(
            "video.fast_decode",
            format!("Fast decode is ignored for the {} encoder", video.encoder.as_str()),
        ));
    }

    if video.framerate.is_some_and(|fps| fps <= 0.0) {
        result.add(ValidationIssue::error(
            "video.framerate",
            "Frame rate must be positive",
        ));
    }
}

fn validate_audio_track(track: &AudioTrack, prefix: &str, result: &mut ValidationResult) {
    if !KNOWN_SAMPLE_RATES
        .iter()
        .any(|rate| (rate - track.sample_rate).abs() < 0.001)
    {
        result.add(
            ValidationIssue::warning(
                format!("{}.sample_rate", prefix),
                format!("Sample rate {} kHz is not recognized and will be sent as 48 kHz", track.sample_rate),
            )
            .with_suggestion("Use 0 (auto), 22.05, 24, 44.1 or 48"),
        );
    }

    match track.track {
        Some(0) => {
            result.add(ValidationIssue::error(
                format!("{}.track", prefix),
                "Audio track numbers start at 1",
            ));
        }
        None => {
            result.add(ValidationIssue::warning(
                format!("{}.track", prefix),
                "No source track is selected; the encoding applies to every chosen track",
            ));
        }
        Some(_) => {}
    }

    if !(-20.0..=20.0).contains(&track.gain) {
        result.add(ValidationIssue::warning(
            format!("{}.gain", prefix),
            format!("Gain of {} dB is unusually large", track.gain),
        ));
    }
}
