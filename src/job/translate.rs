//! Converts user-level encode tasks into engine jobs.

use super::model::{
    AudioEncodeRateType, AudioEncoding, Container, EncodeJob, EncodingProfile, FileSubtitle,
    FramerateMode, SourceSubtitle, Subtitles, VideoRange,
};
use crate::task::model::{
    AudioTrack, EncodeTask, FramerateMode as TaskFramerateMode, OutputFormat, PointToPointMode,
    SubtitleSource, VideoEncoder, X264Tune, X265Profile, X265Tune,
};
use crate::task::QueueTask;

const DEFAULT_MODULUS: u32 = 16;
const DEBLOCK_OFF_MAX: u8 = 4;

/// Translates a queued task. Returns `None` when the queue entry holds no task.
pub fn translate_queue_task(queue_task: &QueueTask) -> Option<EncodeJob> {
    queue_task.task.as_ref().map(translate)
}

/// Translates an encode task into a job.
pub fn translate(task: &EncodeTask) -> EncodeJob {
    let (audio_encodings, chosen_audio_tracks) = translate_audio(&task.audio_tracks);

    let profile = EncodingProfile {
        audio_encodings,
        ..translate_profile(task)
    };

    EncodeJob {
        source_path: task.source.clone(),
        output_path: task.destination.clone(),
        title: task.title,
        angle: task.angle,
        range: translate_range(task),
        profile,
        chosen_audio_tracks,
        subtitles: translate_subtitles(task),
        use_default_chapter_names: task.include_chapter_markers,
        custom_chapter_names: task.chapter_names.iter().map(|c| c.name.clone()).collect(),
    }
}

/// Maps a sample rate in kHz to the engine's raw rate in Hz.
///
/// 44.1 kHz maps to 32000. Anything not listed, including 0 (auto), maps to 48000.
pub fn sample_rate_raw(rate_khz: f64) -> u32 {
    match (rate_khz * 100.0).round() as i64 {
        2205 => 22050,
        2400 => 24000,
        4410 => 32000,
        4800 => 48000,
        _ => 48000,
    }
}

fn translate_audio(tracks: &[AudioTrack]) -> (Vec<AudioEncoding>, Vec<u32>) {
    let encodings = tracks
        .iter()
        .map(|track| AudioEncoding {
            encoder: track.encoder,
            bitrate: track.bitrate,
            drc: track.drc,
            gain: track.gain,
            sample_rate_raw: sample_rate_raw(track.sample_rate),
            mixdown: track.mixdown,
            input_number: track.track.unwrap_or(0),
            encode_rate_type: AudioEncodeRateType::Bitrate,
            name: track.name.clone(),
        })
        .collect();

    let chosen = tracks.iter().filter_map(|track| track.track).collect();

    (encodings, chosen)
}

fn translate_range(task: &EncodeTask) -> VideoRange {
    let (start, end) = (task.start_point, task.end_point);
    match task.point_to_point_mode {
        PointToPointMode::Chapters => VideoRange::Chapters {
            start: u32::try_from(start).unwrap_or(0),
            end: u32::try_from(end).unwrap_or(0),
        },
        PointToPointMode::Seconds => VideoRange::Seconds {
            start: start as f64,
            end: end as f64,
        },
        PointToPointMode::Frames => VideoRange::Frames { start, end },
        PointToPointMode::Preview => VideoRange::All,
    }
}

fn translate_profile(task: &EncodeTask) -> EncodingProfile {
    let picture = &task.picture;
    let filters = &task.filters;
    let video = &task.video;

    let container = match task.output_format {
        OutputFormat::Mp4 => Some(Container::Mp4),
        OutputFormat::Mkv => Some(Container::Mkv),
        OutputFormat::M4v => None,
    };

    let framerate_mode = match video.framerate_mode {
        TaskFramerateMode::Cfr => FramerateMode::Constant,
        TaskFramerateMode::Pfr => FramerateMode::Peak,
        TaskFramerateMode::Vfr => FramerateMode::Variable,
    };

    let mut profile = EncodingProfile {
        container,
        include_chapter_markers: task.include_chapter_markers,
        optimize: task.optimize_mp4,
        ipod_5g_support: task.ipod_5g_support,

        cropping: picture.cropping,
        anamorphic: picture.anamorphic,
        width: picture.width.unwrap_or(0),
        height: picture.height.unwrap_or(0),
        max_width: picture.max_width.unwrap_or(0),
        max_height: picture.max_height.unwrap_or(0),
        modulus: picture.modulus.unwrap_or(DEFAULT_MODULUS),
        display_width: picture
            .display_width
            .map(|w| w.round().max(0.0) as u32)
            .unwrap_or(0),
        pixel_aspect_x: picture.pixel_aspect_x,
        pixel_aspect_y: picture.pixel_aspect_y,
        keep_display_aspect: picture.keep_display_aspect,

        deinterlace: filters.deinterlace,
        custom_deinterlace: filters.custom_deinterlace.clone(),
        decomb: filters.decomb,
        custom_decomb: filters.custom_decomb.clone(),
        detelecine: filters.detelecine,
        custom_detelecine: filters.custom_detelecine.clone(),
        denoise: filters.denoise,
        custom_denoise: filters.custom_denoise.clone(),
        denoise_preset: filters.denoise_preset.as_str().to_string(),
        denoise_tune: filters.denoise_tune.as_str().to_string(),
        deblock: (filters.deblock > DEBLOCK_OFF_MAX).then_some(filters.deblock),
        grayscale: filters.grayscale,

        framerate: video.framerate.unwrap_or(0.0),
        framerate_mode,
        video_encode_rate_type: video.rate_type,
        quality: video.quality.unwrap_or(0.0),
        video_bitrate: video.bitrate.unwrap_or(0),
        video_encoder: video.encoder,
        video_preset: None,
        video_tunes: Vec::new(),
        video_profile: None,
        video_level: None,
        video_options: if task.show_advanced_tab {
            task.advanced_encoder_options.clone()
        } else {
            task.extra_advanced_arguments.clone()
        },
        two_pass: video.two_pass,
        turbo_first_pass: video.turbo_first_pass,

        audio_encodings: Vec::new(),
    };

    match video.encoder {
        VideoEncoder::X264 => {
            profile.video_preset = Some(video.x264_preset.as_str().to_string());
            if video.x264_tune != X264Tune::None {
                profile.video_tunes.push(video.x264_tune.as_str().to_string());
            }
            if video.fast_decode {
                profile.video_tunes.push("fastdecode".to_string());
            }
            profile.video_profile = Some(video.h264_profile.as_str().to_string());
            profile.video_level = Some(video.h264_level.clone());
        }
        VideoEncoder::X265 => {
            profile.video_preset = Some(video.x265_preset.as_str().to_string());
            if video.h265_profile != X265Profile::None {
                profile.video_profile = Some(video.h265_profile.as_str().to_string());
            }
            if video.x265_tune != X265Tune::None {
                profile.video_tunes.push(video.x265_tune.as_str().to_string());
            }
        }
        _ => {}
    }

    profile
}

fn translate_subtitles(task: &EncodeTask) -> Subtitles {
    let mut subtitles = Subtitles::default();

    for track in &task.subtitle_tracks {
        match &track.source {
            SubtitleSource::File {
                file_name,
                char_code,
                language,
                offset,
            } => subtitles.files.push(FileSubtitle {
                file_name: file_name.clone(),
                character_code: char_code.clone(),
                language_code: language.clone(),
                offset: *offset,
                default: track.default,
                burned_in: track.burned,
            }),
            SubtitleSource::Track {
                track_number: Some(track_number),
            } => subtitles.source.push(SourceSubtitle {
                track_number: *track_number,
                default: track.default,
                forced: track.forced,
                burned_in: track.burned,
            }),
            SubtitleSource::Track { track_number: None } => {}
        }
    }

    subtitles
}
