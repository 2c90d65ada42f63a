//! JSON job document submitted to the engine.
//!
//! Built from a translated job and the retained scan. Field names follow the
//! engine's PascalCase schema; unset values are omitted from the output.

use serde::Serialize;

use super::model::{Container, EncodeJob, FramerateMode, VideoRange};
use crate::error::InstanceError;
use crate::media::estimate::output_framerate;
use crate::media::geometry;
use crate::media::scan::ScanResult;
use crate::media::title::Title;
use crate::media::tracks::output_tracks;
use crate::task::model::{
    Decomb, Deinterlace, Denoise, DenoisePreset, Detelecine, VideoEncodeRateType,
};

/// Engine time base: ticks per second.
pub const TICKS_PER_SECOND: i64 = 90_000;

/// Time base of the framerate filter.
const FRAMERATE_CLOCK: u64 = 27_000_000;

/// Options that change how a job is submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EncodeOptions {
    /// Encode a short clip starting at a scan preview instead of the job range.
    pub preview: Option<PreviewEncode>,
}

/// A preview clip request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewEncode {
    /// 1-based scan preview to start from.
    pub preview_number: u32,
    /// Clip length in seconds.
    pub seconds: u32,
}

/// Engine filter identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterId {
    Detelecine = 1,
    Decomb = 2,
    Deinterlace = 3,
    Framerate = 4,
    Deblock = 5,
    Denoise = 6,
    NlMeans = 7,
    Grayscale = 8,
    CropScale = 11,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobPayload {
    #[serde(rename = "SequenceID")]
    pub sequence_id: u32,
    pub destination: Destination,
    pub source: Source,
    #[serde(rename = "PAR")]
    pub par: Par,
    pub video: Video,
    pub audio: Audio,
    pub subtitle: Subtitle,
    pub filters: Filters,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Destination {
    pub file: String,
    pub mux: String,
    pub chapter_markers: bool,
    pub chapter_list: Vec<ChapterName>,
    pub mp4_options: Mp4Options,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChapterName {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Mp4Options {
    pub mp4_optimize: bool,
    pub ipod_atom: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Source {
    pub title: u32,
    pub angle: u32,
    pub range: Range,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Range {
    #[serde(rename = "Type")]
    pub kind: &'static str,
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Par {
    pub num: u32,
    pub den: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Video {
    pub encoder: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tune: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
    pub two_pass: bool,
    pub turbo: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Audio {
    pub audio_list: Vec<AudioItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AudioItem {
    /// 0-based source track.
    pub track: u32,
    pub encoder: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
    pub samplerate: u32,
    pub mixdown: &'static str,
    pub gain: f64,
    #[serde(rename = "DRC")]
    pub drc: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Subtitle {
    pub subtitle_list: Vec<SubtitleItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubtitleItem {
    /// 0-based source track, -1 for external files.
    pub track: i32,
    pub default: bool,
    pub force: bool,
    pub burn: bool,
    #[serde(rename = "SRT", skip_serializing_if = "Option::is_none")]
    pub srt: Option<Srt>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Srt {
    pub filename: String,
    pub codeset: String,
    pub language: String,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Filters {
    pub filter_list: Vec<FilterItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FilterItem {
    #[serde(rename = "ID")]
    pub id: i32,
    pub settings: String,
}

impl FilterItem {
    fn new(id: FilterId, settings: impl Into<String>) -> Self {
        Self {
            id: id as i32,
            settings: settings.into(),
        }
    }
}

/// Builds the engine job document for `job` against the retained scan.
pub fn build(
    job: &EncodeJob,
    scan: &ScanResult,
    options: &EncodeOptions,
) -> Result<JobPayload, InstanceError> {
    let title = scan
        .titles
        .get(job.title)
        .ok_or(InstanceError::TitleNotFound { title: job.title })?;

    let resolved = geometry::resolve(job, title);

    Ok(JobPayload {
        sequence_id: 0,
        destination: destination(job, title),
        source: Source {
            title: job.title,
            angle: job.angle,
            range: range(job, title, options),
        },
        par: Par {
            num: resolved.par.num,
            den: resolved.par.den,
        },
        video: video(job),
        audio: audio(job, title),
        subtitle: subtitle(job),
        filters: filters(job, title, resolved),
    })
}

fn destination(job: &EncodeJob, title: &Title) -> Destination {
    let p = &job.profile;

    let container = p.container.unwrap_or_else(|| {
        let is_mkv = job
            .output_path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("mkv"));
        if is_mkv {
            Container::Mkv
        } else {
            Container::Mp4
        }
    });

    let chapter_list = if !job.custom_chapter_names.is_empty() {
        job.custom_chapter_names
            .iter()
            .map(|name| ChapterName { name: name.clone() })
            .collect()
    } else if job.use_default_chapter_names {
        title
            .chapters
            .iter()
            .map(|c| ChapterName {
                name: c.name.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    Destination {
        file: job.output_path.to_string_lossy().into_owned(),
        mux: container.as_str().to_string(),
        chapter_markers: p.include_chapter_markers,
        chapter_list,
        mp4_options: Mp4Options {
            mp4_optimize: p.optimize,
            ipod_atom: p.ipod_5g_support,
        },
    }
}

fn range(job: &EncodeJob, title: &Title, options: &EncodeOptions) -> Range {
    if let Some(preview) = options.preview {
        return Range {
            kind: "preview",
            start: i64::from(preview.preview_number),
            end: i64::from(preview.seconds) * TICKS_PER_SECOND,
        };
    }

    match job.range {
        VideoRange::All => Range {
            kind: "chapter",
            start: 1,
            end: title.chapters.len().max(1) as i64,
        },
        VideoRange::Chapters { start, end } => Range {
            kind: "chapter",
            start: i64::from(start),
            end: i64::from(end),
        },
        VideoRange::Seconds { start, end } => Range {
            kind: "time",
            start: (start * TICKS_PER_SECOND as f64) as i64,
            end: (end * TICKS_PER_SECOND as f64) as i64,
        },
        VideoRange::Frames { start, end } => Range {
            kind: "frame",
            start,
            end,
        },
    }
}

fn video(job: &EncodeJob) -> Video {
    let p = &job.profile;
    let (quality, bitrate) = match p.video_encode_rate_type {
        VideoEncodeRateType::ConstantQuality => (Some(p.quality), None),
        VideoEncodeRateType::AverageBitrate | VideoEncodeRateType::TargetSize => {
            (None, Some(p.video_bitrate))
        }
    };

    Video {
        encoder: p.video_encoder.as_str(),
        preset: p.video_preset.clone(),
        tune: (!p.video_tunes.is_empty()).then(|| p.video_tunes.join(",")),
        profile: p.video_profile.clone(),
        level: p.video_level.clone(),
        options: (!p.video_options.is_empty()).then(|| p.video_options.clone()),
        quality,
        bitrate,
        two_pass: p.two_pass,
        turbo: p.turbo_first_pass,
    }
}

fn audio(job: &EncodeJob, title: &Title) -> Audio {
    let audio_list = output_tracks(job, title)
        .into_iter()
        .map(|(encoding, track)| AudioItem {
            track: track - 1,
            encoder: encoding.encoder.as_str(),
            bitrate: (!encoding.encoder.is_passthrough() && encoding.bitrate > 0)
                .then_some(encoding.bitrate),
            samplerate: encoding.sample_rate_raw,
            mixdown: encoding.mixdown.as_str(),
            gain: encoding.gain,
            drc: encoding.drc,
            name: encoding.name.clone(),
        })
        .collect();

    Audio { audio_list }
}

fn subtitle(job: &EncodeJob) -> Subtitle {
    let source = job.subtitles.source.iter().map(|s| SubtitleItem {
        track: s.track_number as i32 - 1,
        default: s.default,
        force: s.forced,
        burn: s.burned_in,
        srt: None,
    });

    let files = job.subtitles.files.iter().map(|f| SubtitleItem {
        track: -1,
        default: f.default,
        force: false,
        burn: f.burned_in,
        srt: Some(Srt {
            filename: f.file_name.to_string_lossy().into_owned(),
            codeset: f.character_code.clone(),
            language: f.language_code.clone(),
            offset: f.offset,
        }),
    });

    Subtitle {
        subtitle_list: source.chain(files).collect(),
    }
}

fn filters(job: &EncodeJob, title: &Title, resolved: geometry::Geometry) -> Filters {
    let p = &job.profile;
    let custom = |value: &Option<String>| value.clone().unwrap_or_default();
    let mut list = Vec::new();

    match p.detelecine {
        Detelecine::Off => {}
        Detelecine::Default => list.push(FilterItem::new(FilterId::Detelecine, "")),
        Detelecine::Custom => list.push(FilterItem::new(
            FilterId::Detelecine,
            custom(&p.custom_detelecine),
        )),
    }

    let decomb = match p.decomb {
        Decomb::Off => None,
        Decomb::Default => Some(String::new()),
        Decomb::Fast => Some("7:2:6:9:1:80".to_string()),
        Decomb::Bob => Some("455".to_string()),
        Decomb::Custom => Some(custom(&p.custom_decomb)),
    };
    if let Some(settings) = decomb {
        list.push(FilterItem::new(FilterId::Decomb, settings));
    }

    let deinterlace = match p.deinterlace {
        Deinterlace::Off => None,
        Deinterlace::Fast => Some("0".to_string()),
        Deinterlace::Slow => Some("1".to_string()),
        Deinterlace::Slower => Some("3".to_string()),
        Deinterlace::Bob => Some("15".to_string()),
        Deinterlace::Custom => Some(custom(&p.custom_deinterlace)),
    };
    if let Some(settings) = deinterlace {
        list.push(FilterItem::new(FilterId::Deinterlace, settings));
    }

    let custom_denoise = p.denoise_preset == DenoisePreset::Custom.as_str();
    match p.denoise {
        Denoise::Off => {}
        Denoise::Hqdn3d => {
            let settings = if custom_denoise {
                custom(&p.custom_denoise)
            } else {
                p.denoise_preset.clone()
            };
            list.push(FilterItem::new(FilterId::Denoise, settings));
        }
        Denoise::NlMeans => {
            let settings = if custom_denoise {
                custom(&p.custom_denoise)
            } else {
                format!("{}:{}", p.denoise_preset, p.denoise_tune)
            };
            list.push(FilterItem::new(FilterId::NlMeans, settings));
        }
    }

    if let Some(deblock) = p.deblock {
        list.push(FilterItem::new(FilterId::Deblock, deblock.to_string()));
    }

    if p.grayscale {
        list.push(FilterItem::new(FilterId::Grayscale, ""));
    }

    let crop = &p.cropping;
    list.push(FilterItem::new(
        FilterId::CropScale,
        format!(
            "{}:{}:{}:{}:{}:{}",
            resolved.width, resolved.height, crop.top, crop.bottom, crop.left, crop.right
        ),
    ));

    let mode = match p.framerate_mode {
        FramerateMode::Variable => 0,
        FramerateMode::Constant => 1,
        FramerateMode::Peak => 2,
    };
    let fps = output_framerate(job, title);
    let frame_duration = if fps > 0.0 {
        (FRAMERATE_CLOCK as f64 / fps).round() as u64
    } else {
        0
    };
    list.push(FilterItem::new(
        FilterId::Framerate,
        format!("{mode}:{FRAMERATE_CLOCK}:{frame_duration}"),
    ));

    Filters { filter_list: list }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::translate::translate;
    use crate::media::title::fixtures::feature;
    use crate::media::title::TitleSet;
    use crate::task::model::{AudioEncoder, AudioTrack, Mixdown, OutputFormat};
    use std::sync::Arc;

    fn scan() -> ScanResult {
        let mut title = feature(1);
        title.is_main_feature = true;
        ScanResult::new(Arc::new(TitleSet::new(vec![title])))
    }

    fn task() -> crate::task::EncodeTask {
        let mut task = crate::task::loader::parse(
            "source: /in\ndestination: /out/movie.m4v\npoint_to_point_mode: seconds\nstart_point: 10\nend_point: 20\n",
        )
        .unwrap();
        task.audio_tracks = vec![
            AudioTrack {
                encoder: AudioEncoder::Aac,
                bitrate: 160,
                drc: 0.0,
                gain: 0.0,
                sample_rate: 48.0,
                mixdown: Mixdown::Stereo,
                track: Some(2),
                name: Some("Stereo".to_string()),
            },
            AudioTrack {
                encoder: AudioEncoder::Ac3Passthru,
                bitrate: 0,
                drc: 0.0,
                gain: 0.0,
                sample_rate: 0.0,
                mixdown: Mixdown::None,
                track: Some(1),
                name: None,
            },
        ];
        task
    }

    #[test]
    fn test_build_payload() {
        let job = translate(&task());
        let payload = build(&job, &scan(), &EncodeOptions::default()).unwrap();

        assert_eq!(payload.source.range.kind, "time");
        assert_eq!(payload.source.range.start, 900_000);
        assert_eq!(payload.source.range.end, 1_800_000);
        assert_eq!(payload.destination.mux, "av_mp4");
        assert_eq!(payload.video.encoder, "x264");
        // Input numbers index the chosen tracks [2, 1].
        let audio = &payload.audio.audio_list;
        assert_eq!(audio.len(), 2);
        assert_eq!((audio[0].encoder, audio[0].track), ("av_aac", 0));
        assert_eq!((audio[1].encoder, audio[1].track), ("copy:ac3", 1));
        assert!(audio[1].bitrate.is_none());
        assert!(payload
            .filters
            .filter_list
            .iter()
            .any(|f| f.id == FilterId::CropScale as i32));
    }

    #[test]
    fn test_payload_omits_nulls() {
        let mut t = task();
        t.output_format = OutputFormat::Mkv;
        let job = translate(&t);
        let payload = build(&job, &scan(), &EncodeOptions::default()).unwrap();
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["Destination"]["Mux"], "av_mkv");
        assert!(json["Video"].get("Bitrate").is_none());
        assert!(json["Video"].get("Options").is_none());
        assert!(json["Video"].get("Quality").is_some());
        assert_eq!(json["Audio"]["AudioList"][0]["Name"], "Stereo");
    }

    #[test]
    fn test_preview_range() {
        let job = translate(&task());
        let options = EncodeOptions {
            preview: Some(PreviewEncode {
                preview_number: 3,
                seconds: 15,
            }),
        };
        let payload = build(&job, &scan(), &options).unwrap();
        assert_eq!(payload.source.range.kind, "preview");
        assert_eq!(payload.source.range.start, 3);
        assert_eq!(payload.source.range.end, 15 * TICKS_PER_SECOND);
    }

    #[test]
    fn test_missing_title() {
        let mut job = translate(&task());
        job.title = 7;
        let err = build(&job, &scan(), &EncodeOptions::default()).unwrap_err();
        assert!(matches!(err, InstanceError::TitleNotFound { title: 7 }));
    }
}
