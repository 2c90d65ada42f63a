//! Engine-facing job and profile types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::task::model::{
    Anamorphic, AudioEncoder, Cropping, Decomb, Deinterlace, Denoise, Detelecine, Mixdown,
    VideoEncodeRateType, VideoEncoder,
};

/// A normalized encode job produced from an [`EncodeTask`](crate::task::EncodeTask).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeJob {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    pub title: u32,
    pub angle: u32,
    pub range: VideoRange,
    pub profile: EncodingProfile,

    /// 1-based source audio tracks, in encoding order.
    pub chosen_audio_tracks: Vec<u32>,

    pub subtitles: Subtitles,
    pub use_default_chapter_names: bool,
    pub custom_chapter_names: Vec<String>,
}

/// The portion of the title to encode. Only one kind of range exists per job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VideoRange {
    /// The whole title.
    #[default]
    All,
    /// 1-based inclusive chapter range.
    Chapters { start: u32, end: u32 },
    /// Time range in seconds.
    Seconds { start: f64, end: f64 },
    /// Frame range.
    Frames { start: i64, end: i64 },
}

impl VideoRange {
    pub fn chapters(&self) -> Option<(u32, u32)> {
        match *self {
            Self::Chapters { start, end } => Some((start, end)),
            _ => None,
        }
    }

    pub fn seconds(&self) -> Option<(f64, f64)> {
        match *self {
            Self::Seconds { start, end } => Some((start, end)),
            _ => None,
        }
    }

    pub fn frames(&self) -> Option<(i64, i64)> {
        match *self {
            Self::Frames { start, end } => Some((start, end)),
            _ => None,
        }
    }
}

/// Output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Container {
    #[serde(rename = "av_mp4")]
    Mp4,
    #[serde(rename = "av_mkv")]
    Mkv,
}

impl Container {
    /// Engine short name of the muxer.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mp4 => "av_mp4",
            Self::Mkv => "av_mkv",
        }
    }
}

/// Output framerate control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramerateMode {
    Constant,
    Peak,
    #[default]
    Variable,
}

/// Everything about how a job is encoded.
///
/// Width, height and the max bounds use 0 for "not set".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingProfile {
    pub container: Option<Container>,
    pub include_chapter_markers: bool,
    pub optimize: bool,
    pub ipod_5g_support: bool,

    // Picture
    pub cropping: Cropping,
    pub anamorphic: Anamorphic,
    pub width: u32,
    pub height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub modulus: u32,
    pub display_width: u32,
    pub pixel_aspect_x: u32,
    pub pixel_aspect_y: u32,
    pub keep_display_aspect: bool,

    // Filters
    pub deinterlace: Deinterlace,
    pub custom_deinterlace: Option<String>,
    pub decomb: Decomb,
    pub custom_decomb: Option<String>,
    pub detelecine: Detelecine,
    pub custom_detelecine: Option<String>,
    pub denoise: Denoise,
    pub custom_denoise: Option<String>,
    pub denoise_preset: String,
    pub denoise_tune: String,
    pub deblock: Option<u8>,
    pub grayscale: bool,

    // Video
    /// Output framerate; 0 keeps the source rate.
    pub framerate: f64,
    pub framerate_mode: FramerateMode,
    pub video_encode_rate_type: VideoEncodeRateType,
    pub quality: f64,
    pub video_bitrate: u32,
    pub video_encoder: VideoEncoder,
    pub video_preset: Option<String>,
    pub video_tunes: Vec<String>,
    pub video_profile: Option<String>,
    pub video_level: Option<String>,
    pub video_options: String,
    pub two_pass: bool,
    pub turbo_first_pass: bool,

    // Audio
    pub audio_encodings: Vec<AudioEncoding>,
}

/// How an audio encoding's size is controlled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioEncodeRateType {
    #[default]
    Bitrate,
    Quality,
}

/// One audio output of the profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioEncoding {
    pub encoder: AudioEncoder,
    /// Bitrate in kbps; 0 picks the encoder default.
    pub bitrate: u32,
    pub drc: f64,
    pub gain: f64,
    pub sample_rate_raw: u32,
    pub mixdown: Mixdown,
    /// 1-based index into the chosen tracks; 0 applies to every chosen track.
    pub input_number: u32,
    pub encode_rate_type: AudioEncodeRateType,
    pub name: Option<String>,
}

/// Subtitle selections of a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subtitles {
    pub source: Vec<SourceSubtitle>,
    pub files: Vec<FileSubtitle>,
}

/// A subtitle track taken from the scanned title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSubtitle {
    /// 1-based subtitle track of the title.
    pub track_number: u32,
    pub default: bool,
    pub forced: bool,
    pub burned_in: bool,
}

/// An external subtitle file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSubtitle {
    pub file_name: PathBuf,
    pub character_code: String,
    pub language_code: String,
    /// Offset in milliseconds.
    pub offset: i64,
    pub default: bool,
    pub burned_in: bool,
}
