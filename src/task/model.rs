//! User-facing encode task descriptors.
//!
//! Every encoder option that ends up as a string in the engine job is a closed
//! enum here, with its engine name held in an explicit `as_str` table. Unknown
//! names are rejected when the task is deserialized.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A queued task. The wrapped task may be missing for placeholder entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueTask {
    /// The task to encode.
    #[serde(default)]
    pub task: Option<EncodeTask>,
}

/// Per-title user configuration for one encode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeTask {
    /// Path to the source media.
    pub source: PathBuf,

    /// Path of the file to write.
    pub destination: PathBuf,

    /// 1-based title number within the source.
    #[serde(default = "default_title")]
    pub title: u32,

    /// Camera angle (1-based).
    #[serde(default = "default_angle")]
    pub angle: u32,

    /// How `start_point`/`end_point` are interpreted.
    #[serde(default)]
    pub point_to_point_mode: PointToPointMode,

    /// Start of the range, in units of the point-to-point mode.
    #[serde(default)]
    pub start_point: i64,

    /// End of the range, in units of the point-to-point mode.
    #[serde(default)]
    pub end_point: i64,

    /// Output container.
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Optimize MP4 for progressive download.
    #[serde(default)]
    pub optimize_mp4: bool,

    /// Add the iPod 5G atom.
    #[serde(default)]
    pub ipod_5g_support: bool,

    /// Picture settings.
    #[serde(default)]
    pub picture: PictureSettings,

    /// Filter settings.
    #[serde(default)]
    pub filters: FilterSettings,

    /// Video settings.
    #[serde(default)]
    pub video: VideoSettings,

    /// Audio tracks to produce.
    #[serde(default)]
    pub audio_tracks: Vec<AudioTrack>,

    /// Subtitle tracks to produce.
    #[serde(default)]
    pub subtitle_tracks: Vec<SubtitleTrack>,

    /// Whether chapter markers are written.
    #[serde(default)]
    pub include_chapter_markers: bool,

    /// Chapter name overrides, in chapter order.
    #[serde(default)]
    pub chapter_names: Vec<ChapterMarker>,

    /// Use `advanced_encoder_options` instead of `extra_advanced_arguments`.
    #[serde(default)]
    pub show_advanced_tab: bool,

    /// Option string edited through the advanced panel.
    #[serde(default)]
    pub advanced_encoder_options: String,

    /// Option string appended to the simple settings.
    #[serde(default)]
    pub extra_advanced_arguments: String,
}

/// Range selection mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointToPointMode {
    /// Chapter numbers (1-based, inclusive).
    #[default]
    Chapters,
    /// Seconds from the start of the title.
    Seconds,
    /// Frame numbers.
    Frames,
    /// Whole title, used for preview encodes.
    Preview,
}

/// Output container format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp4,
    M4v,
    Mkv,
}

/// Picture size, crop and anamorphic settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PictureSettings {
    /// Requested output width.
    #[serde(default)]
    pub width: Option<u32>,

    /// Requested output height.
    #[serde(default)]
    pub height: Option<u32>,

    /// Maximum output width.
    #[serde(default)]
    pub max_width: Option<u32>,

    /// Maximum output height.
    #[serde(default)]
    pub max_height: Option<u32>,

    /// Dimension modulus.
    #[serde(default)]
    pub modulus: Option<u32>,

    /// Anamorphic policy.
    #[serde(default)]
    pub anamorphic: Anamorphic,

    /// Keep the display aspect ratio when resizing.
    #[serde(default = "default_true")]
    pub keep_display_aspect: bool,

    /// Display width for custom anamorphic.
    #[serde(default)]
    pub display_width: Option<f64>,

    /// Custom pixel aspect numerator.
    #[serde(default)]
    pub pixel_aspect_x: u32,

    /// Custom pixel aspect denominator.
    #[serde(default)]
    pub pixel_aspect_y: u32,

    /// Crop applied to the source.
    #[serde(default)]
    pub cropping: Cropping,
}

impl Default for PictureSettings {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            max_width: None,
            max_height: None,
            modulus: None,
            anamorphic: Anamorphic::default(),
            keep_display_aspect: true,
            display_width: None,
            pixel_aspect_x: 0,
            pixel_aspect_y: 0,
            cropping: Cropping::default(),
        }
    }
}

/// Crop amounts in source pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cropping {
    #[serde(default)]
    pub top: i32,
    #[serde(default)]
    pub bottom: i32,
    #[serde(default)]
    pub left: i32,
    #[serde(default)]
    pub right: i32,
}

/// Pixel aspect policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anamorphic {
    /// Square pixels.
    #[default]
    None,
    /// Keep source storage size and pixel aspect.
    Strict,
    /// Scale freely, keep display aspect.
    Loose,
    /// Caller supplied pixel aspect.
    Custom,
}

impl Anamorphic {
    /// Engine mode code.
    pub fn code(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Strict => 1,
            Self::Loose => 2,
            Self::Custom => 3,
        }
    }
}

/// Filter settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterSettings {
    #[serde(default)]
    pub deinterlace: Deinterlace,
    #[serde(default)]
    pub custom_deinterlace: Option<String>,
    #[serde(default)]
    pub decomb: Decomb,
    #[serde(default)]
    pub custom_decomb: Option<String>,
    #[serde(default)]
    pub detelecine: Detelecine,
    #[serde(default)]
    pub custom_detelecine: Option<String>,
    #[serde(default)]
    pub denoise: Denoise,
    #[serde(default)]
    pub denoise_preset: DenoisePreset,
    #[serde(default)]
    pub denoise_tune: DenoiseTune,
    #[serde(default)]
    pub custom_denoise: Option<String>,
    /// Deblock strength. Values of 4 or less mean off.
    #[serde(default)]
    pub deblock: u8,
    #[serde(default)]
    pub grayscale: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deinterlace {
    #[default]
    Off,
    Fast,
    Slow,
    Slower,
    Bob,
    Custom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decomb {
    #[default]
    Off,
    Default,
    Fast,
    Bob,
    Custom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Detelecine {
    #[default]
    Off,
    Default,
    Custom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Denoise {
    #[default]
    Off,
    Hqdn3d,
    NlMeans,
}

/// Denoise strength preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DenoisePreset {
    Ultralight,
    Light,
    #[default]
    Weak,
    Medium,
    Strong,
    Custom,
}

impl DenoisePreset {
    /// Engine name of the preset.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ultralight => "ultralight",
            Self::Light => "light",
            Self::Weak => "weak",
            Self::Medium => "medium",
            Self::Strong => "strong",
            Self::Custom => "custom",
        }
    }
}

/// NLMeans content tune.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DenoiseTune {
    #[default]
    None,
    Film,
    Grain,
    #[serde(alias = "high_motion")]
    HighMotion,
    Animation,
}

impl DenoiseTune {
    /// Engine name of the tune.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Film => "film",
            Self::Grain => "grain",
            Self::HighMotion => "highmotion",
            Self::Animation => "animation",
        }
    }
}

/// Video encoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSettings {
    #[serde(default)]
    pub encoder: VideoEncoder,

    /// Fixed output framerate; `None` keeps the source rate.
    #[serde(default)]
    pub framerate: Option<f64>,

    #[serde(default)]
    pub framerate_mode: FramerateMode,

    #[serde(default)]
    pub rate_type: VideoEncodeRateType,

    /// Constant quality value.
    #[serde(default)]
    pub quality: Option<f64>,

    /// Average bitrate in kbps.
    #[serde(default)]
    pub bitrate: Option<u32>,

    #[serde(default)]
    pub two_pass: bool,

    #[serde(default)]
    pub turbo_first_pass: bool,

    #[serde(default)]
    pub x264_preset: X264Preset,

    #[serde(default)]
    pub x264_tune: X264Tune,

    #[serde(default)]
    pub h264_profile: H264Profile,

    #[serde(default = "default_level")]
    pub h264_level: String,

    /// Adds the x264 `fastdecode` tune.
    #[serde(default)]
    pub fast_decode: bool,

    #[serde(default)]
    pub x265_preset: X265Preset,

    #[serde(default)]
    pub x265_tune: X265Tune,

    #[serde(default)]
    pub h265_profile: X265Profile,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            encoder: VideoEncoder::default(),
            framerate: None,
            framerate_mode: FramerateMode::default(),
            rate_type: VideoEncodeRateType::default(),
            quality: None,
            bitrate: None,
            two_pass: false,
            turbo_first_pass: false,
            x264_preset: X264Preset::default(),
            x264_tune: X264Tune::default(),
            h264_profile: H264Profile::default(),
            h264_level: default_level(),
            fast_decode: false,
            x265_preset: X265Preset::default(),
            x265_tune: X265Tune::default(),
            h265_profile: X265Profile::default(),
        }
    }
}

/// Framerate control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramerateMode {
    /// Variable framerate.
    #[default]
    Vfr,
    /// Constant framerate.
    Cfr,
    /// Peak-limited framerate.
    Pfr,
}

/// Video rate control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoEncodeRateType {
    TargetSize,
    AverageBitrate,
    #[default]
    ConstantQuality,
}

/// Supported video encoders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoEncoder {
    #[default]
    X264,
    X265,
    #[serde(rename = "qsv_h264")]
    QuickSync,
    Mpeg4,
    Mpeg2,
    Theora,
    Vp8,
}

impl VideoEncoder {
    /// Engine short name of the encoder.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X264 => "x264",
            Self::X265 => "x265",
            Self::QuickSync => "qsv_h264",
            Self::Mpeg4 => "ffmpeg4",
            Self::Mpeg2 => "ffmpeg2",
            Self::Theora => "theora",
            Self::Vp8 => "VP8",
        }
    }

    /// Advanced options are `key=value:key=value` for these encoders.
    pub fn uses_colon_options(self) -> bool {
        matches!(self, Self::X264 | Self::X265 | Self::QuickSync)
    }
}

macro_rules! preset_enum {
    ($(#[$meta:meta])* $name:ident, default $default:ident, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant,)+
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl $name {
            /// Engine name of the option.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }

            /// All options, in table order.
            pub fn all() -> &'static [$name] {
                &[$(Self::$variant),+]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

preset_enum!(
    /// x264 speed preset.
    X264Preset, default Medium, {
        Ultrafast => "ultrafast",
        Superfast => "superfast",
        Veryfast => "veryfast",
        Faster => "faster",
        Fast => "fast",
        Medium => "medium",
        Slow => "slow",
        Slower => "slower",
        Veryslow => "veryslow",
        Placebo => "placebo",
    }
);

preset_enum!(
    /// x264 content tune.
    X264Tune, default None, {
        None => "none",
        Film => "film",
        Animation => "animation",
        Grain => "grain",
        Stillimage => "stillimage",
        Psnr => "psnr",
        Ssim => "ssim",
        Zerolatency => "zerolatency",
    }
);

preset_enum!(
    /// H.264 profile.
    H264Profile, default None, {
        None => "none",
        Baseline => "baseline",
        Main => "main",
        High => "high",
    }
);

preset_enum!(
    /// x265 speed preset.
    X265Preset, default Medium, {
        Ultrafast => "ultrafast",
        Superfast => "superfast",
        Veryfast => "veryfast",
        Faster => "faster",
        Fast => "fast",
        Medium => "medium",
        Slow => "slow",
        Slower => "slower",
        Veryslow => "veryslow",
        Placebo => "placebo",
    }
);

preset_enum!(
    /// x265 content tune.
    X265Tune, default None, {
        None => "none",
        Psnr => "psnr",
        Ssim => "ssim",
        Grain => "grain",
        Fastdecode => "fastdecode",
        Zerolatency => "zerolatency",
    }
);

preset_enum!(
    /// H.265 profile.
    X265Profile, default None, {
        None => "none",
        Main => "main",
        Main10 => "main10",
        Mainstillpicture => "mainstillpicture",
    }
);

/// One configured audio output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioTrack {
    #[serde(default)]
    pub encoder: AudioEncoder,

    /// Bitrate in kbps; 0 picks the encoder default.
    #[serde(default)]
    pub bitrate: u32,

    /// Dynamic range compression.
    #[serde(default)]
    pub drc: f64,

    /// Gain in dB.
    #[serde(default)]
    pub gain: f64,

    /// Sample rate in kHz; 0 means auto.
    #[serde(default)]
    pub sample_rate: f64,

    #[serde(default)]
    pub mixdown: Mixdown,

    /// 1-based source track. Synthesized tracks have none.
    #[serde(default)]
    pub track: Option<u32>,

    /// Display name of the output track.
    #[serde(default)]
    pub name: Option<String>,
}

/// Audio encoders, including passthrough variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioEncoder {
    #[default]
    Aac,
    HeAac,
    Mp3,
    Vorbis,
    Ac3,
    Eac3,
    Flac16,
    Flac24,
    Opus,
    AacPassthru,
    Ac3Passthru,
    Eac3Passthru,
    DtsPassthru,
    DtsHdPassthru,
    TrueHdPassthru,
    Mp3Passthru,
    FlacPassthru,
    Passthrough,
}

impl AudioEncoder {
    /// Engine short name of the encoder.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aac => "av_aac",
            Self::HeAac => "fdk_haac",
            Self::Mp3 => "mp3",
            Self::Vorbis => "vorbis",
            Self::Ac3 => "ac3",
            Self::Eac3 => "eac3",
            Self::Flac16 => "flac16",
            Self::Flac24 => "flac24",
            Self::Opus => "opus",
            Self::AacPassthru => "copy:aac",
            Self::Ac3Passthru => "copy:ac3",
            Self::Eac3Passthru => "copy:eac3",
            Self::DtsPassthru => "copy:dts",
            Self::DtsHdPassthru => "copy:dtshd",
            Self::TrueHdPassthru => "copy:truehd",
            Self::Mp3Passthru => "copy:mp3",
            Self::FlacPassthru => "copy:flac",
            Self::Passthrough => "copy",
        }
    }

    /// Whether the source stream is copied without re-encoding.
    pub fn is_passthrough(self) -> bool {
        self.as_str().starts_with("copy")
    }

    /// Samples carried by one output frame.
    pub fn samples_per_frame(self) -> u32 {
        match self {
            Self::Aac | Self::HeAac | Self::Vorbis | Self::AacPassthru => 1024,
            Self::Mp3 | Self::Mp3Passthru => 1152,
            Self::Opus => 960,
            _ => 1536,
        }
    }

    /// Default bitrate in kbps for the given mixdown and sample rate.
    pub fn default_bitrate(self, mixdown: Mixdown, sample_rate: u32) -> u32 {
        let channels = mixdown.channels().max(1);
        let bitrate = match self {
            Self::Ac3 | Self::Eac3 => {
                if channels > 2 {
                    640
                } else {
                    224
                }
            }
            Self::HeAac => 40 * channels,
            Self::Opus => 64 * channels,
            Self::Flac16 | Self::Flac24 => 0,
            _ => 80 * channels,
        };

        if sample_rate > 0 && sample_rate < 32000 {
            bitrate / 2
        } else {
            bitrate
        }
    }
}

/// Output channel layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mixdown {
    /// Keep the source layout.
    None,
    Mono,
    #[default]
    Stereo,
    DolbySurround,
    DolbyProLogicII,
    #[serde(rename = "5point1")]
    FivePointOne,
    #[serde(rename = "6point1")]
    SixPointOne,
    #[serde(rename = "7point1")]
    SevenPointOne,
}

impl Mixdown {
    /// Engine short name of the mixdown.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Mono => "mono",
            Self::Stereo => "stereo",
            Self::DolbySurround => "dpl1",
            Self::DolbyProLogicII => "dpl2",
            Self::FivePointOne => "5point1",
            Self::SixPointOne => "6point1",
            Self::SevenPointOne => "7point1",
        }
    }

    /// Number of output channels, 0 when the source layout is kept.
    pub fn channels(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Mono => 1,
            Self::Stereo | Self::DolbySurround | Self::DolbyProLogicII => 2,
            Self::FivePointOne => 6,
            Self::SixPointOne => 7,
            Self::SevenPointOne => 8,
        }
    }
}

/// One configured subtitle output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitleTrack {
    /// Where the subtitle comes from.
    pub source: SubtitleSource,

    #[serde(default)]
    pub default: bool,

    #[serde(default)]
    pub forced: bool,

    #[serde(default)]
    pub burned: bool,
}

/// Origin of a subtitle track.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubtitleSource {
    /// An external subtitle file.
    File {
        file_name: PathBuf,
        #[serde(default = "default_char_code")]
        char_code: String,
        #[serde(default = "default_language")]
        language: String,
        /// Offset in milliseconds.
        #[serde(default)]
        offset: i64,
    },
    /// A track of the scanned title. `None` when the reference went stale.
    Track {
        #[serde(default)]
        track_number: Option<u32>,
    },
}

/// A chapter name override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterMarker {
    #[serde(default)]
    pub number: u32,
    pub name: String,
}

fn default_title() -> u32 {
    1
}

fn default_angle() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "auto".to_string()
}

fn default_char_code() -> String {
    "UTF-8".to_string()
}

fn default_language() -> String {
    "und".to_string()
}
