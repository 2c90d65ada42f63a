//! Decoding of the engine's title-set JSON.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::title::{AudioTrackInfo, Chapter, Rational, Size, SubtitleTrackInfo, Title, TitleSet};
use crate::error::EngineError;
use crate::task::model::Cropping;

/// The outcome of a finished scan, retained for building encode jobs.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub titles: Arc<TitleSet>,
    pub completed_at: DateTime<Utc>,
}

impl ScanResult {
    pub fn new(titles: Arc<TitleSet>) -> Self {
        Self {
            titles,
            completed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JsonTitleSet {
    #[serde(default)]
    main_feature: i64,
    #[serde(default)]
    title_list: Vec<JsonTitle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JsonTitle {
    index: u32,
    #[serde(default)]
    path: String,
    #[serde(default)]
    name: String,
    #[serde(default = "default_angle_count")]
    angle_count: u32,
    #[serde(default)]
    duration: JsonDuration,
    frame_rate: JsonRational,
    geometry: JsonGeometry,
    #[serde(default)]
    crop: [i32; 4],
    #[serde(default)]
    audio_list: Vec<JsonAudio>,
    #[serde(default)]
    subtitle_list: Vec<JsonSubtitle>,
    #[serde(default)]
    chapter_list: Vec<JsonChapter>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JsonDuration {
    #[serde(default)]
    hours: u64,
    #[serde(default)]
    minutes: u64,
    #[serde(default)]
    seconds: u64,
}

impl From<&JsonDuration> for Duration {
    fn from(d: &JsonDuration) -> Self {
        Duration::from_secs(d.hours * 3600 + d.minutes * 60 + d.seconds)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JsonRational {
    num: u32,
    den: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JsonGeometry {
    width: u32,
    height: u32,
    #[serde(rename = "PAR")]
    par: JsonRational,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JsonAudio {
    #[serde(default)]
    description: String,
    #[serde(default)]
    language: String,
    #[serde(default)]
    language_code: String,
    #[serde(default)]
    codec: String,
    #[serde(default)]
    sample_rate: u32,
    #[serde(default)]
    bit_rate: u32,
    #[serde(default)]
    channel_layout: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JsonSubtitle {
    #[serde(default)]
    format: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    language: String,
    #[serde(default)]
    language_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JsonChapter {
    #[serde(default)]
    name: String,
    #[serde(default)]
    duration: JsonDuration,
}

fn default_angle_count() -> u32 {
    1
}

/// Decodes raw title-set bytes returned by the engine.
pub fn decode_title_set(raw: &[u8]) -> Result<TitleSet, EngineError> {
    let text = String::from_utf8_lossy(raw);
    let json: JsonTitleSet = serde_json::from_str(text.trim_end_matches('\0'))
        .map_err(EngineError::TitleSetDecode)?;

    let titles = json
        .title_list
        .into_iter()
        .map(|t| convert_title(t, json.main_feature))
        .collect();

    Ok(TitleSet::new(titles))
}

fn convert_title(t: JsonTitle, main_feature: i64) -> Title {
    let fps = if t.frame_rate.den == 0 {
        0.0
    } else {
        t.frame_rate.num as f64 / t.frame_rate.den as f64
    };

    Title {
        title_number: t.index,
        name: t.name,
        path: normalize_path(&t.path),
        duration: Duration::from(&t.duration),
        framerate: fps,
        resolution: Size {
            width: t.geometry.width,
            height: t.geometry.height,
        },
        par: Rational::new(t.geometry.par.num, t.geometry.par.den),
        autocrop: Cropping {
            top: t.crop[0],
            bottom: t.crop[1],
            left: t.crop[2],
            right: t.crop[3],
        },
        angle_count: t.angle_count,
        audio_tracks: t
            .audio_list
            .into_iter()
            .zip(1..)
            .map(|(a, n)| AudioTrackInfo {
                track_number: n,
                description: a.description,
                language: a.language,
                language_code: a.language_code,
                codec: a.codec,
                sample_rate: a.sample_rate,
                bitrate: a.bit_rate,
                channel_layout: a.channel_layout,
            })
            .collect(),
        subtitles: t
            .subtitle_list
            .into_iter()
            .zip(1..)
            .map(|(s, n)| SubtitleTrackInfo {
                track_number: n,
                format: s.format,
                source: s.source,
                language: s.language,
                language_code: s.language_code,
            })
            .collect(),
        chapters: t
            .chapter_list
            .into_iter()
            .zip(1..)
            .map(|(c, n)| Chapter {
                chapter_number: n,
                duration: Duration::from(&c.duration),
                name: c.name,
            })
            .collect(),
        is_main_feature: main_feature >= 0 && i64::from(t.index) == main_feature,
    }
}

/// Strips trailing NUL padding left by the native string buffer.
fn normalize_path(raw: &str) -> PathBuf {
    PathBuf::from(raw.trim_end_matches('\0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TITLES: &str = r#"{
        "MainFeature": 2,
        "TitleList": [
            {
                "Index": 1,
                "Path": "/media/disc\u0000\u0000",
                "Name": "Extras",
                "Duration": {"Hours": 0, "Minutes": 5, "Seconds": 0},
                "FrameRate": {"Num": 30000, "Den": 1001},
                "Geometry": {"Width": 720, "Height": 480, "PAR": {"Num": 32, "Den": 27}},
                "Crop": [2, 4, 0, 0]
            },
            {
                "Index": 2,
                "Path": "/media/disc",
                "AngleCount": 2,
                "Duration": {"Hours": 1, "Minutes": 30, "Seconds": 15},
                "FrameRate": {"Num": 25, "Den": 1},
                "Geometry": {"Width": 1920, "Height": 1080, "PAR": {"Num": 1, "Den": 1}},
                "AudioList": [
                    {"Description": "English AC3", "Language": "English", "LanguageCode": "eng",
                     "Codec": "ac3", "SampleRate": 48000, "BitRate": 448000, "ChannelLayout": 1551}
                ],
                "SubtitleList": [{"Format": "bitmap", "Source": "VOBSUB", "Language": "English", "LanguageCode": "eng"}],
                "ChapterList": [{"Name": "Start", "Duration": {"Hours": 0, "Minutes": 45, "Seconds": 0}}]
            }
        ]
    }"#;

    #[test]
    fn test_decode_title_set() {
        let mut raw = TITLES.as_bytes().to_vec();
        raw.extend_from_slice(&[0, 0]);

        let set = decode_title_set(&raw).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.feature_title, 2);

        let extras = set.get(1).unwrap();
        assert_eq!(extras.path, PathBuf::from("/media/disc"));
        assert_eq!(extras.par, Rational::new(32, 27));
        assert_eq!(extras.autocrop.bottom, 4);
        assert!((extras.framerate - 29.97).abs() < 0.01);
        assert!(!extras.is_main_feature);

        let feature = set.get(2).unwrap();
        assert_eq!(feature.duration, Duration::from_secs(5415));
        assert_eq!(feature.angle_count, 2);
        assert_eq!(feature.audio_tracks[0].track_number, 1);
        assert_eq!(feature.audio_tracks[0].bitrate, 448_000);
        assert_eq!(feature.chapters[0].duration, Duration::from_secs(2700));
        assert!(feature.is_main_feature);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_title_set(b"not json").unwrap_err();
        assert!(matches!(err, EngineError::TitleSetDecode(_)));
    }

    #[test]
    fn test_no_main_feature() {
        let set = decode_title_set(br#"{"MainFeature": -1, "TitleList": []}"#).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.feature_title, 0);
    }
}
