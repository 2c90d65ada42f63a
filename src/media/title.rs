//! Scanned title model.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::task::model::Cropping;

/// A ratio such as a pixel aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rational {
    pub num: u32,
    pub den: u32,
}

impl Rational {
    pub const ONE: Rational = Rational { num: 1, den: 1 };

    pub fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// True when either term is zero.
    pub fn is_degenerate(&self) -> bool {
        self.num == 0 || self.den == 0
    }

    /// Reduces to lowest terms. Degenerate ratios become 1:1.
    pub fn reduced(&self) -> Self {
        if self.is_degenerate() {
            return Self::ONE;
        }
        let g = gcd(self.num as u64, self.den as u64) as u32;
        Self::new(self.num / g, self.den / g)
    }

    pub fn as_f64(&self) -> f64 {
        if self.den == 0 {
            0.0
        } else {
            self.num as f64 / self.den as f64
        }
    }
}

/// Reduces a ratio of wide terms, scaling down until both fit in `u32`.
pub(crate) fn reduce_wide(mut num: u64, mut den: u64) -> Rational {
    if num == 0 || den == 0 {
        return Rational::ONE;
    }
    let g = gcd(num, den);
    num /= g;
    den /= g;
    while num > u32::MAX as u64 || den > u32::MAX as u64 {
        num /= 2;
        den /= 2;
    }
    Rational::new(num.max(1) as u32, den.max(1) as u32).reduced()
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// An audio track of a title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrackInfo {
    /// 1-based track number.
    pub track_number: u32,
    pub description: String,
    pub language: String,
    pub language_code: String,
    pub codec: String,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bitrate in bits per second.
    pub bitrate: u32,
    pub channel_layout: u64,
}

/// A subtitle track of a title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleTrackInfo {
    /// 1-based track number.
    pub track_number: u32,
    pub format: String,
    pub source: String,
    pub language: String,
    pub language_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    /// 1-based chapter number.
    pub chapter_number: u32,
    pub name: String,
    pub duration: Duration,
}

/// One scanned title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
    /// 1-based title number.
    pub title_number: u32,
    pub name: String,
    pub path: PathBuf,
    pub duration: Duration,
    /// Frames per second.
    pub framerate: f64,
    pub resolution: Size,
    pub par: Rational,
    pub autocrop: Cropping,
    pub angle_count: u32,
    pub audio_tracks: Vec<AudioTrackInfo>,
    pub subtitles: Vec<SubtitleTrackInfo>,
    pub chapters: Vec<Chapter>,
    pub is_main_feature: bool,
}

/// An immutable snapshot of scanned titles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TitleSet {
    pub titles: Vec<Title>,
    /// Title number of the main feature, 0 when none is flagged.
    pub feature_title: u32,
}

impl TitleSet {
    /// Builds a snapshot, picking the first main-feature title.
    pub fn new(titles: Vec<Title>) -> Self {
        let feature_title = titles
            .iter()
            .find(|t| t.is_main_feature)
            .map(|t| t.title_number)
            .unwrap_or(0);
        Self {
            titles,
            feature_title,
        }
    }

    /// Looks up a title by its number.
    pub fn get(&self, title_number: u32) -> Option<&Title> {
        self.titles.iter().find(|t| t.title_number == title_number)
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}
