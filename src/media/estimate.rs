//! Bitrate and output size estimation.

use super::title::Title;
use super::tracks::output_tracks;
use crate::job::model::{AudioEncodeRateType, EncodeJob, VideoRange};

/// Muxing overhead added for every video and audio frame.
pub const CONTAINER_OVERHEAD_PER_FRAME: i64 = 6;

/// Padding added to every estimated length.
const LENGTH_MARGIN_SECS: f64 = 1.5;

const BYTES_PER_MB: i64 = 1024 * 1024;

/// 1 kbps is 125 bytes per second.
const BYTES_PER_KBIT: f64 = 125.0;

/// Video bitrate in kbps that lets the job fit in `size_mb`.
///
/// `override_length_secs` replaces the job length when positive. A budget
/// exhausted by audio and container overhead yields 0.
pub fn bitrate_for_target_size(
    job: &EncodeJob,
    title: &Title,
    size_mb: u32,
    override_length_secs: f64,
) -> u32 {
    let length = output_length_secs(job, title, override_length_secs);

    let mut available = i64::from(size_mb) * BYTES_PER_MB;
    available -= frame_count(job, title, length) * CONTAINER_OVERHEAD_PER_FRAME;
    available -= audio_size_bytes(job, title, length);

    if available < 0 {
        return 0;
    }

    (available as f64 / (BYTES_PER_KBIT * length)) as u32
}

/// Estimated output size in MB for a video bitrate in kbps.
pub fn size_for_bitrate(job: &EncodeJob, title: &Title, video_kbps: u32) -> f64 {
    let length = output_length_secs(job, title, 0.0);

    let mut total = (length * f64::from(video_kbps) * BYTES_PER_KBIT) as i64;
    total += frame_count(job, title, length) * CONTAINER_OVERHEAD_PER_FRAME;
    total += audio_size_bytes(job, title, length);

    total as f64 / BYTES_PER_MB as f64
}

/// Length of the selected range of the title, in seconds.
pub fn job_length_secs(job: &EncodeJob, title: &Title) -> f64 {
    match job.range {
        VideoRange::All => title.duration.as_secs_f64(),
        VideoRange::Chapters { start, end } => {
            let first = start.max(1) as usize;
            let last = (end as usize).min(title.chapters.len());
            if first > last {
                return 0.0;
            }
            title.chapters[first - 1..last]
                .iter()
                .map(|c| c.duration.as_secs_f64())
                .sum()
        }
        VideoRange::Seconds { start, end } => (end - start).max(0.0),
        VideoRange::Frames { start, end } => {
            if title.framerate > 0.0 {
                (end - start).max(0) as f64 / title.framerate
            } else {
                0.0
            }
        }
    }
}

/// Output framerate: the profile's when set, otherwise the title's.
pub fn output_framerate(job: &EncodeJob, title: &Title) -> f64 {
    if job.profile.framerate > 0.0 {
        job.profile.framerate
    } else {
        title.framerate
    }
}

/// Estimated bytes of every audio output over `length_secs`.
pub fn audio_size_bytes(job: &EncodeJob, title: &Title, length_secs: f64) -> i64 {
    let mut total = 0i64;

    for (encoding, track_number) in output_tracks(job, title) {
        let Some(track) = title.audio_tracks.get(track_number as usize - 1) else {
            continue;
        };

        let passthrough = encoding.encoder.is_passthrough();
        let sample_rate = if passthrough {
            track.sample_rate
        } else {
            encoding.sample_rate_raw
        };

        let bytes_per_second = if passthrough {
            f64::from(track.bitrate) / 8.0
        } else if encoding.encode_rate_type == AudioEncodeRateType::Quality {
            0.0
        } else {
            let kbps = if encoding.bitrate > 0 {
                encoding.bitrate
            } else {
                encoding
                    .encoder
                    .default_bitrate(encoding.mixdown, sample_rate)
            };
            f64::from(kbps) * BYTES_PER_KBIT
        };

        let samples_per_frame = f64::from(encoding.encoder.samples_per_frame());
        let frames = (length_secs * f64::from(sample_rate) / samples_per_frame) as i64;

        total += (length_secs * bytes_per_second) as i64;
        total += frames * CONTAINER_OVERHEAD_PER_FRAME;
    }

    total
}

fn output_length_secs(job: &EncodeJob, title: &Title, override_secs: f64) -> f64 {
    let base = if override_secs > 0.0 {
        override_secs
    } else {
        job_length_secs(job, title)
    };
    base + LENGTH_MARGIN_SECS
}

fn frame_count(job: &EncodeJob, title: &Title, length_secs: f64) -> i64 {
    (length_secs * output_framerate(job, title)) as i64
}
