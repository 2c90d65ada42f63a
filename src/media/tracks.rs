//! Pairing of audio encodings with source audio tracks.

use super::title::Title;
use crate::job::model::{AudioEncoding, EncodeJob};

/// Resolves every (encoding, 1-based source track) pair the job will produce.
///
/// An encoding with input number 0 fans out over every chosen track. Input
/// number N selects the Nth chosen track. Track 0 and tracks beyond the
/// title's audio track count are dropped.
pub fn output_tracks<'a>(job: &'a EncodeJob, title: &Title) -> Vec<(&'a AudioEncoding, u32)> {
    let available = title.audio_tracks.len();
    let exists = |track: u32| (1..=available).contains(&(track as usize));

    let mut pairs = Vec::new();
    for encoding in &job.profile.audio_encodings {
        if encoding.input_number == 0 {
            pairs.extend(
                job.chosen_audio_tracks
                    .iter()
                    .copied()
                    .filter(|&track| exists(track))
                    .map(|track| (encoding, track)),
            );
        } else if let Some(&track) = job
            .chosen_audio_tracks
            .get(encoding.input_number as usize - 1)
        {
            if exists(track) {
                pairs.push((encoding, track));
            }
        }
    }

    pairs
}
