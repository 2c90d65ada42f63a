//! Task file loading.

use std::path::Path;

use super::model::EncodeTask;
use crate::error::TaskError;

/// Loads an encode task from a YAML file.
pub fn load_from_path(path: &Path) -> Result<EncodeTask, TaskError> {
    let content = std::fs::read_to_string(path).map_err(|e| TaskError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse(&content).map_err(|message| TaskError::ParseFailed {
        path: path.to_path_buf(),
        message,
    })
}

/// Parses an encode task from YAML text.
pub fn parse(content: &str) -> Result<EncodeTask, String> {
    serde_yaml::from_str(content).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::model::{AudioEncoder, PointToPointMode, SubtitleSource, X264Preset};
    use std::io::Write;

    const TASK: &str = r#"
source: /media/disc
destination: /out/movie.mp4
title: 2
point_to_point_mode: chapters
start_point: 1
end_point: 3
video:
  encoder: x264
  x264_preset: slow
  rate_type: average_bitrate
  bitrate: 2500
audio_tracks:
  - encoder: aac
    bitrate: 160
    sample_rate: 48
    track: 1
subtitle_tracks:
  - source:
      kind: track
      track_number: 2
    forced: true
"#;

    #[test]
    fn test_parse_task_defaults() {
        let task = parse(TASK).unwrap();

        assert_eq!(task.title, 2);
        assert_eq!(task.angle, 1);
        assert_eq!(task.point_to_point_mode, PointToPointMode::Chapters);
        assert_eq!(task.video.x264_preset, X264Preset::Slow);
        assert_eq!(task.video.h264_level, "auto");
        assert!(task.picture.keep_display_aspect);
        assert_eq!(task.audio_tracks[0].encoder, AudioEncoder::Aac);
        assert!(matches!(
            task.subtitle_tracks[0].source,
            SubtitleSource::Track {
                track_number: Some(2)
            }
        ));
    }

    #[test]
    fn test_unknown_preset_is_rejected() {
        let yaml = "source: a\ndestination: b\nvideo:\n  x264_preset: warp\n";
        let err = parse(yaml).unwrap_err();
        assert!(err.contains("warp") || err.contains("unknown variant"));
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TASK.as_bytes()).unwrap();

        let task = load_from_path(file.path()).unwrap();
        assert_eq!(task.end_point, 3);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_from_path(Path::new("/nonexistent/task.yaml")).unwrap_err();
        assert!(matches!(err, TaskError::ReadFailed { .. }));
    }
}
