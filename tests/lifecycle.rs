//! End-to-end scan, estimate and encode against a scripted engine.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_test::assert_ok;

use transcode_interop::config::model::EngineConfig;
use transcode_interop::engine::{
    EngineErrorCode, InstanceEvent, ScanRequest, TranscodeInstance,
};
use transcode_interop::job::{self, EncodeOptions, PreviewEncode};
use transcode_interop::task::loader::parse;
use transcode_interop::testing::ScriptedEngine;

const WAIT: Duration = Duration::from_secs(5);

const TASK: &str = r#"
source: /media/disc
destination: /out/feature.mkv
title: 2
output_format: mkv
start_point: 1
end_point: 3
picture:
  max_width: 1280
  anamorphic: none
video:
  encoder: x264
  rate_type: average_bitrate
  bitrate: 1500
audio_tracks:
  - encoder: aac
    bitrate: 160
    sample_rate: 48
    mixdown: stereo
    track: 1
  - encoder: ac3_passthru
    track: 2
  - encoder: aac
    bitrate: 96
    track: 9
"#;

fn config() -> EngineConfig {
    EngineConfig {
        scan_poll_interval_ms: 5,
        encode_poll_interval_ms: 5,
        ..EngineConfig::default()
    }
}

async fn next_event(rx: &mut broadcast::Receiver<InstanceEvent>) -> InstanceEvent {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

#[tokio::test]
async fn test_scan_estimate_encode() {
    let engine = Arc::new(
        ScriptedEngine::new()
            .with_states([
                ScriptedEngine::scanning_state(0.5, 1, 2),
                ScriptedEngine::scan_done_state(),
            ])
            .with_title_set(ScriptedEngine::title_set_json(&[(1, false), (2, true)])),
    );
    let instance = TranscodeInstance::new(Arc::clone(&engine), &config()).unwrap();
    let mut rx = instance.subscribe();

    // Scan
    assert_ok!(instance.start_scan(ScanRequest::new("/media/disc", 10)));
    let completed = loop {
        if let InstanceEvent::ScanCompleted {
            title_count,
            feature_title,
        } = next_event(&mut rx).await
        {
            break (title_count, feature_title);
        }
    };
    assert_eq!(completed, (2, 2));
    assert_eq!(engine.scans()[0].min_duration_ticks, 900_000);

    // Estimate
    let task = parse(TASK).unwrap();
    let job = job::translate(&task);
    assert_eq!(job.chosen_audio_tracks, vec![1, 2, 9]);

    let kbps = assert_ok!(instance.calculate_bitrate(&job, 700, 0.0));
    assert!(kbps > 0);
    let size_mb = instance.calculate_file_size(&job, kbps).unwrap();
    assert!(
        (699.0..=700.0).contains(&size_mb),
        "size {size_mb} MB for {kbps} kbps"
    );

    // Encode
    engine.push_states([
        ScriptedEngine::working_state(0.25, 1, 1),
        ScriptedEngine::working_state(0.75, 1, 1),
        ScriptedEngine::work_done_state(0),
    ]);
    assert_ok!(instance.start_encode(&job, EncodeOptions::default(), 10));

    let mut progress = Vec::new();
    let done = loop {
        match next_event(&mut rx).await {
            InstanceEvent::EncodeProgress(p) => progress.push(p),
            InstanceEvent::EncodeCompleted { error, error_code } => break (error, error_code),
            other => panic!("unexpected event {other:?}"),
        }
    };
    assert_eq!(done, (false, EngineErrorCode::None));
    assert_eq!(progress.len(), 2);
    assert_eq!(progress[0].estimated_time_left, Duration::from_secs(200));
    assert!(instance.current_session().is_none());

    // Submitted payload
    let jobs = engine.submitted_jobs();
    assert_eq!(jobs.len(), 1);
    let payload: serde_json::Value = serde_json::from_str(&jobs[0]).unwrap();
    assert_eq!(payload["Source"]["Title"], 2);
    assert_eq!(payload["Destination"]["Mux"], "av_mkv");

    let audio = payload["Audio"]["AudioList"].as_array().unwrap();
    let tracks: Vec<_> = audio.iter().map(|a| a["Track"].as_u64().unwrap()).collect();
    assert_eq!(tracks, vec![0, 1], "out-of-range track 9 is dropped");

    instance.dispose();
    assert_eq!(engine.close_count(), 1);
}

#[tokio::test]
async fn test_preview_encode_and_cancel() {
    let engine = Arc::new(
        ScriptedEngine::new()
            .with_states([ScriptedEngine::scan_done_state()])
            .with_title_set(ScriptedEngine::title_set_json(&[(1, true)])),
    );
    let instance = TranscodeInstance::new(Arc::clone(&engine), &config()).unwrap();
    let mut rx = instance.subscribe();

    instance
        .start_scan(ScanRequest::new("/media/disc", 10).with_title(1))
        .unwrap();
    assert!(matches!(
        next_event(&mut rx).await,
        InstanceEvent::ScanCompleted { title_count: 1, .. }
    ));

    let task = parse("source: /media/disc\ndestination: /out/preview.mp4\n").unwrap();
    let job = job::translate(&task);

    engine.push_states([ScriptedEngine::work_done_state(1)]);
    instance
        .start_encode(
            &job,
            EncodeOptions {
                preview: Some(PreviewEncode {
                    preview_number: 3,
                    seconds: 15,
                }),
            },
            10,
        )
        .unwrap();

    let event = next_event(&mut rx).await;
    assert_eq!(
        event,
        InstanceEvent::EncodeCompleted {
            error: true,
            error_code: EngineErrorCode::Canceled,
        }
    );

    let payload: serde_json::Value =
        serde_json::from_str(&engine.submitted_jobs()[0]).unwrap();
    assert_eq!(payload["Source"]["Range"]["Type"], "preview");
    assert_eq!(payload["Source"]["Range"]["Start"], 3);
    assert_eq!(payload["Source"]["Range"]["End"], 15 * 90_000);
}
