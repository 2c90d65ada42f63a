//! Scan and encode lifecycle over a polled native engine.
//!
//! The engine only reports progress when asked. Each scan or encode session
//! runs one spawned poll loop that sleeps, queries the engine state, and turns
//! it into [`InstanceEvent`]s on a broadcast channel. A loop never overlaps
//! itself and stops on its terminal state or when the instance is disposed.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn, Instrument};

use super::events::{EncodeProgress, InstanceEvent, ScanProgress, SessionInfo, SessionKind};
use super::handle::{EngineGuard, EngineHandle};
use super::state::{self, EngineErrorCode, EngineState};
use super::NativeEngine;
use crate::config::model::{EngineConfig, ScanDefaults};
use crate::error::InstanceError;
use crate::job::model::EncodeJob;
use crate::job::payload::{self, EncodeOptions, TICKS_PER_SECOND};
use crate::media::geometry::{self, Geometry};
use crate::media::scan::{self as scan_decode, ScanResult};
use crate::media::title::TitleSet;
use crate::media::estimate;

const DEFAULT_MIN_DURATION: Duration = Duration::from_secs(10);

/// Parameters of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub path: PathBuf,
    pub preview_count: u32,
    /// Titles shorter than this are skipped.
    pub min_duration: Duration,
    /// 1-based title to scan, 0 for all titles.
    pub title_index: u32,
}

impl ScanRequest {
    /// Scans every title of `path` longer than ten seconds.
    pub fn new(path: impl Into<PathBuf>, preview_count: u32) -> Self {
        Self {
            path: path.into(),
            preview_count,
            min_duration: DEFAULT_MIN_DURATION,
            title_index: 0,
        }
    }

    /// Builds a request from configured defaults.
    pub fn from_defaults(path: impl Into<PathBuf>, defaults: &ScanDefaults) -> Self {
        Self::new(path, defaults.preview_count)
            .with_min_duration(Duration::from_secs(defaults.min_duration_secs))
    }

    pub fn with_min_duration(mut self, min_duration: Duration) -> Self {
        self.min_duration = min_duration;
        self
    }

    /// Restricts the scan to one title. Single-title scans have no minimum duration.
    pub fn with_title(mut self, title_index: u32) -> Self {
        self.title_index = title_index;
        self.min_duration = Duration::ZERO;
        self
    }

    fn min_duration_ticks(&self) -> u64 {
        (self.min_duration.as_secs_f64() * TICKS_PER_SECOND as f64) as u64
    }
}

/// A rendered preview frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewFrame {
    pub geometry: Geometry,
    /// BGRA pixels, `width * height * 4` bytes.
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Scanning,
    Encoding,
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanning => "scan",
            Self::Encoding => "encode",
        }
    }
}

/// State shared between the instance and its poll loops.
struct Shared {
    titles: RwLock<Arc<TitleSet>>,
    last_scan: RwLock<Option<ScanResult>>,
    phase: Mutex<Phase>,
    session: Mutex<Option<SessionInfo>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            titles: RwLock::new(Arc::new(TitleSet::default())),
            last_scan: RwLock::new(None),
            phase: Mutex::new(Phase::Idle),
            session: Mutex::new(None),
        }
    }

    fn titles(&self) -> Arc<TitleSet> {
        Arc::clone(&self.titles.read().unwrap_or_else(|p| p.into_inner()))
    }

    fn publish_scan(&self, titles: Arc<TitleSet>, retained: Option<ScanResult>) {
        *self.titles.write().unwrap_or_else(|p| p.into_inner()) = titles;
        *self.last_scan.write().unwrap_or_else(|p| p.into_inner()) = retained;
    }

    fn last_scan(&self) -> Option<ScanResult> {
        self.last_scan
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn session(&self) -> Option<SessionInfo> {
        self.session
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Moves from idle into `next`, opening a session.
    fn begin(&self, next: Phase, kind: SessionKind) -> Result<SessionInfo, InstanceError> {
        let mut phase = self.phase.lock().unwrap_or_else(|p| p.into_inner());
        if *phase != Phase::Idle {
            return Err(InstanceError::AlreadyInProgress {
                phase: phase.as_str(),
            });
        }
        *phase = next;

        let session = SessionInfo::new(kind);
        *self.session.lock().unwrap_or_else(|p| p.into_inner()) = Some(session.clone());
        Ok(session)
    }

    /// Returns to idle and closes the session.
    fn finish(&self) {
        *self.phase.lock().unwrap_or_else(|p| p.into_inner()) = Phase::Idle;
        *self.session.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }
}

/// Drives scans and encodes on one native engine instance.
///
/// Scans and encodes are exclusive: starting either while a session is
/// running fails with [`InstanceError::AlreadyInProgress`]. Methods that start
/// a session spawn a Tokio task and must be called from within a runtime.
pub struct TranscodeInstance<E: NativeEngine + 'static> {
    handle: Arc<EngineHandle<E>>,
    shared: Arc<Shared>,
    events: broadcast::Sender<InstanceEvent>,
    shutdown_tx: broadcast::Sender<()>,
    scan_poll_interval: Duration,
    encode_poll_interval: Duration,
    preview_count: AtomicU32,
    disposed: AtomicBool,
}

impl<E: NativeEngine + 'static> TranscodeInstance<E> {
    /// Initializes `engine` and takes ownership of it.
    pub fn new(engine: E, config: &EngineConfig) -> Result<Self, InstanceError> {
        let handle = EngineHandle::new(engine);
        handle.get()?.initialize(config.verbosity)?;

        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (shutdown_tx, _) = broadcast::channel(1);

        info!(
            verbosity = config.verbosity,
            scan_poll_ms = config.scan_poll_interval_ms,
            encode_poll_ms = config.encode_poll_interval_ms,
            "Transcode instance initialized"
        );

        Ok(Self {
            handle: Arc::new(handle),
            shared: Arc::new(Shared::new()),
            events,
            shutdown_tx,
            scan_poll_interval: config.scan_poll_interval(),
            encode_poll_interval: config.encode_poll_interval(),
            preview_count: AtomicU32::new(0),
            disposed: AtomicBool::new(false),
        })
    }

    /// Subscribes to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<InstanceEvent> {
        self.events.subscribe()
    }

    pub fn version(&self) -> Result<String, InstanceError> {
        Ok(self.engine()?.version())
    }

    pub fn build(&self) -> Result<i32, InstanceError> {
        Ok(self.engine()?.build())
    }

    /// The current title snapshot.
    pub fn titles(&self) -> Arc<TitleSet> {
        self.shared.titles()
    }

    /// Main feature of the current snapshot, 0 if none.
    pub fn feature_title(&self) -> u32 {
        self.shared.titles().feature_title
    }

    /// Preview count of the last scan or encode request.
    pub fn preview_count(&self) -> u32 {
        self.preview_count.load(Ordering::Relaxed)
    }

    /// The running scan or encode session, if any.
    pub fn current_session(&self) -> Option<SessionInfo> {
        self.shared.session()
    }

    /// Starts a scan and returns immediately. Completion arrives as
    /// [`InstanceEvent::ScanCompleted`].
    pub fn start_scan(&self, request: ScanRequest) -> Result<(), InstanceError> {
        let engine = self.engine()?;
        let session = self.shared.begin(Phase::Scanning, SessionKind::Scan)?;
        self.preview_count
            .store(request.preview_count, Ordering::Relaxed);

        info!(
            session = %session.id,
            path = %request.path.display(),
            title_index = request.title_index,
            previews = request.preview_count,
            "Starting scan"
        );

        if let Err(e) = engine.scan(
            &request.path,
            request.title_index,
            request.preview_count,
            request.min_duration_ticks(),
        ) {
            self.shared.finish();
            return Err(e.into());
        }

        self.spawn_poll_loop(session, self.scan_poll_interval, poll_scan::<E>);
        Ok(())
    }

    /// Asks the engine to abandon the running scan.
    pub fn stop_scan(&self) -> Result<(), InstanceError> {
        self.engine()?.stop_scan();
        Ok(())
    }

    /// Renders scan preview `preview_index` with the job's picture settings.
    pub fn get_preview(
        &self,
        job: &EncodeJob,
        preview_index: u32,
    ) -> Result<PreviewFrame, InstanceError> {
        let engine = self.engine()?;
        let titles = self.titles();
        let title = titles
            .get(job.title)
            .ok_or(InstanceError::TitleNotFound { title: job.title })?;

        let settings = geometry::geometry_settings(job, title);
        let g = geometry::resolve(job, title);
        let mut data = vec![0u8; g.width as usize * g.height as usize * 4];
        engine.get_preview(job.title, preview_index, &settings, &mut data)?;

        Ok(PreviewFrame { geometry: g, data })
    }

    /// Video bitrate in kbps that fits the job in `size_mb`.
    pub fn calculate_bitrate(
        &self,
        job: &EncodeJob,
        size_mb: u32,
        override_length_secs: f64,
    ) -> Result<u32, InstanceError> {
        let titles = self.titles();
        let title = titles
            .get(job.title)
            .ok_or(InstanceError::TitleNotFound { title: job.title })?;
        Ok(estimate::bitrate_for_target_size(
            job,
            title,
            size_mb,
            override_length_secs,
        ))
    }

    /// Estimated output size in MB at `video_kbps`.
    pub fn calculate_file_size(&self, job: &EncodeJob, video_kbps: u32) -> Result<f64, InstanceError> {
        let titles = self.titles();
        let title = titles
            .get(job.title)
            .ok_or(InstanceError::TitleNotFound { title: job.title })?;
        Ok(estimate::size_for_bitrate(job, title, video_kbps))
    }

    /// Submits `job` against the last scan and starts encoding. Completion
    /// arrives as [`InstanceEvent::EncodeCompleted`].
    pub fn start_encode(
        &self,
        job: &EncodeJob,
        options: EncodeOptions,
        scan_preview_count: u32,
    ) -> Result<(), InstanceError> {
        let engine = self.engine()?;
        let scan = self.shared.last_scan().ok_or(InstanceError::NoScanResult)?;
        let document = payload::build(job, &scan, &options)?;
        let json = serde_json::to_string_pretty(&document)?;

        let session = self.shared.begin(Phase::Encoding, SessionKind::Encode)?;
        self.preview_count
            .store(scan_preview_count, Ordering::Relaxed);

        info!(
            session = %session.id,
            title = job.title,
            output = %job.output_path.display(),
            preview = options.preview.is_some(),
            "Starting encode"
        );

        if let Err(e) = engine.add_job(&json).and_then(|()| engine.start()) {
            self.shared.finish();
            return Err(e.into());
        }

        self.spawn_poll_loop(session, self.encode_poll_interval, poll_encode::<E>);
        Ok(())
    }

    pub fn pause_encode(&self) -> Result<(), InstanceError> {
        self.engine()?.pause();
        Ok(())
    }

    pub fn resume_encode(&self) -> Result<(), InstanceError> {
        self.engine()?.resume();
        Ok(())
    }

    /// Stops encoding and drops every job still queued in the engine.
    pub fn stop_encode(&self) -> Result<(), InstanceError> {
        let engine = self.engine()?;
        engine.stop();

        let queued = engine.job_count();
        for _ in 0..queued {
            engine.remove_first_job();
        }
        debug!(removed = queued, "Cleared engine job queue");
        Ok(())
    }

    /// Stops all polling and releases the engine. Safe to call repeatedly.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.shutdown_tx.send(());
        self.shared.finish();
        if self.handle.release() {
            info!("Transcode instance disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn engine(&self) -> Result<EngineGuard<'_, E>, InstanceError> {
        if self.is_disposed() {
            return Err(InstanceError::Disposed);
        }
        Ok(self.handle.get()?)
    }

    fn spawn_poll_loop(
        &self,
        session: SessionInfo,
        interval: Duration,
        poll: fn(&E, &Shared, &broadcast::Sender<InstanceEvent>) -> PollOutcome,
    ) {
        let handle = Arc::clone(&self.handle);
        let shared = Arc::clone(&self.shared);
        let events = self.events.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let span = tracing::info_span!("session", id = %session.id, kind = %session.kind);

        tokio::spawn(
            async move {
                debug!("Poll loop started");
                loop {
                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            info!("Poll loop received shutdown signal");
                            break;
                        }
                        _ = tokio::time::sleep(interval) => {
                            // Native calls block, so they run off the async workers.
                            let handle = Arc::clone(&handle);
                            let shared = Arc::clone(&shared);
                            let events = events.clone();
                            let span = tracing::Span::current();
                            let outcome = tokio::task::spawn_blocking(move || {
                                let _entered = span.enter();
                                let engine = handle.get().ok()?;
                                Some(poll(&*engine, &shared, &events))
                            })
                            .await;

                            match outcome {
                                Ok(Some(PollOutcome::Continue)) => {}
                                Ok(Some(PollOutcome::Finished)) | Ok(None) => break,
                                Err(e) => {
                                    warn!(error = %e, "Poll task failed");
                                    break;
                                }
                            }
                        }
                    }
                }
                debug!("Poll loop stopped");
            }
            .instrument(span),
        );
    }
}

impl<E: NativeEngine + 'static> Drop for TranscodeInstance<E> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollOutcome {
    Continue,
    Finished,
}

fn read_state<E: NativeEngine>(engine: &E) -> Option<EngineState> {
    let decoded = engine
        .get_state_json()
        .and_then(|raw| state::decode_state(&raw));
    match decoded {
        Ok(state) => Some(state),
        Err(e) => {
            warn!(error = %e, "Failed to read engine state");
            None
        }
    }
}

fn poll_scan<E: NativeEngine>(
    engine: &E,
    shared: &Shared,
    events: &broadcast::Sender<InstanceEvent>,
) -> PollOutcome {
    match read_state(engine) {
        Some(EngineState::Scanning(s)) => {
            debug!(progress = s.progress, title = s.title, titles = s.title_count, "Scan progress");
            let _ = events.send(InstanceEvent::ScanProgress(ScanProgress {
                progress: s.progress,
                current_preview: s.preview,
                previews: s.preview_count,
                current_title: s.title,
                titles: s.title_count,
            }));
            PollOutcome::Continue
        }
        Some(EngineState::ScanDone) => {
            let decoded = engine
                .get_title_set_json()
                .and_then(|raw| scan_decode::decode_title_set(&raw));

            let (titles, retained) = match decoded {
                Ok(set) => {
                    let titles = Arc::new(set);
                    let retained = ScanResult::new(Arc::clone(&titles));
                    (titles, Some(retained))
                }
                Err(e) => {
                    warn!(error = %e, "Failed to decode scan result, publishing an empty title set");
                    (Arc::new(TitleSet::default()), None)
                }
            };

            let title_count = titles.len();
            let feature_title = titles.feature_title;
            shared.publish_scan(titles, retained);
            shared.finish();

            info!(title_count, feature_title, "Scan completed");
            let _ = events.send(InstanceEvent::ScanCompleted {
                title_count,
                feature_title,
            });
            PollOutcome::Finished
        }
        _ => PollOutcome::Continue,
    }
}

fn poll_encode<E: NativeEngine>(
    engine: &E,
    shared: &Shared,
    events: &broadcast::Sender<InstanceEvent>,
) -> PollOutcome {
    match read_state(engine) {
        Some(EngineState::Working(w)) => {
            debug!(progress = w.progress, pass = w.pass, rate = w.rate, "Encode progress");
            let seconds_left = w.hours.max(0) as u64 * 3600
                + w.minutes.max(0) as u64 * 60
                + w.seconds.max(0) as u64;
            let _ = events.send(InstanceEvent::EncodeProgress(EncodeProgress {
                fraction_complete: w.progress,
                current_rate: w.rate,
                average_rate: w.rate_avg,
                estimated_time_left: Duration::from_secs(seconds_left),
                pass: w.pass,
                pass_count: w.pass_count,
            }));
            PollOutcome::Continue
        }
        Some(EngineState::WorkDone(code)) => {
            shared.finish();
            let error = code != EngineErrorCode::None;
            if error {
                warn!(error_code = ?code, "Encode finished with error");
            } else {
                info!("Encode completed");
            }
            let _ = events.send(InstanceEvent::EncodeCompleted {
                error,
                error_code: code,
            });
            PollOutcome::Finished
        }
        Some(EngineState::Paused | EngineState::Muxing) => {
            debug!("Encode paused or muxing");
            PollOutcome::Continue
        }
        _ => PollOutcome::Continue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockNativeEngine;
    use crate::error::EngineError;
    use crate::testing::ScriptedEngine;
    use mockall::predicate::eq;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    fn fast_config() -> EngineConfig {
        EngineConfig {
            scan_poll_interval_ms: 5,
            encode_poll_interval_ms: 5,
            ..EngineConfig::default()
        }
    }

    fn mock() -> MockNativeEngine {
        let mut engine = MockNativeEngine::new();
        engine.expect_initialize().with(eq(1)).times(1).returning(|_| Ok(()));
        engine.expect_close().times(1).return_const(());
        engine
    }

    fn job(title: u32) -> EncodeJob {
        let task = crate::task::loader::parse(&format!(
            "source: /in\ndestination: /out.mp4\ntitle: {title}\n"
        ))
        .unwrap();
        crate::job::translate::translate(&task)
    }

    async fn next_event(rx: &mut broadcast::Receiver<InstanceEvent>) -> InstanceEvent {
        timeout(WAIT, rx.recv()).await.unwrap().unwrap()
    }

    async fn scan(instance: &TranscodeInstance<Arc<ScriptedEngine>>) {
        let mut rx = instance.subscribe();
        instance.start_scan(ScanRequest::new("/media/disc", 10)).unwrap();
        loop {
            if let InstanceEvent::ScanCompleted { .. } = next_event(&mut rx).await {
                break;
            }
        }
    }

    #[test]
    fn test_scan_request_constructors() {
        let request = ScanRequest::new("/disc", 10);
        assert_eq!(request.min_duration_ticks(), 900_000);
        assert_eq!(request.title_index, 0);

        let single = ScanRequest::new("/disc", 10).with_title(3);
        assert_eq!(single.title_index, 3);
        assert_eq!(single.min_duration_ticks(), 0);

        let configured = ScanRequest::from_defaults(
            "/disc",
            &ScanDefaults {
                preview_count: 30,
                min_duration_secs: 60,
            },
        );
        assert_eq!(configured.preview_count, 30);
        assert_eq!(configured.min_duration_ticks(), 60 * 90_000);

        let fractional =
            ScanRequest::new("/disc", 10).with_min_duration(Duration::from_millis(1500));
        assert_eq!(fractional.min_duration_ticks(), 135_000);
    }

    #[tokio::test]
    async fn test_version_and_build_pass_through() {
        let mut engine = mock();
        engine.expect_version().return_const("1.0.7".to_string());
        engine.expect_build().return_const(2017_0212);

        let instance = TranscodeInstance::new(engine, &EngineConfig::default()).unwrap();
        assert_eq!(instance.version().unwrap(), "1.0.7");
        assert_eq!(instance.build().unwrap(), 2017_0212);
    }

    #[tokio::test]
    async fn test_scan_forwards_arguments() {
        let mut engine = mock();
        engine
            .expect_scan()
            .withf(|path, title, previews, ticks| {
                path == std::path::Path::new("/media/disc")
                    && *title == 2
                    && *previews == 5
                    && *ticks == 0
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));
        engine
            .expect_get_state_json()
            .returning(|| Ok(br#"{"State":"IDLE"}"#.to_vec()));

        let instance = TranscodeInstance::new(engine, &fast_config()).unwrap();
        instance
            .start_scan(ScanRequest::new("/media/disc", 5).with_title(2))
            .unwrap();
        assert_eq!(instance.preview_count(), 5);
        assert_eq!(
            instance.current_session().map(|s| s.kind),
            Some(SessionKind::Scan)
        );
        instance.dispose();
        assert!(instance.current_session().is_none());
    }

    #[tokio::test]
    async fn test_failed_scan_call_resets_phase() {
        let mut engine = mock();
        engine
            .expect_scan()
            .times(2)
            .returning(|_, _, _, _| Err(EngineError::call_failed("scan", "no source")));

        let instance = TranscodeInstance::new(engine, &fast_config()).unwrap();
        assert!(instance.start_scan(ScanRequest::new("/x", 1)).is_err());
        let err = instance.start_scan(ScanRequest::new("/x", 1)).unwrap_err();
        assert!(matches!(err, InstanceError::Engine(EngineError::CallFailed { .. })));
    }

    #[tokio::test]
    async fn test_stop_encode_drains_queue() {
        let mut engine = mock();
        engine.expect_stop().times(1).return_const(());
        engine.expect_job_count().times(1).return_const(3usize);
        engine.expect_remove_first_job().times(3).return_const(());
        engine.expect_pause().times(1).return_const(());
        engine.expect_resume().times(1).return_const(());
        engine.expect_stop_scan().times(1).return_const(());

        let instance = TranscodeInstance::new(engine, &fast_config()).unwrap();
        instance.pause_encode().unwrap();
        instance.resume_encode().unwrap();
        instance.stop_scan().unwrap();
        instance.stop_encode().unwrap();
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent() {
        let instance = TranscodeInstance::new(mock(), &fast_config()).unwrap();
        instance.dispose();
        instance.dispose();
        assert!(instance.is_disposed());
        assert!(matches!(instance.version(), Err(InstanceError::Disposed)));
        assert!(matches!(
            instance.start_scan(ScanRequest::new("/x", 1)),
            Err(InstanceError::Disposed)
        ));
        drop(instance);
    }

    #[tokio::test]
    async fn test_scan_publishes_snapshot_and_single_completion() {
        let engine = Arc::new(
            ScriptedEngine::new()
                .with_states([
                    ScriptedEngine::scanning_state(0.2, 1, 2),
                    ScriptedEngine::scanning_state(0.7, 2, 2),
                    ScriptedEngine::scan_done_state(),
                ])
                .with_title_set(ScriptedEngine::title_set_json(&[(1, false), (2, true), (3, true)])),
        );
        let instance = TranscodeInstance::new(Arc::clone(&engine), &fast_config()).unwrap();
        let mut rx = instance.subscribe();

        instance.start_scan(ScanRequest::new("/media/disc", 10)).unwrap();
        assert!(matches!(
            instance.start_scan(ScanRequest::new("/media/disc", 10)),
            Err(InstanceError::AlreadyInProgress { phase: "scan" })
        ));

        let mut progress = 0;
        let completed = loop {
            match next_event(&mut rx).await {
                InstanceEvent::ScanProgress(_) => progress += 1,
                InstanceEvent::ScanCompleted {
                    title_count,
                    feature_title,
                } => break (title_count, feature_title),
                other => panic!("unexpected event {other:?}"),
            }
        };

        assert_eq!(progress, 2);
        assert_eq!(completed, (3, 2));
        assert_eq!(instance.feature_title(), 2);
        assert_eq!(instance.titles().len(), 3);

        // The loop has stopped: nothing else arrives.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
        assert!(instance.current_session().is_none());
    }

    #[tokio::test]
    async fn test_scan_decode_failure_still_completes() {
        let engine = Arc::new(
            ScriptedEngine::new()
                .with_states([ScriptedEngine::scan_done_state()])
                .with_title_set("{ not json"),
        );
        let instance = TranscodeInstance::new(Arc::clone(&engine), &fast_config()).unwrap();
        let mut rx = instance.subscribe();
        instance.start_scan(ScanRequest::new("/media/disc", 10)).unwrap();

        assert_eq!(
            next_event(&mut rx).await,
            InstanceEvent::ScanCompleted {
                title_count: 0,
                feature_title: 0
            }
        );
        assert!(instance.titles().is_empty());
        assert!(matches!(
            instance.start_encode(&job(1), EncodeOptions::default(), 10),
            Err(InstanceError::NoScanResult)
        ));
    }

    #[tokio::test]
    async fn test_encode_progress_then_single_completion() {
        let engine = Arc::new(
            ScriptedEngine::new()
                .with_states([ScriptedEngine::scan_done_state()])
                .with_title_set(ScriptedEngine::title_set_json(&[(1, true)])),
        );
        let instance = TranscodeInstance::new(Arc::clone(&engine), &fast_config()).unwrap();
        scan(&instance).await;

        engine.push_states([
            ScriptedEngine::working_state(0.1, 1, 2),
            ScriptedEngine::state("PAUSED"),
            ScriptedEngine::working_state(0.5, 1, 2),
            ScriptedEngine::state("MUXING"),
            ScriptedEngine::working_state(0.9, 2, 2),
            ScriptedEngine::work_done_state(0),
        ]);

        let mut rx = instance.subscribe();
        instance
            .start_encode(&job(1), EncodeOptions::default(), 10)
            .unwrap();

        let mut progress = Vec::new();
        let completion = loop {
            match next_event(&mut rx).await {
                InstanceEvent::EncodeProgress(p) => progress.push(p.fraction_complete),
                InstanceEvent::EncodeCompleted { error, error_code } => break (error, error_code),
                other => panic!("unexpected event {other:?}"),
            }
        };

        assert_eq!(progress, vec![0.1, 0.5, 0.9]);
        assert_eq!(completion, (false, EngineErrorCode::None));
        assert_eq!(engine.submitted_jobs().len(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_canceled_encode_reports_error() {
        let engine = Arc::new(
            ScriptedEngine::new()
                .with_states([ScriptedEngine::scan_done_state()])
                .with_title_set(ScriptedEngine::title_set_json(&[(1, false)])),
        );
        let instance = TranscodeInstance::new(Arc::clone(&engine), &fast_config()).unwrap();
        scan(&instance).await;

        engine.push_states([ScriptedEngine::work_done_state(1)]);
        let mut rx = instance.subscribe();
        instance
            .start_encode(&job(1), EncodeOptions::default(), 10)
            .unwrap();

        assert_eq!(
            next_event(&mut rx).await,
            InstanceEvent::EncodeCompleted {
                error: true,
                error_code: EngineErrorCode::Canceled
            }
        );
    }

    #[tokio::test]
    async fn test_missing_title_is_reported() {
        let engine = Arc::new(
            ScriptedEngine::new()
                .with_states([ScriptedEngine::scan_done_state()])
                .with_title_set(ScriptedEngine::title_set_json(&[(1, false)])),
        );
        let instance = TranscodeInstance::new(Arc::clone(&engine), &fast_config()).unwrap();
        scan(&instance).await;

        let missing = job(4);
        assert!(matches!(
            instance.calculate_bitrate(&missing, 700, 0.0),
            Err(InstanceError::TitleNotFound { title: 4 })
        ));
        assert!(matches!(
            instance.calculate_file_size(&missing, 1500),
            Err(InstanceError::TitleNotFound { title: 4 })
        ));
        assert!(matches!(
            instance.get_preview(&missing, 0),
            Err(InstanceError::TitleNotFound { title: 4 })
        ));
        assert!(matches!(
            instance.start_encode(&missing, EncodeOptions::default(), 10),
            Err(InstanceError::TitleNotFound { title: 4 })
        ));
    }

    #[tokio::test]
    async fn test_preview_buffer_matches_geometry() {
        let engine = Arc::new(
            ScriptedEngine::new()
                .with_states([ScriptedEngine::scan_done_state()])
                .with_title_set(ScriptedEngine::title_set_json(&[(1, false)])),
        );
        let instance = TranscodeInstance::new(Arc::clone(&engine), &fast_config()).unwrap();
        scan(&instance).await;

        let mut job = job(1);
        job.profile.width = 640;
        let frame = instance.get_preview(&job, 2).unwrap();
        assert_eq!(frame.geometry.width, 640);
        assert_eq!(
            frame.data.len(),
            (frame.geometry.width * frame.geometry.height * 4) as usize
        );

        // The engine gets the request, not the resolved size.
        let requests = engine.preview_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].geometry,
            Geometry {
                width: 640,
                height: 0,
                par: crate::media::title::Rational::ONE,
            }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dispose_waits_for_in_flight_poll() {
        let engine = Arc::new(
            ScriptedEngine::new()
                .with_states([ScriptedEngine::scanning_state(0.5, 1, 1)])
                .with_state_delay(Duration::from_millis(200)),
        );
        let instance =
            Arc::new(TranscodeInstance::new(Arc::clone(&engine), &fast_config()).unwrap());
        instance.start_scan(ScanRequest::new("/media/disc", 10)).unwrap();

        // Let the first poll enter the engine.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let disposing = Arc::clone(&instance);
        tokio::task::spawn_blocking(move || disposing.dispose())
            .await
            .unwrap();

        assert!(!engine.closed_during_call());
        assert_eq!(engine.close_count(), 1);
        assert!(matches!(instance.version(), Err(InstanceError::Disposed)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_engine_does_not_stall_runtime() {
        let engine = Arc::new(
            ScriptedEngine::new()
                .with_states([ScriptedEngine::scanning_state(0.5, 1, 1)])
                .with_state_delay(Duration::from_millis(300)),
        );
        let instance =
            Arc::new(TranscodeInstance::new(Arc::clone(&engine), &fast_config()).unwrap());
        instance.start_scan(ScanRequest::new("/media/disc", 10)).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut ticks = Vec::new();
        for _ in 0..4 {
            let started = std::time::Instant::now();
            tokio::time::sleep(Duration::from_millis(20)).await;
            ticks.push(started.elapsed());
        }
        assert!(
            ticks.iter().all(|t| *t < Duration::from_millis(200)),
            "timer ticks stalled: {ticks:?}"
        );

        let disposing = Arc::clone(&instance);
        tokio::task::spawn_blocking(move || disposing.dispose())
            .await
            .unwrap();
        assert_eq!(engine.close_count(), 1);
    }
}
