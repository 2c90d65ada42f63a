//! Scripted engine for exercising the lifecycle without a native library.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::json;

use crate::engine::NativeEngine;
use crate::error::EngineError;
use crate::media::geometry::GeometrySettings;

/// A recorded scan request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedScan {
    pub path: PathBuf,
    pub title_index: u32,
    pub preview_count: u32,
    pub min_duration_ticks: u64,
}

#[derive(Debug, Default)]
struct Script {
    states: VecDeque<String>,
    last_state: Option<String>,
    title_set: String,
    scans: Vec<RecordedScan>,
    jobs: Vec<String>,
    previews: Vec<GeometrySettings>,
    queued: usize,
    close_count: usize,
    paused: bool,
    state_delay: Duration,
    in_flight: bool,
    closed_in_flight: bool,
}

/// [`NativeEngine`] that replays a queue of state documents.
///
/// Each state poll pops the next queued state. Once the queue is empty the
/// last state is repeated, or `IDLE` if nothing was ever queued.
///
/// # Example
///
/// ```rust,ignore
/// let engine = Arc::new(
///     ScriptedEngine::new()
///         .with_states([ScriptedEngine::scanning_state(0.5, 1, 1), ScriptedEngine::scan_done_state()])
///         .with_title_set(ScriptedEngine::title_set_json(&[(1, true)])),
/// );
/// let instance = TranscodeInstance::new(Arc::clone(&engine), &EngineConfig::default())?;
/// ```
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    script: Mutex<Script>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues states to replay.
    pub fn with_states<I, S>(self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_states(states);
        self
    }

    /// Sets the title-set document returned after a scan.
    pub fn with_title_set(self, json: impl Into<String>) -> Self {
        self.lock().title_set = json.into();
        self
    }

    /// Makes every state poll block the calling thread for `delay`.
    pub fn with_state_delay(self, delay: Duration) -> Self {
        self.lock().state_delay = delay;
        self
    }

    /// Queues more states on a running engine.
    pub fn push_states<I, S>(&self, states: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().states.extend(states.into_iter().map(Into::into));
    }

    pub fn scans(&self) -> Vec<RecordedScan> {
        self.lock().scans.clone()
    }

    /// Job documents submitted with `add_job`.
    pub fn submitted_jobs(&self) -> Vec<String> {
        self.lock().jobs.clone()
    }

    /// Picture settings passed to `get_preview`.
    pub fn preview_requests(&self) -> Vec<GeometrySettings> {
        self.lock().previews.clone()
    }

    pub fn close_count(&self) -> usize {
        self.lock().close_count
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    /// Whether `close` ran while a state poll was still inside the engine.
    pub fn closed_during_call(&self) -> bool {
        self.lock().closed_in_flight
    }

    /// A bare state document.
    pub fn state(name: &str) -> String {
        json!({ "State": name }).to_string()
    }

    pub fn scanning_state(progress: f64, title: u32, title_count: u32) -> String {
        json!({
            "State": "SCANNING",
            "Scanning": {
                "Progress": progress,
                "Preview": 0,
                "PreviewCount": 10,
                "Title": title,
                "TitleCount": title_count,
            }
        })
        .to_string()
    }

    pub fn scan_done_state() -> String {
        Self::state("SCANDONE")
    }

    pub fn working_state(progress: f64, pass: u32, pass_count: u32) -> String {
        json!({
            "State": "WORKING",
            "Working": {
                "Progress": progress,
                "Rate": 48.0,
                "RateAvg": 45.5,
                "Hours": 0,
                "Minutes": 3,
                "Seconds": 20,
                "Pass": pass,
                "PassCount": pass_count,
            }
        })
        .to_string()
    }

    pub fn work_done_state(error: i32) -> String {
        json!({ "State": "WORKDONE", "WorkDone": { "Error": error } }).to_string()
    }

    /// A title set of 1920x1080 25 fps titles, each 30 minutes long with three
    /// chapters and two AC3 tracks. `titles` lists (index, is main feature).
    pub fn title_set_json(titles: &[(u32, bool)]) -> String {
        let main_feature = titles
            .iter()
            .find(|(_, main)| *main)
            .map(|(index, _)| i64::from(*index))
            .unwrap_or(-1);

        let list: Vec<_> = titles
            .iter()
            .map(|(index, _)| {
                json!({
                    "Index": index,
                    "Path": "/media/disc",
                    "Name": format!("Title {index}"),
                    "AngleCount": 1,
                    "Duration": { "Hours": 0, "Minutes": 30, "Seconds": 0 },
                    "FrameRate": { "Num": 25, "Den": 1 },
                    "Geometry": { "Width": 1920, "Height": 1080, "PAR": { "Num": 1, "Den": 1 } },
                    "Crop": [0, 0, 0, 0],
                    "AudioList": [
                        { "Description": "English", "Language": "English", "LanguageCode": "eng",
                          "Codec": "ac3", "SampleRate": 48000, "BitRate": 448000, "ChannelLayout": 1551 },
                        { "Description": "Commentary", "Language": "English", "LanguageCode": "eng",
                          "Codec": "ac3", "SampleRate": 48000, "BitRate": 192000, "ChannelLayout": 3 }
                    ],
                    "SubtitleList": [],
                    "ChapterList": [
                        { "Name": "Opening", "Duration": { "Hours": 0, "Minutes": 10, "Seconds": 0 } },
                        { "Name": "Middle", "Duration": { "Hours": 0, "Minutes": 10, "Seconds": 0 } },
                        { "Name": "Credits", "Duration": { "Hours": 0, "Minutes": 10, "Seconds": 0 } }
                    ]
                })
            })
            .collect();

        json!({ "MainFeature": main_feature, "TitleList": list }).to_string()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl NativeEngine for ScriptedEngine {
    fn initialize(&self, _verbosity: u32) -> Result<(), EngineError> {
        Ok(())
    }

    fn scan(
        &self,
        path: &Path,
        title_index: u32,
        preview_count: u32,
        min_duration_ticks: u64,
    ) -> Result<(), EngineError> {
        self.lock().scans.push(RecordedScan {
            path: path.to_path_buf(),
            title_index,
            preview_count,
            min_duration_ticks,
        });
        Ok(())
    }

    fn stop_scan(&self) {}

    fn get_state_json(&self) -> Result<Vec<u8>, EngineError> {
        let delay = {
            let mut script = self.lock();
            script.in_flight = true;
            script.state_delay
        };
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let mut script = self.lock();
        script.in_flight = false;
        if let Some(next) = script.states.pop_front() {
            script.last_state = Some(next);
        }
        let state = script
            .last_state
            .clone()
            .unwrap_or_else(|| Self::state("IDLE"));
        Ok(state.into_bytes())
    }

    fn get_title_set_json(&self) -> Result<Vec<u8>, EngineError> {
        Ok(self.lock().title_set.clone().into_bytes())
    }

    fn add_job(&self, job_json: &str) -> Result<(), EngineError> {
        let mut script = self.lock();
        script.jobs.push(job_json.to_string());
        script.queued += 1;
        Ok(())
    }

    fn start(&self) -> Result<(), EngineError> {
        Ok(())
    }

    fn pause(&self) {
        self.lock().paused = true;
    }

    fn resume(&self) {
        self.lock().paused = false;
    }

    fn stop(&self) {}

    fn job_count(&self) -> usize {
        self.lock().queued
    }

    fn remove_first_job(&self) {
        let mut script = self.lock();
        script.queued = script.queued.saturating_sub(1);
    }

    fn get_preview(
        &self,
        _title: u32,
        _preview: u32,
        settings: &GeometrySettings,
        buffer: &mut [u8],
    ) -> Result<(), EngineError> {
        self.lock().previews.push(settings.clone());
        buffer.fill(0x80);
        Ok(())
    }

    fn version(&self) -> String {
        "scripted".to_string()
    }

    fn build(&self) -> i32 {
        0
    }

    fn close(&self) {
        let mut script = self.lock();
        script.close_count += 1;
        if script.in_flight {
            script.closed_in_flight = true;
        }
    }
}
