//! Native engine boundary and the scan/encode lifecycle built on it.

pub mod events;
pub mod handle;
pub mod instance;
pub mod state;

use std::path::Path;
use std::sync::Arc;

use crate::error::EngineError;
use crate::media::geometry::GeometrySettings;

pub use events::{EncodeProgress, InstanceEvent, ScanProgress, SessionInfo, SessionKind};
pub use handle::{EngineGuard, EngineHandle};
pub use instance::{PreviewFrame, ScanRequest, TranscodeInstance};
pub use state::{EngineErrorCode, EngineState};

/// Calls exposed by the native transcoding engine.
///
/// Every call is synchronous. Status is only available by polling
/// [`get_state_json`](NativeEngine::get_state_json).
#[cfg_attr(test, mockall::automock)]
pub trait NativeEngine: Send + Sync {
    /// Initializes the engine with a log verbosity.
    fn initialize(&self, verbosity: u32) -> Result<(), EngineError>;

    /// Begins scanning `path`. A `title_index` of 0 scans every title.
    fn scan(
        &self,
        path: &Path,
        title_index: u32,
        preview_count: u32,
        min_duration_ticks: u64,
    ) -> Result<(), EngineError>;

    fn stop_scan(&self);

    /// Current engine state as JSON bytes.
    fn get_state_json(&self) -> Result<Vec<u8>, EngineError>;

    /// Title set of the last scan as JSON bytes.
    fn get_title_set_json(&self) -> Result<Vec<u8>, EngineError>;

    /// Queues a JSON job document.
    fn add_job(&self, job_json: &str) -> Result<(), EngineError>;

    /// Starts processing queued jobs.
    fn start(&self) -> Result<(), EngineError>;

    fn pause(&self);

    fn resume(&self);

    fn stop(&self);

    /// Number of jobs still queued.
    fn job_count(&self) -> usize;

    fn remove_first_job(&self);

    /// Renders a scan preview into a BGRA `buffer`.
    fn get_preview(
        &self,
        title: u32,
        preview: u32,
        settings: &GeometrySettings,
        buffer: &mut [u8],
    ) -> Result<(), EngineError>;

    fn version(&self) -> String;

    fn build(&self) -> i32;

    /// Releases the native handle.
    fn close(&self);
}

impl<T: NativeEngine + ?Sized> NativeEngine for Arc<T> {
    fn initialize(&self, verbosity: u32) -> Result<(), EngineError> {
        (**self).initialize(verbosity)
    }

    fn scan(
        &self,
        path: &Path,
        title_index: u32,
        preview_count: u32,
        min_duration_ticks: u64,
    ) -> Result<(), EngineError> {
        (**self).scan(path, title_index, preview_count, min_duration_ticks)
    }

    fn stop_scan(&self) {
        (**self).stop_scan()
    }

    fn get_state_json(&self) -> Result<Vec<u8>, EngineError> {
        (**self).get_state_json()
    }

    fn get_title_set_json(&self) -> Result<Vec<u8>, EngineError> {
        (**self).get_title_set_json()
    }

    fn add_job(&self, job_json: &str) -> Result<(), EngineError> {
        (**self).add_job(job_json)
    }

    fn start(&self) -> Result<(), EngineError> {
        (**self).start()
    }

    fn pause(&self) {
        (**self).pause()
    }

    fn resume(&self) {
        (**self).resume()
    }

    fn stop(&self) {
        (**self).stop()
    }

    fn job_count(&self) -> usize {
        (**self).job_count()
    }

    fn remove_first_job(&self) {
        (**self).remove_first_job()
    }

    fn get_preview(
        &self,
        title: u32,
        preview: u32,
        settings: &GeometrySettings,
        buffer: &mut [u8],
    ) -> Result<(), EngineError> {
        (**self).get_preview(title, preview, settings, buffer)
    }

    fn version(&self) -> String {
        (**self).version()
    }

    fn build(&self) -> i32 {
        (**self).build()
    }

    fn close(&self) {
        (**self).close()
    }
}
