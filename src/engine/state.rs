//! Engine state polling document.

use serde::Deserialize;
use tracing::debug;

use crate::error::EngineError;

/// Error code reported when the engine finishes work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorCode {
    None,
    Canceled,
    WrongInput,
    Init,
    Unknown,
    Read,
}

impl EngineErrorCode {
    /// Maps a raw engine code. Unrecognized codes are `Unknown`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::None,
            1 => Self::Canceled,
            2 => Self::WrongInput,
            3 => Self::Init,
            5 => Self::Read,
            _ => Self::Unknown,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Canceled => 1,
            Self::WrongInput => 2,
            Self::Init => 3,
            Self::Unknown => 4,
            Self::Read => 5,
        }
    }
}

/// Scan progress fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ScanningStatus {
    pub progress: f64,
    pub preview: u32,
    pub preview_count: u32,
    pub title: u32,
    pub title_count: u32,
}

/// Encode progress fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct WorkingStatus {
    pub progress: f64,
    pub rate: f64,
    pub rate_avg: f64,
    pub hours: i32,
    pub minutes: i32,
    pub seconds: i32,
    pub pass: u32,
    pub pass_count: u32,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct WorkDoneStatus {
    error: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawState {
    state: String,
    #[serde(default)]
    scanning: Option<ScanningStatus>,
    #[serde(default)]
    working: Option<WorkingStatus>,
    #[serde(default)]
    work_done: Option<WorkDoneStatus>,
}

/// A decoded engine state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineState {
    Idle,
    Scanning(ScanningStatus),
    ScanDone,
    Working(WorkingStatus),
    Paused,
    Muxing,
    WorkDone(EngineErrorCode),
}

/// Decodes the engine's state JSON. Unknown state names decode as `Idle`.
pub fn decode_state(raw: &[u8]) -> Result<EngineState, EngineError> {
    let text = String::from_utf8_lossy(raw);
    let raw: RawState =
        serde_json::from_str(text.trim_end_matches('\0')).map_err(EngineError::StateDecode)?;

    let state = match raw.state.as_str() {
        "IDLE" => EngineState::Idle,
        "SCANNING" => EngineState::Scanning(raw.scanning.unwrap_or_default()),
        "SCANDONE" => EngineState::ScanDone,
        "WORKING" => EngineState::Working(raw.working.unwrap_or_default()),
        "PAUSED" => EngineState::Paused,
        "MUXING" => EngineState::Muxing,
        "WORKDONE" => EngineState::WorkDone(EngineErrorCode::from_code(
            raw.work_done.unwrap_or_default().error,
        )),
        other => {
            debug!(state = other, "Unknown engine state, treating as idle");
            EngineState::Idle
        }
    };

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_scanning() {
        let state = decode_state(
            br#"{"State":"SCANNING","Scanning":{"Progress":0.5,"Preview":3,"PreviewCount":10,"Title":2,"TitleCount":4}}"#,
        )
        .unwrap();
        let EngineState::Scanning(s) = state else {
            panic!("expected scanning, got {state:?}");
        };
        assert_eq!(s.progress, 0.5);
        assert_eq!(s.title, 2);
        assert_eq!(s.title_count, 4);
    }

    #[test]
    fn test_decode_working() {
        let state = decode_state(
            br#"{"State":"WORKING","Working":{"Progress":0.25,"Rate":30.5,"RateAvg":29.0,"Hours":0,"Minutes":12,"Seconds":3,"Pass":1,"PassCount":2}}"#,
        )
        .unwrap();
        let EngineState::Working(w) = state else {
            panic!("expected working, got {state:?}");
        };
        assert_eq!(w.minutes, 12);
        assert_eq!(w.pass_count, 2);
    }

    #[test]
    fn test_decode_work_done_codes() {
        let done = |code: i32| {
            decode_state(format!(r#"{{"State":"WORKDONE","WorkDone":{{"Error":{code}}}}}"#).as_bytes())
                .unwrap()
        };
        assert_eq!(done(0), EngineState::WorkDone(EngineErrorCode::None));
        assert_eq!(done(1), EngineState::WorkDone(EngineErrorCode::Canceled));
        assert_eq!(done(5), EngineState::WorkDone(EngineErrorCode::Read));
        assert_eq!(done(42), EngineState::WorkDone(EngineErrorCode::Unknown));
    }

    #[test]
    fn test_unknown_state_is_idle() {
        assert_eq!(
            decode_state(b"{\"State\":\"SEARCHING\"}\0\0").unwrap(),
            EngineState::Idle
        );
        assert_eq!(decode_state(br#"{"State":"PAUSED"}"#).unwrap(), EngineState::Paused);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            decode_state(b"{"),
            Err(EngineError::StateDecode(_))
        ));
    }
}
