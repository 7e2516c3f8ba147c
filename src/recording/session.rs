//! Recording session state

use crate::audio::AudioFormat;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Lifecycle of the recorder
///
/// `Idle → RequestingPermission → Recording → Stopping → Processing →
/// Completed | Error`; cancelling from any state returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingStatus {
    #[default]
    Idle,
    RequestingPermission,
    Recording,
    Stopping,
    Processing,
    Completed,
    Error,
}

impl RecordingStatus {
    /// Whether a session is open (a new start must be refused)
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            RecordingStatus::RequestingPermission
                | RecordingStatus::Recording
                | RecordingStatus::Stopping
                | RecordingStatus::Processing
        )
    }
}

impl fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordingStatus::Idle => "idle",
            RecordingStatus::RequestingPermission => "requesting-permission",
            RecordingStatus::Recording => "recording",
            RecordingStatus::Stopping => "stopping",
            RecordingStatus::Processing => "processing",
            RecordingStatus::Completed => "completed",
            RecordingStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// Why a recording ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Manual,
    /// The duration ceiling was reached
    AutoStop,
}

/// A finalized capture, handed to the caller for processing
#[derive(Debug, Clone)]
pub struct RecordingSession {
    /// Session number, used to report the processing outcome back
    pub id: u64,
    /// Finalized audio on disk
    pub audio_path: PathBuf,
    pub format: AudioFormat,
    pub started_at: DateTime<Utc>,
    /// Whole seconds counted by the tick timer
    pub elapsed_seconds: u64,
    /// Wall-clock length of the capture
    pub duration: Duration,
    pub stop_reason: StopReason,
}

/// Events published by the recorder
#[derive(Debug, Clone)]
pub enum RecorderEvent {
    StatusChanged(RecordingStatus),
    Tick {
        elapsed_seconds: u64,
        remaining_seconds: u64,
    },
    /// The ceiling was reached and the session was stopped on its own
    AutoStopped(RecordingSession),
    AutoStopFailed { message: String },
}
