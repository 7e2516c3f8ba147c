//! Recording session management
//!
//! [`RecorderController`] owns the microphone lifecycle: permission, start,
//! stop, cancel and the auto-stop ceiling. At most one session is open at a
//! time; a second start is refused, never queued.
//!
//! # State handling
//! The controller state sits behind a `std::sync::Mutex` that is never held
//! across an await. Stop, auto-stop and cancel all begin by taking the
//! active session out of the state, so exactly one of them finalizes or
//! discards it. Every start bumps a generation counter and so does cancel;
//! a stale generation tells an in-flight start or stop that it lost.

mod session;

pub use session::{RecorderEvent, RecordingSession, RecordingStatus, StopReason};

use crate::audio::{select_format, AudioFormat, CaptureStream, Microphone};
use crate::config::RecordingConfig;
use crate::error::VoiceError;
use chrono::{DateTime, Local, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

/// Recorder limits and output location
#[derive(Debug, Clone)]
pub struct RecorderSettings {
    /// Auto-stop ceiling
    pub max_duration: Duration,
    /// Elapsed-time tick
    pub tick_interval: Duration,
    /// Where finalized recordings are written
    pub recordings_dir: PathBuf,
}

impl From<&RecordingConfig> for RecorderSettings {
    fn from(config: &RecordingConfig) -> Self {
        Self {
            max_duration: config.max_duration(),
            tick_interval: config.tick_interval(),
            recordings_dir: config.recordings_dir(),
        }
    }
}

/// Single-session microphone recorder
#[derive(Clone)]
pub struct RecorderController {
    shared: Arc<Shared>,
}

struct Shared {
    microphone: Arc<dyn Microphone>,
    settings: RecorderSettings,
    state: Mutex<State>,
    events: broadcast::Sender<RecorderEvent>,
}

#[derive(Default)]
struct State {
    status: RecordingStatus,
    generation: u64,
    ticks: u64,
    active: Option<ActiveSession>,
}

struct ActiveSession {
    id: u64,
    capture: Box<dyn CaptureStream>,
    format: AudioFormat,
    started_at: DateTime<Utc>,
    started: Instant,
    ticker: Option<JoinHandle<()>>,
}

impl RecorderController {
    pub fn new(microphone: Arc<dyn Microphone>, settings: RecorderSettings) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            shared: Arc::new(Shared {
                microphone,
                settings,
                state: Mutex::new(State::default()),
                events,
            }),
        }
    }

    /// Subscribe to status changes, ticks and auto-stops
    pub fn subscribe(&self) -> broadcast::Receiver<RecorderEvent> {
        self.shared.events.subscribe()
    }

    pub fn status(&self) -> RecordingStatus {
        self.shared.lock().status
    }

    /// Seconds counted so far in the current (or last) session
    pub fn elapsed_seconds(&self) -> u64 {
        let state = self.shared.lock();
        self.shared.elapsed(state.ticks).as_secs()
    }

    pub fn settings(&self) -> &RecorderSettings {
        &self.shared.settings
    }

    /// Acquire the microphone and begin a new session
    ///
    /// Fails fast if a session is already open, with `PermissionDenied` if
    /// access is refused, and with `RecordingFailed` if the capture cannot
    /// start or the session is cancelled while starting.
    pub async fn start_recording(&self) -> Result<(), VoiceError> {
        let id = {
            let mut state = self.shared.lock();
            if state.status.is_busy() {
                warn!(status = %state.status, "Refusing to start a second recording");
                return Err(VoiceError::recording("a recording is already in progress"));
            }
            if state.status != RecordingStatus::Idle {
                self.shared.transition(&mut state, RecordingStatus::Idle);
            }
            state.generation += 1;
            state.ticks = 0;
            self.shared
                .transition(&mut state, RecordingStatus::RequestingPermission);
            state.generation
        };

        let granted = match self.shared.microphone.request_permission().await {
            Ok(granted) => granted,
            Err(e) => {
                self.shared.fail(id);
                return Err(e.into());
            }
        };
        if !granted {
            info!("Microphone permission denied");
            self.shared.fail(id);
            return Err(VoiceError::PermissionDenied);
        }
        if !self.shared.is_current(id, RecordingStatus::RequestingPermission) {
            return Err(VoiceError::recording("recording cancelled"));
        }

        let format = select_format(&self.shared.microphone.supported_mime_types());
        let capture = match self.shared.microphone.start(format).await {
            Ok(capture) => capture,
            Err(e) => {
                self.shared.fail(id);
                return Err(e.into());
            }
        };

        let rejected = {
            let mut state = self.shared.lock();
            if state.generation != id || state.status != RecordingStatus::RequestingPermission {
                Some(capture)
            } else {
                let ticker = tokio::spawn(run_ticker(
                    Arc::downgrade(&self.shared),
                    id,
                    self.shared.settings.tick_interval,
                ));
                state.active = Some(ActiveSession {
                    id,
                    capture,
                    format,
                    started_at: Utc::now(),
                    started: Instant::now(),
                    ticker: Some(ticker),
                });
                self.shared.transition(&mut state, RecordingStatus::Recording);
                None
            }
        };

        if let Some(capture) = rejected {
            // Cancelled while the microphone was being acquired
            capture.discard().await;
            return Err(VoiceError::recording("recording cancelled"));
        }

        info!(
            session_id = id,
            mime_type = format.mime_type,
            max_duration_secs = self.shared.settings.max_duration.as_secs(),
            "Recording started"
        );
        Ok(())
    }

    /// Stop the active recording and hand over the finalized session
    ///
    /// Returns `Ok(None)` when nothing is recording (or the session was
    /// cancelled while stopping). On success the status is `Processing`.
    pub async fn stop_recording(&self) -> Result<Option<RecordingSession>, VoiceError> {
        self.shared.stop_active(StopReason::Manual).await
    }

    /// Release the microphone, discard captured audio and return to `Idle`
    ///
    /// Safe from every state.
    pub async fn cancel_recording(&self) {
        let (previous, active) = {
            let mut state = self.shared.lock();
            let previous = state.status;
            state.generation += 1;
            state.ticks = 0;
            let active = state.active.take();
            self.shared.transition(&mut state, RecordingStatus::Idle);
            (previous, active)
        };

        if let Some(active) = active {
            if let Some(ticker) = active.ticker {
                ticker.abort();
            }
            active.capture.discard().await;
        }
        info!(previous = %previous, "Recording cancelled");
    }

    /// Whether session `id` was handed over and is still being processed
    pub fn is_processing(&self, id: u64) -> bool {
        self.shared.is_current(id, RecordingStatus::Processing)
    }

    /// Report that processing of session `id` finished
    pub fn mark_completed(&self, id: u64) {
        self.shared.finish_processing(id, RecordingStatus::Completed);
    }

    /// Report that processing of session `id` failed
    pub fn mark_failed(&self, id: u64) {
        self.shared.finish_processing(id, RecordingStatus::Error);
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => {
                warn!("Recorder state mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn transition(&self, state: &mut State, status: RecordingStatus) {
        if state.status == status {
            return;
        }
        state.status = status;
        // No subscribers is fine
        let _ = self.events.send(RecorderEvent::StatusChanged(status));
    }

    fn is_current(&self, id: u64, status: RecordingStatus) -> bool {
        let state = self.lock();
        state.generation == id && state.status == status
    }

    fn elapsed(&self, ticks: u64) -> Duration {
        self.settings.tick_interval * ticks.min(u32::MAX as u64) as u32
    }

    fn fail(&self, id: u64) {
        let mut state = self.lock();
        if state.generation == id {
            self.transition(&mut state, RecordingStatus::Error);
        }
    }

    fn finish_processing(&self, id: u64, outcome: RecordingStatus) {
        let mut state = self.lock();
        if state.generation == id && state.status == RecordingStatus::Processing {
            self.transition(&mut state, outcome);
        }
    }

    async fn stop_active(
        &self,
        reason: StopReason,
    ) -> Result<Option<RecordingSession>, VoiceError> {
        let (active, ticks) = {
            let mut state = self.lock();
            if state.status != RecordingStatus::Recording {
                return Ok(None);
            }
            let Some(active) = state.active.take() else {
                return Ok(None);
            };
            self.transition(&mut state, RecordingStatus::Stopping);
            (active, state.ticks)
        };

        let ActiveSession {
            id,
            capture,
            format,
            started_at,
            started,
            ticker,
        } = active;

        // The ticker drives auto-stop itself and must not be aborted mid-stop
        if let Some(ticker) = ticker {
            if reason == StopReason::Manual {
                ticker.abort();
            }
        }

        let duration = started.elapsed();
        let elapsed_seconds = self.elapsed(ticks).as_secs();

        let bytes = match capture.finish().await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.fail(id);
                return Err(e.into());
            }
        };
        if bytes.is_empty() {
            self.fail(id);
            return Err(VoiceError::recording("no audio was captured"));
        }

        let audio_path = match write_recording(&self.settings.recordings_dir, id, format, &bytes).await
        {
            Ok(path) => path,
            Err(e) => {
                self.fail(id);
                return Err(VoiceError::RecordingFailed {
                    message: "failed to save recording".to_string(),
                    source: Some(Box::new(e)),
                });
            }
        };

        let handed_over = {
            let mut state = self.lock();
            if state.generation == id && state.status == RecordingStatus::Stopping {
                self.transition(&mut state, RecordingStatus::Processing);
                true
            } else {
                false
            }
        };

        if !handed_over {
            info!(session_id = id, "Recording cancelled while stopping");
            remove_recording(&audio_path).await;
            return Ok(None);
        }

        info!(
            session_id = id,
            reason = ?reason,
            elapsed_seconds = elapsed_seconds,
            bytes = bytes.len(),
            path = %audio_path.display(),
            "Recording stopped"
        );

        Ok(Some(RecordingSession {
            id,
            audio_path,
            format,
            started_at,
            elapsed_seconds,
            duration,
            stop_reason: reason,
        }))
    }
}

/// Count elapsed ticks for session `id` and stop it at the ceiling
///
/// Holds only a weak reference so a dropped controller ends the task.
async fn run_ticker(shared: Weak<Shared>, id: u64, tick_interval: Duration) {
    let mut interval = tokio::time::interval_at(Instant::now() + tick_interval, tick_interval);

    loop {
        interval.tick().await;
        let Some(shared) = shared.upgrade() else {
            return;
        };

        let reached_ceiling = {
            let mut state = shared.lock();
            if state.generation != id || state.status != RecordingStatus::Recording {
                return;
            }
            state.ticks += 1;
            let elapsed = shared.elapsed(state.ticks);
            let remaining = shared.settings.max_duration.saturating_sub(elapsed);
            let _ = shared.events.send(RecorderEvent::Tick {
                elapsed_seconds: elapsed.as_secs(),
                remaining_seconds: remaining.as_secs(),
            });
            elapsed >= shared.settings.max_duration
        };

        if reached_ceiling {
            info!(
                session_id = id,
                max_duration_secs = shared.settings.max_duration.as_secs(),
                "Recording reached maximum duration, stopping"
            );
            match shared.stop_active(StopReason::AutoStop).await {
                Ok(Some(session)) => {
                    let _ = shared.events.send(RecorderEvent::AutoStopped(session));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Auto-stop failed: {}", e);
                    let _ = shared.events.send(RecorderEvent::AutoStopFailed {
                        message: e.to_string(),
                    });
                }
            }
            return;
        }
    }
}

/// Write finalized audio to a timestamped file
async fn write_recording(
    dir: &Path,
    id: u64,
    format: AudioFormat,
    bytes: &[u8],
) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let timestamp = Local::now().format("%Y-%m-%d-%H-%M-%S");
    let path = dir.join(format!("recording-{}-{}.{}", timestamp, id, format.extension));
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

/// Delete a recording, logging (never returning) failures
pub(crate) async fn remove_recording(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => info!(path = %path.display(), "Deleted recording"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), "Failed to delete recording: {}", e),
    }
}
