//! Headless model of the modal recording overlay
//!
//! One primary control drives the whole flow: tap to start, tap again to
//! stop and process. Close cancels from anywhere, retry clears an error.
//! Rendering is left to the front end; this type only tracks state.

use crate::chat::ChatTurn;
use crate::error::{ErrorKind, VoiceError};
use crate::pipeline::VoicePipeline;
use crate::recording::{remove_recording, RecorderEvent, RecordingSession, RecordingStatus};
use tracing::{debug, info};

/// What the overlay shows
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayState {
    Idle,
    Recording {
        elapsed_seconds: u64,
        remaining_seconds: u64,
    },
    Processing,
    Reply(ChatTurn),
    Failed {
        kind: ErrorKind,
        message: String,
    },
}

/// Overlay state machine on top of a [`VoicePipeline`]
pub struct RecordingOverlay {
    pipeline: VoicePipeline,
    state: OverlayState,
    /// Language used for error messages; follows the last reply
    language: String,
}

impl RecordingOverlay {
    pub fn new(pipeline: VoicePipeline) -> Self {
        Self {
            pipeline,
            state: OverlayState::Idle,
            language: "en".to_string(),
        }
    }

    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    pub fn pipeline(&self) -> &VoicePipeline {
        &self.pipeline
    }

    /// Language error messages are shown in
    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn set_language(&mut self, code: impl Into<String>) {
        self.language = code.into();
    }

    /// Primary control
    ///
    /// Starts recording from `Idle` or after a reply, stops and processes
    /// while recording, and is ignored while processing or showing an error.
    pub async fn tap(&mut self) {
        match self.state {
            OverlayState::Idle | OverlayState::Reply(_) => self.start().await,
            OverlayState::Recording { .. } => self.stop().await,
            OverlayState::Processing | OverlayState::Failed { .. } => {
                debug!(state = ?self.state, "Ignoring tap");
            }
        }
    }

    /// Cancel whatever is in progress and return to `Idle`
    pub async fn close(&mut self) {
        self.pipeline.recorder().cancel_recording().await;
        self.state = OverlayState::Idle;
    }

    /// Clear an error so the user can try again
    pub fn retry(&mut self) {
        if let OverlayState::Failed { kind, .. } = self.state {
            info!(kind = %kind, "Retrying after error");
            self.state = OverlayState::Idle;
        }
    }

    /// Process a session the recorder stopped at its ceiling
    ///
    /// A session the overlay no longer waits for (closed, or superseded by
    /// a newer recording) is discarded along with its audio.
    pub async fn handle_auto_stop(&mut self, session: RecordingSession) {
        let waiting = matches!(
            self.state,
            OverlayState::Recording { .. } | OverlayState::Processing
        );
        if !waiting || !self.pipeline.recorder().is_processing(session.id) {
            info!(session_id = session.id, "Discarding auto-stopped recording");
            remove_recording(&session.audio_path).await;
            return;
        }
        info!(session_id = session.id, "Recording reached the time limit");
        self.process(session).await;
    }

    /// Apply a recorder event; returns true when the state changed
    pub async fn handle_event(&mut self, event: RecorderEvent) -> bool {
        match event {
            RecorderEvent::Tick {
                elapsed_seconds,
                remaining_seconds,
            } => {
                if let OverlayState::Recording { .. } = self.state {
                    self.state = OverlayState::Recording {
                        elapsed_seconds,
                        remaining_seconds,
                    };
                    return true;
                }
                false
            }
            RecorderEvent::AutoStopped(session) => {
                let before = self.state.clone();
                self.handle_auto_stop(session).await;
                self.state != before
            }
            RecorderEvent::AutoStopFailed { message } => match self.state {
                OverlayState::Recording { .. } | OverlayState::Processing => {
                    self.fail(&VoiceError::recording(message));
                    true
                }
                _ => false,
            },
            RecorderEvent::StatusChanged(_) => false,
        }
    }

    async fn start(&mut self) {
        match self.pipeline.recorder().start_recording().await {
            Ok(()) => {
                let max = self.pipeline.recorder().settings().max_duration.as_secs();
                self.state = OverlayState::Recording {
                    elapsed_seconds: 0,
                    remaining_seconds: max,
                };
            }
            Err(e) => self.fail(&e),
        }
    }

    async fn stop(&mut self) {
        match self.pipeline.recorder().stop_recording().await {
            Ok(Some(session)) => self.process(session).await,
            Ok(None) => {
                // Auto-stop took the session; its event finishes the job
                self.state = match self.pipeline.recorder().status() {
                    RecordingStatus::Stopping | RecordingStatus::Processing => {
                        OverlayState::Processing
                    }
                    _ => OverlayState::Idle,
                };
            }
            Err(e) => self.fail(&e),
        }
    }

    async fn process(&mut self, session: RecordingSession) {
        self.state = OverlayState::Processing;
        match self.pipeline.process(session).await {
            Ok(turn) => {
                self.language = turn.language.clone();
                self.state = OverlayState::Reply(turn);
            }
            Err(e) => self.fail(&e),
        }
    }

    fn fail(&mut self, error: &VoiceError) {
        let kind = error.kind();
        self.state = OverlayState::Failed {
            kind,
            message: error_message(kind, &self.language).to_string(),
        };
    }
}

/// User-facing message for an error kind
///
/// Hindi has its own table; every other language gets English.
pub fn error_message(kind: ErrorKind, language: &str) -> &'static str {
    match language {
        "hi" => hindi_message(kind),
        _ => english_message(kind),
    }
}

fn english_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::PermissionDenied => {
            "Microphone access was denied. Please allow microphone access and try again."
        }
        ErrorKind::RecordingFailed => "Recording failed. Please try again.",
        ErrorKind::InvalidAudio => {
            "The recording could not be used. Please record a shorter message and try again."
        }
        ErrorKind::NoSpeechDetected => "We couldn't hear anything. Please speak clearly and try again.",
        ErrorKind::TranscriptionFailed => "We couldn't understand the recording. Please try again.",
        ErrorKind::ChatFailed => "The assistant couldn't answer right now. Please try again.",
        ErrorKind::NetworkError => "Network problem. Please check your connection and try again.",
        ErrorKind::ApiKeyMissing => "The voice assistant is not set up. Please contact support.",
        ErrorKind::LanguageDetectionFailed => {
            "We couldn't recognise the language. Please try again."
        }
    }
}

fn hindi_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::PermissionDenied => {
            "माइक्रोफ़ोन की अनुमति नहीं मिली। कृपया अनुमति दें और फिर से कोशिश करें।"
        }
        ErrorKind::RecordingFailed => "रिकॉर्डिंग नहीं हो सकी। कृपया फिर से कोशिश करें।",
        ErrorKind::InvalidAudio => {
            "रिकॉर्डिंग का उपयोग नहीं हो सका। कृपया छोटा संदेश रिकॉर्ड करें।"
        }
        ErrorKind::NoSpeechDetected => "कोई आवाज़ सुनाई नहीं दी। कृपया साफ़ बोलें और फिर से कोशिश करें।",
        ErrorKind::TranscriptionFailed => "रिकॉर्डिंग समझ में नहीं आई। कृपया फिर से कोशिश करें।",
        ErrorKind::ChatFailed => "सहायक अभी जवाब नहीं दे सका। कृपया फिर से कोशिश करें।",
        ErrorKind::NetworkError => "नेटवर्क में समस्या है। कृपया अपना कनेक्शन जांचें।",
        ErrorKind::ApiKeyMissing => "वॉइस सहायक सेट नहीं है। कृपया सहायता टीम से संपर्क करें।",
        ErrorKind::LanguageDetectionFailed => "भाषा पहचानी नहीं जा सकी। कृपया फिर से कोशिश करें।",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioPackager;
    use crate::chat::ResponseAssembler;
    use crate::config::{load_config, Credentials};
    use crate::pipeline::PipelineOptions;
    use crate::recording::{RecorderController, RecorderSettings};
    use crate::retry::RetryPolicy;
    use crate::test_support::FakeMicrophone;
    use crate::transcription::TranscriptionClient;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::broadcast;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn overlay(mic: FakeMicrophone, server: &MockServer, dir: &Path) -> RecordingOverlay {
        overlay_with_limit(mic, server, dir, Duration::from_secs(30), Duration::from_secs(1))
    }

    fn overlay_with_limit(
        mic: FakeMicrophone,
        server: &MockServer,
        dir: &Path,
        max_duration: Duration,
        tick_interval: Duration,
    ) -> RecordingOverlay {
        let mut config = load_config().expect("config");
        config.transcription.endpoint = format!("{}/v1/audio/transcriptions", server.uri());
        config.chat.endpoint = format!("{}/v1/chat/completions", server.uri());
        let creds = Credentials::new("sk-test");

        let recorder = RecorderController::new(
            Arc::new(mic),
            RecorderSettings {
                max_duration,
                tick_interval,
                recordings_dir: dir.to_path_buf(),
            },
        );
        let pipeline = VoicePipeline::new(
            recorder,
            AudioPackager::default(),
            TranscriptionClient::new(&config.transcription, &creds, true).expect("transcriber"),
            ResponseAssembler::new(&config.chat, &creds).expect("assembler"),
            PipelineOptions {
                chat_retry: RetryPolicy::none(),
                ..PipelineOptions::default()
            },
        );
        RecordingOverlay::new(pipeline)
    }

    async fn mount_success(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "language": "hindi",
                "duration": 2.0,
                "text": "मुझे नौकरी चाहिए"
            })))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "ज़रूर, मैं मदद करूँगा।"}}]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_tap_records_then_replies() {
        let server = MockServer::start().await;
        mount_success(&server).await;
        let dir = tempfile::tempdir().expect("tempdir");
        let mut overlay = overlay(FakeMicrophone::new(), &server, dir.path());

        overlay.tap().await;
        assert_eq!(
            overlay.state(),
            &OverlayState::Recording {
                elapsed_seconds: 0,
                remaining_seconds: 30
            }
        );

        overlay.tap().await;
        match overlay.state() {
            OverlayState::Reply(turn) => {
                assert_eq!(turn.user_text, "मुझे नौकरी चाहिए");
                assert_eq!(turn.language, "hi");
                assert_eq!(turn.assistant_text, "ज़रूर, मैं मदद करूँगा।");
            }
            other => panic!("expected reply, got {:?}", other),
        }
        assert_eq!(overlay.language(), "hi");
        assert_eq!(overlay.pipeline().recorder().status(), RecordingStatus::Completed);
        // Audio is cleaned up
        assert_eq!(std::fs::read_dir(dir.path()).expect("read dir").count(), 0);
    }

    #[tokio::test]
    async fn test_permission_denied_shows_error_and_retry_clears_it() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let mut mic = FakeMicrophone::new();
        mic.grant_permission = false;
        let mut overlay = overlay(mic, &server, dir.path());

        overlay.tap().await;
        match overlay.state() {
            OverlayState::Failed { kind, message } => {
                assert_eq!(*kind, ErrorKind::PermissionDenied);
                assert!(message.contains("Microphone access"));
            }
            other => panic!("expected failure, got {:?}", other),
        }

        // Taps are ignored until the error is cleared
        overlay.tap().await;
        assert!(matches!(overlay.state(), OverlayState::Failed { .. }));

        overlay.retry();
        assert_eq!(overlay.state(), &OverlayState::Idle);
    }

    #[tokio::test]
    async fn test_no_speech_uses_localized_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "  "})),
            )
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().expect("tempdir");
        let mut overlay = overlay(FakeMicrophone::new(), &server, dir.path());
        overlay.set_language("hi");

        overlay.tap().await;
        overlay.tap().await;
        match overlay.state() {
            OverlayState::Failed { kind, message } => {
                assert_eq!(*kind, ErrorKind::NoSpeechDetected);
                assert_eq!(message, hindi_message(ErrorKind::NoSpeechDetected));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(overlay.pipeline().recorder().status(), RecordingStatus::Error);
        assert_eq!(std::fs::read_dir(dir.path()).expect("read dir").count(), 0);
    }

    #[tokio::test]
    async fn test_close_cancels_recording() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let mic = FakeMicrophone::new();
        let mut overlay = overlay(mic.clone(), &server, dir.path());

        overlay.tap().await;
        assert_eq!(mic.open_streams(), 1);

        overlay.close().await;
        assert_eq!(overlay.state(), &OverlayState::Idle);
        assert_eq!(mic.open_streams(), 0);
        assert_eq!(overlay.pipeline().recorder().status(), RecordingStatus::Idle);
    }

    #[tokio::test]
    async fn test_tick_updates_recording_state_only() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let mut overlay = overlay(FakeMicrophone::new(), &server, dir.path());

        let tick = RecorderEvent::Tick {
            elapsed_seconds: 5,
            remaining_seconds: 25,
        };
        assert!(!overlay.handle_event(tick.clone()).await);
        assert_eq!(overlay.state(), &OverlayState::Idle);

        overlay.tap().await;
        assert!(overlay.handle_event(tick).await);
        assert_eq!(
            overlay.state(),
            &OverlayState::Recording {
                elapsed_seconds: 5,
                remaining_seconds: 25
            }
        );
        overlay.close().await;
    }

    async fn wait_for_auto_stop(events: &mut broadcast::Receiver<RecorderEvent>) -> RecordingSession {
        loop {
            match events.recv().await.expect("event") {
                RecorderEvent::AutoStopped(session) => return session,
                RecorderEvent::AutoStopFailed { message } => panic!("auto-stop failed: {}", message),
                _ => {}
            }
        }
    }

    #[tokio::test]
    async fn test_auto_stopped_session_is_discarded_after_close() {
        let server = MockServer::start().await;
        mount_success(&server).await;
        let dir = tempfile::tempdir().expect("tempdir");
        let mut overlay = overlay_with_limit(
            FakeMicrophone::new(),
            &server,
            dir.path(),
            Duration::from_millis(100),
            Duration::from_millis(50),
        );
        let mut events = overlay.pipeline().recorder().subscribe();

        overlay.tap().await;
        let session = wait_for_auto_stop(&mut events).await;
        assert!(session.audio_path.exists());

        // Close lands before the queued auto-stop event is handled
        overlay.close().await;
        overlay
            .handle_event(RecorderEvent::AutoStopped(session.clone()))
            .await;

        assert_eq!(overlay.state(), &OverlayState::Idle);
        assert_eq!(overlay.pipeline().recorder().status(), RecordingStatus::Idle);
        assert!(!session.audio_path.exists());
        let requests = server.received_requests().await.unwrap_or_default();
        assert!(requests.is_empty(), "nothing should be uploaded");
    }

    #[tokio::test]
    async fn test_tap_racing_auto_stop_waits_for_event() {
        let server = MockServer::start().await;
        mount_success(&server).await;
        let dir = tempfile::tempdir().expect("tempdir");
        let mut overlay = overlay_with_limit(
            FakeMicrophone::new(),
            &server,
            dir.path(),
            Duration::from_millis(100),
            Duration::from_millis(50),
        );
        let mut events = overlay.pipeline().recorder().subscribe();

        overlay.tap().await;
        let session = wait_for_auto_stop(&mut events).await;

        // The tap finds nothing to stop; the auto-stop event carries the session
        overlay.tap().await;
        assert_eq!(overlay.state(), &OverlayState::Processing);

        assert!(overlay.handle_event(RecorderEvent::AutoStopped(session)).await);
        match overlay.state() {
            OverlayState::Reply(turn) => assert_eq!(turn.language, "hi"),
            other => panic!("expected reply, got {:?}", other),
        }
        assert_eq!(overlay.pipeline().recorder().status(), RecordingStatus::Completed);
    }

    #[test]
    fn test_error_messages() {
        assert!(error_message(ErrorKind::ApiKeyMissing, "en").contains("contact support"));
        assert!(error_message(ErrorKind::ApiKeyMissing, "hi").contains("संपर्क"));
        // No Tamil table yet
        assert_eq!(
            error_message(ErrorKind::NetworkError, "ta"),
            english_message(ErrorKind::NetworkError)
        );
    }
}
