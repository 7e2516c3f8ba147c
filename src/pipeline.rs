//! End-to-end processing of a finalized recording
//!
//! Packaging, transcription, language detection and the chat reply run
//! strictly one after another. The recorder is told how processing ended
//! and the audio file is cleaned up on every exit path.

use crate::audio::{AudioPackager, Microphone};
use crate::chat::{ChatTurn, ResponseAssembler};
use crate::config::{AppConfig, Credentials};
use crate::error::VoiceError;
use crate::recording::{remove_recording, RecorderController, RecorderSettings, RecordingSession};
use crate::retry::RetryPolicy;
use crate::transcription::TranscriptionClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Behaviour switches for [`VoicePipeline`]
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Delete audio files once processing ends
    pub auto_cleanup: bool,
    /// Language forwarded to the transcription endpoint
    pub language_hint: Option<String>,
    /// Retry applied to the chat step only
    pub chat_retry: RetryPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            auto_cleanup: true,
            language_hint: None,
            chat_retry: RetryPolicy::default(),
        }
    }
}

/// Recorder plus the stages that turn a recording into a reply
pub struct VoicePipeline {
    recorder: RecorderController,
    packager: AudioPackager,
    transcriber: TranscriptionClient,
    assembler: ResponseAssembler,
    options: PipelineOptions,
}

impl VoicePipeline {
    pub fn new(
        recorder: RecorderController,
        packager: AudioPackager,
        transcriber: TranscriptionClient,
        assembler: ResponseAssembler,
        options: PipelineOptions,
    ) -> Self {
        Self {
            recorder,
            packager,
            transcriber,
            assembler,
            options,
        }
    }

    /// Wire every stage from configuration
    pub fn from_config(
        config: &AppConfig,
        creds: &Credentials,
        microphone: Arc<dyn Microphone>,
    ) -> anyhow::Result<Self> {
        let recorder = RecorderController::new(microphone, RecorderSettings::from(&config.recording));
        let packager = AudioPackager::new(config.recording.max_upload_bytes);
        let transcriber =
            TranscriptionClient::new(&config.transcription, creds, config.pipeline.auto_cleanup)?;
        let assembler = ResponseAssembler::new(&config.chat, creds)?;
        let options = PipelineOptions {
            auto_cleanup: config.pipeline.auto_cleanup,
            language_hint: config.pipeline.language_hint.clone(),
            chat_retry: RetryPolicy::new(
                config.pipeline.chat_retry_attempts,
                Duration::from_millis(config.pipeline.chat_retry_delay_ms),
            ),
        };
        Ok(Self::new(recorder, packager, transcriber, assembler, options))
    }

    pub fn recorder(&self) -> &RecorderController {
        &self.recorder
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Turn a finalized recording into a chat turn
    ///
    /// Marks the session completed or failed on the recorder. With
    /// `auto_cleanup`, the audio file is gone when this returns, whatever
    /// the outcome.
    #[instrument(skip(self, session), fields(session_id = session.id))]
    pub async fn process(&self, session: RecordingSession) -> Result<ChatTurn, VoiceError> {
        let result = self.run_stages(&session).await;

        match &result {
            Ok(turn) => {
                info!(
                    language = %turn.language,
                    confidence = turn.language_confidence,
                    "Voice pipeline complete"
                );
                self.recorder.mark_completed(session.id);
            }
            Err(e) => {
                warn!(kind = %e.kind(), error = %e, "Voice pipeline failed");
                self.recorder.mark_failed(session.id);
            }
        }

        if self.options.auto_cleanup {
            // Transcription removes the file on success; this covers failures
            remove_recording(&session.audio_path).await;
        }

        result
    }

    async fn run_stages(&self, session: &RecordingSession) -> Result<ChatTurn, VoiceError> {
        let payload = self.packager.package(session).await?;

        let transcription = self
            .transcriber
            .transcribe(&payload, self.options.language_hint.as_deref())
            .await?;

        let detection = transcription.detection();
        self.options
            .chat_retry
            .run("chat", || self.assembler.respond(&transcription.text, &detection))
            .await
    }
}
