//! Transcription of finalized recordings
//!
//! Uploads packaged audio to an OpenAI-compatible `/audio/transcriptions`
//! endpoint as a multipart form and classifies every failure into
//! [`VoiceError`]. The client never retries; retry decisions belong to the
//! caller.

mod messages;

use crate::audio::AudioPayload;
use crate::config::{Credentials, TranscriptionConfig};
use crate::error::{extract_error_message, VoiceError};
use crate::language::{self, DetectionMethod, LanguageDetection};
use crate::recording::remove_recording;
use anyhow::Context;
use messages::{VerboseTranscription, RESPONSE_FORMAT, TEMPERATURE};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use zeroize::Zeroize;

/// Outcome of a successful transcription
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionResult {
    /// Trimmed transcript, never empty
    pub text: String,
    /// Language as reported by the endpoint, before normalization
    pub raw_language_tag: Option<String>,
    /// Language resolved by the disambiguation heuristic
    pub detected_language: String,
    pub language_confidence: f64,
    pub language_method: DetectionMethod,
    pub duration_seconds: Option<f64>,
}

impl TranscriptionResult {
    /// Language detection as resolved for this transcript
    pub fn detection(&self) -> LanguageDetection {
        LanguageDetection {
            language: self.detected_language.clone(),
            confidence: self.language_confidence,
            method: self.language_method,
        }
    }
}

/// Client for the speech-to-text endpoint
pub struct TranscriptionClient {
    api_key: String,
    endpoint: String,
    model: String,
    auto_cleanup: bool,
    client: reqwest::Client,
}

impl TranscriptionClient {
    /// Create a client from configuration and credentials.
    ///
    /// With `auto_cleanup`, the source audio file is deleted after a
    /// successful transcription.
    pub fn new(
        config: &TranscriptionConfig,
        creds: &Credentials,
        auto_cleanup: bool,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client for TranscriptionClient")?;

        Ok(Self {
            api_key: creds.api_key.clone(),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            auto_cleanup,
            client,
        })
    }

    /// Transcribe one audio payload.
    ///
    /// `language_hint` is forwarded to the endpoint when set. The returned
    /// language comes from the disambiguation heuristic, with the endpoint's
    /// own tag as one of its inputs.
    #[instrument(
        skip(self, payload),
        fields(filename = %payload.filename, bytes = payload.len())
    )]
    pub async fn transcribe(
        &self,
        payload: &AudioPayload,
        language_hint: Option<&str>,
    ) -> Result<TranscriptionResult, VoiceError> {
        if payload.is_empty() {
            return Err(VoiceError::invalid_audio("audio payload is empty"));
        }

        let file_part = Part::bytes(payload.bytes.clone())
            .file_name(payload.filename.clone())
            .mime_str(payload.format.base_mime_type())
            .map_err(|e| VoiceError::invalid_audio(format!("invalid audio mime type: {}", e)))?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", RESPONSE_FORMAT)
            .text("temperature", TEMPERATURE);
        if let Some(hint) = language_hint.filter(|h| !h.trim().is_empty()) {
            form = form.text("language", hint.trim().to_string());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(VoiceError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = classify_status(status, &body);
            warn!(status = status.as_u16(), error = %error, "Transcription request failed");
            return Err(error);
        }

        let body = response.text().await.map_err(VoiceError::from_transport)?;
        let parsed: VerboseTranscription = serde_json::from_str(&body).map_err(|e| {
            VoiceError::transcription(
                format!("Failed to parse transcription response: {}", e),
                Some(status.as_u16()),
            )
        })?;

        let text = parsed.text.trim();
        if text.is_empty() {
            info!("Transcription returned no speech");
            return Err(VoiceError::NoSpeechDetected);
        }

        let raw_tag = parsed.language.filter(|l| !l.trim().is_empty());
        let detection = language::detect_language(text, raw_tag.as_deref()).unwrap_or_else(|e| {
            warn!(error = %e, "Language detection failed, using upstream tag");
            LanguageDetection::fallback(raw_tag.as_deref())
        });

        info!(
            chars = text.chars().count(),
            raw_language = raw_tag.as_deref().unwrap_or("none"),
            language = %detection.language,
            confidence = detection.confidence,
            "Transcription complete"
        );

        if self.auto_cleanup {
            remove_recording(&payload.source_path).await;
        } else {
            debug!(path = %payload.source_path.display(), "Keeping recording");
        }

        Ok(TranscriptionResult {
            text: text.to_string(),
            raw_language_tag: raw_tag,
            detected_language: detection.language,
            language_confidence: detection.confidence,
            language_method: detection.method,
            duration_seconds: parsed.duration,
        })
    }
}

/// Map a non-success status to the error taxonomy
fn classify_status(status: StatusCode, body: &str) -> VoiceError {
    let code = status.as_u16();
    match status {
        StatusCode::BAD_REQUEST => VoiceError::transcription(extract_error_message(body), Some(code)),
        StatusCode::UNAUTHORIZED => VoiceError::transcription("Invalid API key", Some(code)),
        StatusCode::PAYLOAD_TOO_LARGE => {
            VoiceError::invalid_audio(format!("audio rejected as too large: {}", extract_error_message(body)))
        }
        StatusCode::TOO_MANY_REQUESTS => VoiceError::transcription("rate limit exceeded", Some(code)),
        s if s.is_server_error() => VoiceError::network(format!("server error ({})", code)),
        _ => {
            let message = extract_error_message(body);
            let message = if message.is_empty() {
                format!("unexpected status {}", code)
            } else {
                message
            };
            VoiceError::transcription(message, Some(code))
        }
    }
}

impl Drop for TranscriptionClient {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}
