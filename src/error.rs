//! Error taxonomy for the voice pipeline
//!
//! Every stage re-classifies lower-level failures (audio device, HTTP,
//! filesystem) into [`VoiceError`] before returning to its caller.

use std::fmt;
use thiserror::Error;

/// Boxed lower-level cause attached to an error
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Pipeline errors over a closed set of kinds
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("Recording failed: {message}")]
    RecordingFailed {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    #[error("Invalid audio: {message}")]
    InvalidAudio { message: String },

    #[error("No speech detected in recording")]
    NoSpeechDetected,

    #[error("Transcription failed: {message}")]
    TranscriptionFailed {
        message: String,
        status: Option<u16>,
    },

    #[error("Chat failed: {message}")]
    ChatFailed {
        message: String,
        status: Option<u16>,
    },

    #[error("Network error: {message}")]
    NetworkError {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    #[error("API key not configured: {variable}")]
    ApiKeyMissing { variable: &'static str },

    #[error("Language detection failed: {message}")]
    LanguageDetectionFailed { message: String },
}

/// Discriminant of [`VoiceError`], used for matching and user messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PermissionDenied,
    RecordingFailed,
    InvalidAudio,
    NoSpeechDetected,
    TranscriptionFailed,
    ChatFailed,
    NetworkError,
    ApiKeyMissing,
    LanguageDetectionFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::RecordingFailed => "recording_failed",
            ErrorKind::InvalidAudio => "invalid_audio",
            ErrorKind::NoSpeechDetected => "no_speech_detected",
            ErrorKind::TranscriptionFailed => "transcription_failed",
            ErrorKind::ChatFailed => "chat_failed",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::ApiKeyMissing => "api_key_missing",
            ErrorKind::LanguageDetectionFailed => "language_detection_failed",
        };
        f.write_str(name)
    }
}

impl VoiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VoiceError::PermissionDenied => ErrorKind::PermissionDenied,
            VoiceError::RecordingFailed { .. } => ErrorKind::RecordingFailed,
            VoiceError::InvalidAudio { .. } => ErrorKind::InvalidAudio,
            VoiceError::NoSpeechDetected => ErrorKind::NoSpeechDetected,
            VoiceError::TranscriptionFailed { .. } => ErrorKind::TranscriptionFailed,
            VoiceError::ChatFailed { .. } => ErrorKind::ChatFailed,
            VoiceError::NetworkError { .. } => ErrorKind::NetworkError,
            VoiceError::ApiKeyMissing { .. } => ErrorKind::ApiKeyMissing,
            VoiceError::LanguageDetectionFailed { .. } => ErrorKind::LanguageDetectionFailed,
        }
    }

    pub(crate) fn recording(message: impl Into<String>) -> Self {
        VoiceError::RecordingFailed {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn invalid_audio(message: impl Into<String>) -> Self {
        VoiceError::InvalidAudio {
            message: message.into(),
        }
    }

    pub(crate) fn transcription(message: impl Into<String>, status: Option<u16>) -> Self {
        VoiceError::TranscriptionFailed {
            message: message.into(),
            status,
        }
    }

    pub(crate) fn chat(message: impl Into<String>, status: Option<u16>) -> Self {
        VoiceError::ChatFailed {
            message: message.into(),
            status,
        }
    }

    pub(crate) fn network(message: impl Into<String>) -> Self {
        VoiceError::NetworkError {
            message: message.into(),
            source: None,
        }
    }

    /// Classify a transport-level reqwest failure.
    ///
    /// Only used for errors raised while sending or reading a response;
    /// HTTP status codes are mapped by each client.
    pub(crate) fn from_transport(error: reqwest::Error) -> Self {
        let message = if error.is_timeout() {
            "request timed out".to_string()
        } else if error.is_connect() {
            "could not connect to server".to_string()
        } else {
            "request failed".to_string()
        };
        VoiceError::NetworkError {
            message,
            source: Some(Box::new(error)),
        }
    }
}

impl From<crate::audio::AudioCaptureError> for VoiceError {
    fn from(error: crate::audio::AudioCaptureError) -> Self {
        VoiceError::RecordingFailed {
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// OpenAI-style endpoints answer `{"error": {"message": "..."}}`; anything
/// else is returned as trimmed plain text.
pub(crate) fn extract_error_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct Envelope {
        error: Detail,
    }

    #[derive(serde::Deserialize)]
    struct Detail {
        message: String,
    }

    match serde_json::from_str::<Envelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body.trim().chars().take(300).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(
            VoiceError::PermissionDenied.kind(),
            ErrorKind::PermissionDenied
        );
        assert_eq!(
            VoiceError::transcription("bad", Some(400)).kind(),
            ErrorKind::TranscriptionFailed
        );
        assert_eq!(
            VoiceError::network("down").kind(),
            ErrorKind::NetworkError
        );
    }

    #[test]
    fn test_api_key_missing_does_not_leak_value() {
        let error = VoiceError::ApiKeyMissing {
            variable: "OPENAI_API_KEY",
        };
        let text = error.to_string();
        assert!(text.contains("OPENAI_API_KEY"));
        assert!(!text.contains("sk-"));
    }

    #[test]
    fn test_extract_error_message_json() {
        let body = r#"{"error": {"message": "Invalid file format.", "type": "invalid_request_error"}}"#;
        assert_eq!(extract_error_message(body), "Invalid file format.");
    }

    #[test]
    fn test_extract_error_message_plain_text() {
        assert_eq!(extract_error_message("  Bad Gateway \n"), "Bad Gateway");
    }

    #[test]
    fn test_capture_errors_become_recording_failures() {
        use std::error::Error as _;

        let error = VoiceError::from(crate::audio::AudioCaptureError::CaptureThreadExited);
        assert_eq!(error.kind(), ErrorKind::RecordingFailed);
        assert!(error.to_string().contains("capture thread exited"));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::NoSpeechDetected.to_string(), "no_speech_detected");
    }
}
