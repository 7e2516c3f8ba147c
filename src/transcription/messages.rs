//! Speech-to-text API message types
//!
//! Whisper's `verbose_json` response format. Only the fields the client
//! reads are modelled; everything else is ignored.

use serde::Deserialize;

/// Response format requested from the endpoint
pub(crate) const RESPONSE_FORMAT: &str = "verbose_json";

/// Decoding temperature; 0 keeps transcripts deterministic
pub(crate) const TEMPERATURE: &str = "0";

/// Body of a successful transcription response
#[derive(Debug, Deserialize)]
pub(crate) struct VerboseTranscription {
    #[serde(default)]
    pub text: String,
    /// Lowercase English language name, e.g. "hindi"
    #[serde(default)]
    pub language: Option<String>,
    /// Audio length in seconds
    #[serde(default)]
    pub duration: Option<f64>,
}
