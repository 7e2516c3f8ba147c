//! Conversational responses for transcribed questions
//!
//! Sends the transcript to an OpenAI-compatible Chat Completions endpoint
//! with a system prompt chosen for the detected language.

mod prompts;

use crate::config::{ChatConfig, Credentials};
use crate::error::{extract_error_message, VoiceError};
use crate::language::LanguageDetection;
use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument, warn};
use zeroize::Zeroize;

/// One question and its answer
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub user_text: String,
    pub assistant_text: String,
    pub language: String,
    pub language_confidence: f64,
    pub created_at: DateTime<Utc>,
}

/// Request body for the Chat Completions API.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client that turns transcripts into assistant replies
pub struct ResponseAssembler {
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl ResponseAssembler {
    pub fn new(config: &ChatConfig, creds: &Credentials) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client for ResponseAssembler")?;

        Ok(Self {
            api_key: creds.api_key.clone(),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    fn build_request(&self, transcript: &str, language: &str) -> ChatCompletionRequest {
        let mut messages: Vec<ChatMessage> = prompts::system_prompts(language)
            .into_iter()
            .map(|content| ChatMessage {
                role: "system",
                content,
            })
            .collect();
        messages.push(ChatMessage {
            role: "user",
            content: transcript.to_string(),
        });

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Generate a reply to `transcript` in the detected language.
    ///
    /// Makes a single request; callers wanting retries wrap this call.
    #[instrument(
        skip(self, transcript, detection),
        fields(transcript_len = transcript.len(), language = %detection.language)
    )]
    pub async fn respond(
        &self,
        transcript: &str,
        detection: &LanguageDetection,
    ) -> Result<ChatTurn, VoiceError> {
        let request_body = self.build_request(transcript, &detection.language);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(VoiceError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = classify_status(status, &body);
            warn!(status = status.as_u16(), error = %error, "Chat request failed");
            return Err(error);
        }

        let chat_response: ChatCompletionResponse = response.json().await.map_err(|e| {
            if e.is_decode() {
                VoiceError::chat(format!("Failed to parse chat response: {}", e), Some(status.as_u16()))
            } else {
                VoiceError::from_transport(e)
            }
        })?;

        let assistant_text = Self::extract_text(&chat_response)?;
        info!(reply_len = assistant_text.len(), "Chat response received");

        Ok(ChatTurn {
            user_text: transcript.to_string(),
            assistant_text,
            language: detection.language.clone(),
            language_confidence: detection.confidence,
            created_at: Utc::now(),
        })
    }

    /// Extract text from the response structure.
    fn extract_text(response: &ChatCompletionResponse) -> Result<String, VoiceError> {
        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .ok_or_else(|| VoiceError::chat("no response generated", None))
    }
}

fn classify_status(status: StatusCode, body: &str) -> VoiceError {
    let code = Some(status.as_u16());
    match status {
        StatusCode::UNAUTHORIZED => VoiceError::chat("invalid API key", code),
        StatusCode::TOO_MANY_REQUESTS => VoiceError::chat("rate limit exceeded", code),
        s if s.is_server_error() => VoiceError::chat("server error", code),
        _ => VoiceError::chat(extract_error_message(body), code),
    }
}

impl Drop for ResponseAssembler {
    fn drop(&mut self) {
        // Clear API key from memory
        self.api_key.zeroize();
    }
}
