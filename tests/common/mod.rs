//! Shared helpers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use vaani_voice::audio::{AudioCaptureError, AudioFormat, CaptureStream, Microphone};
use vaani_voice::config::{load_config, AppConfig, Credentials};
use wiremock::MockServer;

pub const TRANSCRIPTIONS_PATH: &str = "/v1/audio/transcriptions";
pub const CHAT_PATH: &str = "/v1/chat/completions";

/// Embedded configuration pointed at a mock server
pub fn config_for(server: &MockServer, recordings_dir: &Path) -> AppConfig {
    let mut config = load_config().expect("embedded config");
    config.transcription.endpoint = format!("{}{}", server.uri(), TRANSCRIPTIONS_PATH);
    config.chat.endpoint = format!("{}{}", server.uri(), CHAT_PATH);
    config.recording.recordings_dir = Some(recordings_dir.to_path_buf());
    config.pipeline.chat_retry_delay_ms = 10;
    config
}

pub fn credentials() -> Credentials {
    Credentials::new("sk-test-key")
}

/// Write a small fake WAV file and return its path
pub fn write_audio(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"RIFF----WAVEfmt fake audio").expect("write audio");
    path
}

/// Microphone that hands back fixed bytes
pub struct ScriptedMicrophone {
    pub grant: bool,
    pub audio: Vec<u8>,
}

impl ScriptedMicrophone {
    pub fn new() -> Self {
        Self {
            grant: true,
            audio: b"RIFF----WAVEfmt scripted".to_vec(),
        }
    }
}

#[async_trait]
impl Microphone for ScriptedMicrophone {
    async fn request_permission(&self) -> Result<bool, AudioCaptureError> {
        Ok(self.grant)
    }

    fn supported_mime_types(&self) -> Vec<&'static str> {
        vec!["audio/webm;codecs=opus", "audio/wav"]
    }

    async fn start(&self, _format: AudioFormat) -> Result<Box<dyn CaptureStream>, AudioCaptureError> {
        Ok(Box::new(ScriptedCapture {
            audio: self.audio.clone(),
        }))
    }
}

struct ScriptedCapture {
    audio: Vec<u8>,
}

#[async_trait]
impl CaptureStream for ScriptedCapture {
    async fn finish(self: Box<Self>) -> Result<Vec<u8>, AudioCaptureError> {
        Ok(self.audio)
    }

    async fn discard(self: Box<Self>) {}
}
