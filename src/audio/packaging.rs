//! Audio format negotiation and upload payloads
//!
//! The transcription endpoint infers the container partly from the file
//! name, so every payload carries a file name whose extension matches its
//! MIME type.

use crate::error::VoiceError;
use crate::recording::RecordingSession;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Upload ceiling of the transcription endpoint (25 MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

/// A container/codec the recorder can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Full MIME type, possibly with a codecs parameter
    pub mime_type: &'static str,
    /// File extension the endpoint recognises for this container
    pub extension: &'static str,
}

impl AudioFormat {
    /// MIME type without parameters, as sent in the multipart part
    pub fn base_mime_type(&self) -> &'static str {
        self.mime_type
            .split(';')
            .next()
            .unwrap_or(self.mime_type)
            .trim()
    }

    /// Look up a known format by MIME type (parameters must match exactly)
    pub fn from_mime_type(mime_type: &str) -> Option<AudioFormat> {
        PREFERRED_FORMATS
            .iter()
            .copied()
            .find(|f| f.mime_type.eq_ignore_ascii_case(mime_type.trim()))
    }
}

pub const WEBM_OPUS: AudioFormat = AudioFormat {
    mime_type: "audio/webm;codecs=opus",
    extension: "webm",
};
pub const WEBM: AudioFormat = AudioFormat {
    mime_type: "audio/webm",
    extension: "webm",
};
pub const OGG_OPUS: AudioFormat = AudioFormat {
    mime_type: "audio/ogg;codecs=opus",
    extension: "ogg",
};
pub const MP4: AudioFormat = AudioFormat {
    mime_type: "audio/mp4",
    extension: "m4a",
};
pub const MPEG: AudioFormat = AudioFormat {
    mime_type: "audio/mpeg",
    extension: "mp3",
};
pub const WAV: AudioFormat = AudioFormat {
    mime_type: "audio/wav",
    extension: "wav",
};

/// Formats in order of preference
pub const PREFERRED_FORMATS: [AudioFormat; 6] = [WEBM_OPUS, WEBM, OGG_OPUS, MP4, MPEG, WAV];

/// Used when the runtime reports none of the preferred formats
pub const FALLBACK_FORMAT: AudioFormat = WAV;

/// Pick the first preferred format the runtime supports
pub fn select_format(supported: &[&str]) -> AudioFormat {
    let selected = PREFERRED_FORMATS
        .iter()
        .copied()
        .find(|format| {
            supported
                .iter()
                .any(|mime| mime.trim().eq_ignore_ascii_case(format.mime_type))
        })
        .unwrap_or(FALLBACK_FORMAT);
    debug!(mime_type = selected.mime_type, "Selected recording format");
    selected
}

/// Audio ready for upload
#[derive(Debug, Clone)]
pub struct AudioPayload {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
    /// Upload file name; extension always matches `format`
    pub filename: String,
    /// File the payload was read from (deleted on cleanup)
    pub source_path: PathBuf,
}

impl AudioPayload {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Turns finalized recordings into upload payloads
#[derive(Debug, Clone)]
pub struct AudioPackager {
    max_bytes: u64,
}

impl Default for AudioPackager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UPLOAD_BYTES)
    }
}

impl AudioPackager {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Package the audio of a finalized recording session
    pub async fn package(&self, session: &RecordingSession) -> Result<AudioPayload, VoiceError> {
        self.package_file(&session.audio_path, session.format).await
    }

    /// Package an audio file recorded in `format`
    ///
    /// Size is checked from metadata before the file is read, so oversized
    /// recordings fail without a wasted upload.
    pub async fn package_file(
        &self,
        path: &Path,
        format: AudioFormat,
    ) -> Result<AudioPayload, VoiceError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| VoiceError::invalid_audio(format!("audio file not found: {}", path.display())))?;

        if !metadata.is_file() {
            return Err(VoiceError::invalid_audio(format!(
                "not an audio file: {}",
                path.display()
            )));
        }
        if metadata.len() == 0 {
            return Err(VoiceError::invalid_audio("audio file is empty"));
        }
        if metadata.len() > self.max_bytes {
            return Err(VoiceError::invalid_audio(format!(
                "audio is {} bytes (max: {})",
                metadata.len(),
                self.max_bytes
            )));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| VoiceError::invalid_audio(format!("failed to read audio: {}", e)))?;

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("recording");
        let filename = format!("{}.{}", stem, format.extension);

        info!(
            filename = %filename,
            bytes = bytes.len(),
            mime_type = format.mime_type,
            "Packaged audio for upload"
        );

        Ok(AudioPayload {
            bytes,
            format,
            filename,
            source_path: path.to_path_buf(),
        })
    }
}

/// Encode mono 16-bit PCM as a WAV file in memory
pub(crate) fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}
