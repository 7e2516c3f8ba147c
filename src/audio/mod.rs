//! Microphone access and audio packaging
//!
//! The recorder talks to the microphone through the [`Microphone`] trait so
//! the hardware can be swapped out. [`CpalMicrophone`] captures the default
//! input device with cpal on a dedicated thread (cpal streams are not
//! `Send`), downmixes to mono, resamples to 16kHz and encodes WAV when the
//! capture is finished.

pub mod packaging;
mod resampler;
mod types;

pub use packaging::{select_format, AudioFormat, AudioPackager, AudioPayload};
pub use types::{AudioCaptureError, AudioCaptureHandle, AudioChunk};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use resampler::SampleProcessor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Sample rate sent to the transcription endpoint (16kHz mono)
pub const TARGET_SAMPLE_RATE: u32 = 16000;

/// Microphone hardware and permission API
#[async_trait]
pub trait Microphone: Send + Sync {
    /// Ask the platform for microphone access. `Ok(false)` means refused.
    async fn request_permission(&self) -> Result<bool, AudioCaptureError>;

    /// MIME types this runtime can record
    fn supported_mime_types(&self) -> Vec<&'static str>;

    /// Acquire the microphone and begin capturing in `format`
    async fn start(&self, format: AudioFormat) -> Result<Box<dyn CaptureStream>, AudioCaptureError>;
}

/// An open capture holding the microphone
#[async_trait]
pub trait CaptureStream: Send {
    /// Stop capturing, release the microphone and return the encoded audio.
    /// An empty vector means nothing was captured.
    async fn finish(self: Box<Self>) -> Result<Vec<u8>, AudioCaptureError>;

    /// Stop capturing, release the microphone and drop any captured audio
    async fn discard(self: Box<Self>);
}

/// Default input device via cpal, encoded as 16kHz mono WAV
#[derive(Debug, Clone)]
pub struct CpalMicrophone {
    target_sample_rate: u32,
}

impl Default for CpalMicrophone {
    fn default() -> Self {
        Self {
            target_sample_rate: TARGET_SAMPLE_RATE,
        }
    }
}

impl CpalMicrophone {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Microphone for CpalMicrophone {
    /// Always grants; cpal has no permission API.
    ///
    /// The OS prompts when the stream opens. How a refusal shows up depends
    /// on the platform: on Linux and Windows the stream fails to build and
    /// `start` returns an error (`RecordingFailed`). macOS may instead open
    /// the stream and deliver silence, so the recording succeeds and the
    /// refusal only surfaces later as `NoSpeechDetected` from transcription.
    async fn request_permission(&self) -> Result<bool, AudioCaptureError> {
        debug!("Microphone permission is requested by the OS on first capture");
        Ok(true)
    }

    fn supported_mime_types(&self) -> Vec<&'static str> {
        vec![packaging::WAV.mime_type]
    }

    async fn start(&self, format: AudioFormat) -> Result<Box<dyn CaptureStream>, AudioCaptureError> {
        if format != packaging::WAV {
            return Err(AudioCaptureError::UnsupportedFormat(
                format.mime_type.to_string(),
            ));
        }

        let (handle, mut audio_rx) = start_capture_with_sample_rate(self.target_sample_rate).await?;

        // Drain chunks into a single buffer until the capture thread exits
        let collector = tokio::spawn(async move {
            let mut samples = Vec::new();
            while let Some(chunk) = audio_rx.recv().await {
                samples.extend_from_slice(&chunk.samples);
            }
            samples
        });

        Ok(Box::new(CpalCaptureStream {
            handle,
            collector,
            sample_rate: self.target_sample_rate,
        }))
    }
}

struct CpalCaptureStream {
    handle: AudioCaptureHandle,
    collector: JoinHandle<Vec<i16>>,
    sample_rate: u32,
}

impl CpalCaptureStream {
    async fn release(handle: AudioCaptureHandle) -> Result<(), AudioCaptureError> {
        let mut handle = handle;
        tokio::task::spawn_blocking(move || handle.stop())
            .await
            .map_err(|e| AudioCaptureError::TaskFailed(e.to_string()))
    }
}

#[async_trait]
impl CaptureStream for CpalCaptureStream {
    async fn finish(self: Box<Self>) -> Result<Vec<u8>, AudioCaptureError> {
        let CpalCaptureStream {
            handle,
            collector,
            sample_rate,
        } = *self;

        Self::release(handle).await?;
        let samples = collector
            .await
            .map_err(|e| AudioCaptureError::TaskFailed(e.to_string()))?;

        info!(
            samples = samples.len(),
            sample_rate = sample_rate,
            "Captured audio"
        );

        if samples.is_empty() {
            return Ok(Vec::new());
        }
        Ok(packaging::encode_wav(&samples, sample_rate)?)
    }

    async fn discard(self: Box<Self>) {
        let CpalCaptureStream {
            handle, collector, ..
        } = *self;

        if let Err(e) = Self::release(handle).await {
            warn!("Failed to release microphone cleanly: {}", e);
        }
        collector.abort();
    }
}

/// Start audio capture on a dedicated thread with specified sample rate
///
/// Resolves once the input stream is playing, or with the error that
/// prevented it from starting.
///
/// # Returns
/// - `AudioCaptureHandle` - Used to stop capture and check status
/// - `mpsc::Receiver<AudioChunk>` - Receives mono chunks at `target_sample_rate`
pub(crate) async fn start_capture_with_sample_rate(
    target_sample_rate: u32,
) -> Result<(AudioCaptureHandle, mpsc::Receiver<AudioChunk>), AudioCaptureError> {
    let is_capturing = Arc::new(AtomicBool::new(true));
    let is_capturing_clone = is_capturing.clone();

    // Create async channel for audio chunks
    let (chunk_tx, chunk_rx) = mpsc::channel(600);
    let (ready_tx, ready_rx) = oneshot::channel();

    let thread_handle = thread::spawn(move || {
        if let Err(e) = run_capture(is_capturing_clone, chunk_tx, target_sample_rate, ready_tx) {
            error!("Audio capture error: {}", e);
        }
    });

    let mut handle = AudioCaptureHandle {
        is_capturing,
        thread_handle: Some(thread_handle),
    };

    match ready_rx.await {
        Ok(Ok(())) => Ok((handle, chunk_rx)),
        Ok(Err(e)) => {
            handle.is_capturing.store(false, Ordering::SeqCst);
            Err(e)
        }
        Err(_) => {
            handle.is_capturing.store(false, Ordering::SeqCst);
            handle.thread_handle.take();
            Err(AudioCaptureError::CaptureThreadExited)
        }
    }
}

/// Run audio capture on the current thread (blocking)
///
/// Startup failures are reported through `ready_tx`; the returned error is
/// only logged.
fn run_capture(
    is_capturing: Arc<AtomicBool>,
    chunk_tx: mpsc::Sender<AudioChunk>,
    target_sample_rate: u32,
    ready_tx: oneshot::Sender<Result<(), AudioCaptureError>>,
) -> Result<(), AudioCaptureError> {
    let (stream, processor) = match open_stream(&is_capturing, chunk_tx, target_sample_rate) {
        Ok(opened) => opened,
        Err(e) => {
            let message = e.to_string();
            let _ = ready_tx.send(Err(e));
            return Err(AudioCaptureError::ConfigError(message));
        }
    };

    if let Err(e) = stream.play() {
        let message = e.to_string();
        let _ = ready_tx.send(Err(AudioCaptureError::PlayError(e)));
        return Err(AudioCaptureError::ConfigError(message));
    }
    info!("Audio capture started");
    let _ = ready_tx.send(Ok(()));

    // Keep the stream alive until capture is stopped
    while is_capturing.load(Ordering::SeqCst) {
        thread::sleep(std::time::Duration::from_millis(100));
    }

    drop(stream);
    if let Ok(mut processor) = processor.lock() {
        processor.flush();
    }
    Ok(())
}

type SharedProcessor = Arc<Mutex<SampleProcessor>>;

fn open_stream(
    is_capturing: &Arc<AtomicBool>,
    chunk_tx: mpsc::Sender<AudioChunk>,
    target_sample_rate: u32,
) -> Result<(cpal::Stream, SharedProcessor), AudioCaptureError> {
    let host = cpal::default_host();

    let device = host
        .default_input_device()
        .ok_or(AudioCaptureError::NoInputDevice)?;

    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    info!("Using audio input device: {}", device_name);

    let supported_configs = device
        .supported_input_configs()
        .map_err(|e| AudioCaptureError::ConfigError(e.to_string()))?;

    // Prefer a config that can run at the target rate, otherwise take the
    // first usable one at its max rate and resample
    let mut best_config = None;
    for config in supported_configs {
        if config.channels() == 0 {
            continue;
        }
        if config.min_sample_rate().0 <= target_sample_rate
            && config.max_sample_rate().0 >= target_sample_rate
        {
            best_config = Some(config.with_sample_rate(cpal::SampleRate(target_sample_rate)));
            break;
        } else if best_config.is_none() {
            best_config = Some(config.with_max_sample_rate());
        }
    }

    let supported_config = best_config.ok_or(AudioCaptureError::NoSupportedConfig)?;
    let sample_format = supported_config.sample_format();
    let config: cpal::StreamConfig = supported_config.into();
    let sample_rate = config.sample_rate.0;
    let channels = config.channels as usize;

    if sample_rate != target_sample_rate {
        warn!(
            "{}Hz not supported, using {}Hz instead",
            target_sample_rate, sample_rate
        );
    }
    info!("Audio config: {} channels, {} Hz", channels, sample_rate);

    let processor = Arc::new(Mutex::new(SampleProcessor::new(
        sample_rate,
        target_sample_rate,
        channels,
        chunk_tx,
    )));

    let err_callback = |err| {
        error!("Audio stream error: {}", err);
    };

    let stream = match sample_format {
        SampleFormat::I16 => {
            let is_capturing = is_capturing.clone();
            let processor = processor.clone();
            device.build_input_stream(
                &config,
                move |data: &[i16], _| {
                    if !is_capturing.load(Ordering::SeqCst) {
                        return;
                    }
                    if let Ok(mut processor) = processor.lock() {
                        processor.process(data);
                    }
                },
                err_callback,
                None,
            )?
        }
        SampleFormat::F32 => {
            let is_capturing = is_capturing.clone();
            let processor = processor.clone();
            device.build_input_stream(
                &config,
                move |data: &[f32], _| {
                    if !is_capturing.load(Ordering::SeqCst) {
                        return;
                    }
                    // Convert f32 to i16
                    let samples: Vec<i16> = data
                        .iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
                        .collect();
                    if let Ok(mut processor) = processor.lock() {
                        processor.process(&samples);
                    }
                },
                err_callback,
                None,
            )?
        }
        other => {
            return Err(AudioCaptureError::UnsupportedFormat(format!("{:?}", other)));
        }
    };

    Ok((stream, processor))
}
