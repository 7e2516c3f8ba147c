//! Audio resampling and sample processing

use super::types::AudioChunk;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Chunk size in samples (0.1 seconds of audio at 16kHz = 1600 samples)
pub(crate) const CHUNK_SIZE: usize = 1600;

/// Converts device frames into mono chunks at the target sample rate
///
/// Owned by the capture thread; the stream callback feeds it and the thread
/// flushes it once the stream is dropped.
pub(crate) struct SampleProcessor {
    channels: usize,
    target_sample_rate: u32,
    resampler: Option<SincFixedIn<f32>>,
    input_chunk_size: usize,
    input_buffer: Vec<i16>,
    output_buffer: Vec<i16>,
    sender: mpsc::Sender<AudioChunk>,
}

impl SampleProcessor {
    pub(crate) fn new(
        device_sample_rate: u32,
        target_sample_rate: u32,
        channels: usize,
        sender: mpsc::Sender<AudioChunk>,
    ) -> Self {
        let (resampler, input_chunk_size) = if device_sample_rate != target_sample_rate {
            build_resampler(device_sample_rate, target_sample_rate)
        } else {
            (None, CHUNK_SIZE)
        };

        Self {
            channels: channels.max(1),
            target_sample_rate,
            resampler,
            input_chunk_size,
            input_buffer: Vec::with_capacity(input_chunk_size * 2),
            output_buffer: Vec::with_capacity(CHUNK_SIZE * 2),
            sender,
        }
    }

    /// Process incoming interleaved samples: downmix, optionally resample, chunk and send
    pub(crate) fn process(&mut self, data: &[i16]) {
        let mono = downmix(data, self.channels);

        if self.resampler.is_some() {
            self.input_buffer.extend(mono);
            while self.input_buffer.len() >= self.input_chunk_size {
                let block: Vec<i16> = self.input_buffer.drain(..self.input_chunk_size).collect();
                self.resample_block(&block);
            }
        } else {
            self.output_buffer.extend(mono);
        }

        self.send_full_chunks();
    }

    /// Send whatever is left in the output buffer as a final short chunk
    ///
    /// Input that has not filled a whole resampler block is dropped (under
    /// one chunk of audio).
    pub(crate) fn flush(&mut self) {
        self.send_full_chunks();
        if !self.output_buffer.is_empty() {
            let rest = std::mem::take(&mut self.output_buffer);
            self.send(rest);
        }
    }

    fn resample_block(&mut self, block: &[i16]) {
        let Some(resampler) = self.resampler.as_mut() else {
            return;
        };

        // Convert i16 to f32 for resampling
        let input_f32: Vec<f32> = block.iter().map(|&s| s as f32 / 32768.0).collect();

        match resampler.process(&[input_f32], None) {
            Ok(resampled) => {
                self.output_buffer.extend(
                    resampled[0]
                        .iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16),
                );
            }
            Err(e) => {
                error!("Resampling error: {}", e);
            }
        }
    }

    fn send_full_chunks(&mut self) {
        while self.output_buffer.len() >= CHUNK_SIZE {
            let chunk: Vec<i16> = self.output_buffer.drain(..CHUNK_SIZE).collect();
            if !self.send(chunk) {
                return;
            }
        }
    }

    fn send(&self, samples: Vec<i16>) -> bool {
        let audio_chunk = AudioChunk {
            samples,
            sample_rate: self.target_sample_rate,
        };
        // Use try_send to avoid blocking the audio callback
        match self.sender.try_send(audio_chunk) {
            Ok(_) => true,
            Err(e) => {
                warn!("Audio buffer overflow - chunk dropped: {}", e);
                false
            }
        }
    }
}

/// Average interleaved frames down to a single channel
pub(crate) fn downmix(data: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / frame.len() as i32) as i16
        })
        .collect()
}

fn build_resampler(
    device_sample_rate: u32,
    target_sample_rate: u32,
) -> (Option<SincFixedIn<f32>>, usize) {
    info!(
        "Creating resampler: {} Hz -> {} Hz",
        device_sample_rate, target_sample_rate
    );
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    // Input block size that yields roughly one output chunk per block
    let input_frames = (CHUNK_SIZE as f64 * device_sample_rate as f64
        / target_sample_rate as f64)
        .ceil() as usize;

    match SincFixedIn::<f32>::new(
        target_sample_rate as f64 / device_sample_rate as f64,
        2.0,
        params,
        input_frames,
        1, // mono
    ) {
        Ok(resampler) => (Some(resampler), input_frames),
        Err(e) => {
            error!("Failed to create resampler: {}", e);
            (None, CHUNK_SIZE)
        }
    }
}
