//! Voice pipeline for the Vaani career assistant
//!
//! Records a short spoken question, transcribes it, works out which Indian
//! language it is in and answers in that language.

pub mod audio;
pub mod chat;
pub mod config;
pub mod error;
pub mod language;
pub mod overlay;
pub mod pipeline;
pub mod recording;
pub mod retry;
pub mod transcription;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ErrorKind, VoiceError};
