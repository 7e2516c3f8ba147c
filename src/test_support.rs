//! In-memory microphone for tests

use crate::audio::{AudioCaptureError, AudioFormat, CaptureStream, Microphone};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Microphone that "records" a fixed byte string
#[derive(Clone)]
pub(crate) struct FakeMicrophone {
    pub(crate) grant_permission: bool,
    pub(crate) supported: Vec<&'static str>,
    pub(crate) captured: Vec<u8>,
    /// When set, `request_permission` waits until notified
    pub(crate) permission_gate: Option<Arc<Notify>>,
    /// When set, `finish` waits until notified
    pub(crate) finish_gate: Option<Arc<Notify>>,
    open_streams: Arc<AtomicUsize>,
    permission_requests: Arc<AtomicUsize>,
}

impl FakeMicrophone {
    pub(crate) fn new() -> Self {
        Self {
            grant_permission: true,
            supported: vec!["audio/wav"],
            captured: b"RIFF-fake-wav-data".to_vec(),
            permission_gate: None,
            finish_gate: None,
            open_streams: Arc::new(AtomicUsize::new(0)),
            permission_requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of captures currently holding the microphone
    pub(crate) fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    pub(crate) fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Microphone for FakeMicrophone {
    async fn request_permission(&self) -> Result<bool, AudioCaptureError> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(ref gate) = self.permission_gate {
            gate.notified().await;
        }
        Ok(self.grant_permission)
    }

    fn supported_mime_types(&self) -> Vec<&'static str> {
        self.supported.clone()
    }

    async fn start(&self, _format: AudioFormat) -> Result<Box<dyn CaptureStream>, AudioCaptureError> {
        self.open_streams.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeCapture {
            captured: self.captured.clone(),
            finish_gate: self.finish_gate.clone(),
            open_streams: self.open_streams.clone(),
        }))
    }
}

struct FakeCapture {
    captured: Vec<u8>,
    finish_gate: Option<Arc<Notify>>,
    open_streams: Arc<AtomicUsize>,
}

#[async_trait]
impl CaptureStream for FakeCapture {
    async fn finish(self: Box<Self>) -> Result<Vec<u8>, AudioCaptureError> {
        if let Some(ref gate) = self.finish_gate {
            gate.notified().await;
        }
        self.open_streams.fetch_sub(1, Ordering::SeqCst);
        Ok(self.captured)
    }

    async fn discard(self: Box<Self>) {
        self.open_streams.fetch_sub(1, Ordering::SeqCst);
    }
}
