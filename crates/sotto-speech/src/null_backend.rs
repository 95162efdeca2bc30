use crate::backend::{SessionEvent, SpeechBackend, SpeechSession};
use async_trait::async_trait;
use sotto_core::{SourceId, SpeechError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Backend that accepts audio and recognizes nothing. Lets the full
/// pipeline run without credentials and anchors the test scaffolding.
pub struct NullBackend {
    sessions_created: AtomicUsize,
    bytes_fed: Arc<AtomicUsize>,
}

impl NullBackend {
    pub fn new() -> Self {
        Self {
            sessions_created: AtomicUsize::new(0),
            bytes_fed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn sessions_created(&self) -> usize {
        self.sessions_created.load(Ordering::Relaxed)
    }

    /// Total PCM bytes written across all sessions of this backend.
    pub fn bytes_fed(&self) -> usize {
        self.bytes_fed.load(Ordering::Relaxed)
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechBackend for NullBackend {
    fn name(&self) -> &str {
        "null"
    }

    async fn create_session(
        &self,
        source: SourceId,
        _events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Arc<dyn SpeechSession>, SpeechError> {
        self.sessions_created.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(NullSession {
            source,
            bytes_fed: Arc::clone(&self.bytes_fed),
            running: AtomicBool::new(false),
        }))
    }
}

struct NullSession {
    source: SourceId,
    bytes_fed: Arc<AtomicUsize>,
    running: AtomicBool,
}

#[async_trait]
impl SpeechSession for NullSession {
    async fn start(&self) -> Result<(), SpeechError> {
        self.running.store(true, Ordering::Relaxed);
        tracing::debug!(source = %self.source, "null session started");
        Ok(())
    }

    fn write_audio(&self, pcm: &[u8]) {
        if self.running.load(Ordering::Relaxed) {
            self.bytes_fed.fetch_add(pcm.len(), Ordering::Relaxed);
        }
    }

    async fn stop(&self) -> Result<(), SpeechError> {
        self.running.store(false, Ordering::Relaxed);
        Ok(())
    }
}
