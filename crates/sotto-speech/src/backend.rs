use async_trait::async_trait;
use sotto_core::{SourceId, SpeechError};
use std::sync::Arc;
use tokio::sync::mpsc;

/// What a live recognition session reports back to its owner.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Final recognized text for the session's source.
    Recognized { source: SourceId, text: String },
    /// The backend tore the session down abnormally (network drop, auth
    /// failure, service error). The owner is expected to reconnect.
    Canceled { source: SourceId, reason: String },
    /// The backend ended the session without an error.
    Stopped { source: SourceId },
}

/// A speech-recognition provider. Implementations wrap one concrete service
/// and mint sessions bound to an event channel.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Create a session for one source without starting it. Events flow to
    /// `events`; audio arrives through [`SpeechSession::write_audio`].
    async fn create_session(
        &self,
        source: SourceId,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Arc<dyn SpeechSession>, SpeechError>;
}

/// One continuous push-style recognition stream.
///
/// `write_audio` takes 16-bit mono 16 kHz little-endian PCM and must be
/// non-blocking; implementations buffer internally. Writes after `stop`
/// are ignored, and `stop` on a never-started session is a no-op.
#[async_trait]
pub trait SpeechSession: Send + Sync {
    async fn start(&self) -> Result<(), SpeechError>;

    fn write_audio(&self, pcm: &[u8]);

    async fn stop(&self) -> Result<(), SpeechError>;
}

pub fn backend_from_config(name: &str) -> Result<Arc<dyn SpeechBackend>, SpeechError> {
    match name {
        "null" => Ok(Arc::new(crate::null_backend::NullBackend::new())),
        other => Err(SpeechError::BackendNotFound(other.to_string())),
    }
}
