use sotto_core::SourceId;
use std::sync::Arc;
use tokio::sync::watch;

/// Broadcast of per-source meter levels, injected wherever readings are
/// produced or displayed. Values on the wire are always in [0, 1].
#[derive(Clone)]
pub struct LevelBus {
    inner: Arc<Inner>,
}

struct Inner {
    mic: watch::Sender<f32>,
    system: watch::Sender<f32>,
}

impl LevelBus {
    pub fn new() -> Self {
        let (mic, _) = watch::channel(0.0);
        let (system, _) = watch::channel(0.0);
        Self {
            inner: Arc::new(Inner { mic, system }),
        }
    }

    /// Publish a reading, clamped to [0, 1]. Having no subscribers is fine.
    pub fn publish(&self, source: SourceId, level: f32) {
        self.sender(source).send_replace(level.clamp(0.0, 1.0));
    }

    pub fn subscribe(&self, source: SourceId) -> watch::Receiver<f32> {
        self.sender(source).subscribe()
    }

    fn sender(&self, source: SourceId) -> &watch::Sender<f32> {
        match source {
            SourceId::Mic => &self.inner.mic,
            SourceId::System => &self.inner.system,
        }
    }
}

impl Default for LevelBus {
    fn default() -> Self {
        Self::new()
    }
}
