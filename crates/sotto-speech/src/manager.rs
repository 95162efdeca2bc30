use crate::backend::{SessionEvent, SpeechBackend, SpeechSession};
use crate::create_pcm_ring;
use ringbuf::traits::{Consumer, Producer};
use ringbuf::{HeapCons, HeapProd};
use sotto_core::config::SpeechConfig;
use sotto_core::{SourceId, SpeechError, TranscriptEvent};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// ── SessionTiming ─────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SessionTiming {
    /// Delay after stopping a session before replacing it, letting
    /// in-flight recognition callbacks drain.
    pub settle: Duration,
    /// Upper bound on waiting for a session stop during disposal.
    pub stop_timeout: Duration,
    /// How often the pump drains buffered PCM into the live session.
    pub pump_interval: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(100),
            stop_timeout: Duration::from_secs(5),
            pump_interval: Duration::from_millis(10),
        }
    }
}

impl From<&SpeechConfig> for SessionTiming {
    fn from(cfg: &SpeechConfig) -> Self {
        Self {
            settle: Duration::from_millis(cfg.settle_ms),
            stop_timeout: Duration::from_secs(cfg.stop_timeout_secs),
            pump_interval: Duration::from_millis(cfg.pump_interval_ms),
        }
    }
}

// ── SessionManager ────────────────────────────────────────────

struct Lane {
    source: SourceId,
    producer: Mutex<HeapProd<u8>>,
    slot: Mutex<Option<Arc<dyn SpeechSession>>>,
    epoch: AtomicU64,
}

struct Inner {
    backend: Arc<dyn SpeechBackend>,
    timing: SessionTiming,
    disposed: AtomicBool,
    mic: Lane,
    system: Lane,
}

impl Inner {
    fn lane(&self, source: SourceId) -> &Lane {
        match source {
            SourceId::Mic => &self.mic,
            SourceId::System => &self.system,
        }
    }
}

/// Cheap clonable handle for feeding canonical audio into the manager.
#[derive(Clone)]
pub struct PushHandle {
    inner: Arc<Inner>,
}

impl PushHandle {
    pub fn push_audio(&self, source: SourceId, samples: &[f32]) {
        push_audio_inner(&self.inner, source, samples);
    }
}

/// Owns one recognition session per source over a shared push buffer, and
/// recreates sessions when the backend cancels or ends them.
///
/// Audio path: `push_audio` encodes samples to 16-bit PCM and appends to a
/// per-source ring; a pump task drains the ring into whichever session is
/// currently installed. Recognized text comes out of the transcript
/// receiver in per-source order. After `dispose` every entry point becomes
/// a silent no-op.
pub struct SessionManager {
    inner: Arc<Inner>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    transcript_tx: mpsc::UnboundedSender<TranscriptEvent>,
    transcript_rx: Option<mpsc::UnboundedReceiver<TranscriptEvent>>,
    mic_cons: Option<HeapCons<u8>>,
    system_cons: Option<HeapCons<u8>>,
    tasks: Vec<JoinHandle<()>>,
}

impl SessionManager {
    /// `pcm_capacity` is the byte size of each per-source push buffer.
    pub fn new(backend: Arc<dyn SpeechBackend>, timing: SessionTiming, pcm_capacity: usize) -> Self {
        let (mic_prod, mic_cons) = create_pcm_ring(pcm_capacity);
        let (system_prod, system_cons) = create_pcm_ring(pcm_capacity);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (transcript_tx, transcript_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(Inner {
            backend,
            timing,
            disposed: AtomicBool::new(false),
            mic: Lane {
                source: SourceId::Mic,
                producer: Mutex::new(mic_prod),
                slot: Mutex::new(None),
                epoch: AtomicU64::new(0),
            },
            system: Lane {
                source: SourceId::System,
                producer: Mutex::new(system_prod),
                slot: Mutex::new(None),
                epoch: AtomicU64::new(0),
            },
        });

        Self {
            inner,
            events_tx,
            events_rx: Some(events_rx),
            transcript_tx,
            transcript_rx: Some(transcript_rx),
            mic_cons: Some(mic_cons),
            system_cons: Some(system_cons),
            tasks: Vec::new(),
        }
    }

    pub fn take_transcript_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<TranscriptEvent>> {
        self.transcript_rx.take()
    }

    pub fn push_handle(&self) -> PushHandle {
        PushHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn push_audio(&self, source: SourceId, samples: &[f32]) {
        push_audio_inner(&self.inner, source, samples);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Create and start one session per source, then spawn the pump and
    /// event tasks. No-op when already started.
    pub async fn start(&mut self) -> Result<(), SpeechError> {
        if !self.tasks.is_empty() {
            return Ok(());
        }

        for source in [SourceId::Mic, SourceId::System] {
            let session = self
                .inner
                .backend
                .create_session(source, self.events_tx.clone())
                .await?;
            {
                let lane = self.inner.lane(source);
                if let Ok(mut slot) = lane.slot.lock() {
                    *slot = Some(Arc::clone(&session));
                    lane.epoch.fetch_add(1, Ordering::SeqCst);
                }
            }
            session.start().await?;
            tracing::info!(source = %source, "speech session started");
        }

        if let Some(cons) = self.mic_cons.take() {
            self.tasks
                .push(spawn_pump(Arc::clone(&self.inner), SourceId::Mic, cons));
        }
        if let Some(cons) = self.system_cons.take() {
            self.tasks
                .push(spawn_pump(Arc::clone(&self.inner), SourceId::System, cons));
        }
        if let Some(events_rx) = self.events_rx.take() {
            self.tasks.push(spawn_event_task(
                Arc::clone(&self.inner),
                events_rx,
                self.events_tx.clone(),
                self.transcript_tx.clone(),
            ));
        }
        Ok(())
    }

    /// Stop both sessions and tear the tasks down. Idempotent; every await
    /// is bounded so disposal cannot hang on a wedged backend.
    pub async fn dispose(&mut self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        for source in [SourceId::Mic, SourceId::System] {
            let lane = self.inner.lane(source);
            let session = lane.slot.lock().ok().and_then(|mut slot| slot.take());
            if let Some(session) = session {
                match tokio::time::timeout(self.inner.timing.stop_timeout, session.stop()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::warn!(source = %source, "session stop failed: {e}");
                    }
                    Err(_) => {
                        tracing::warn!(source = %source, "session stop timed out");
                    }
                }
            }
        }

        // Let in-flight callbacks drain before abandoning the tasks.
        tokio::time::sleep(self.inner.timing.settle).await;

        let tasks = std::mem::take(&mut self.tasks);
        for task in tasks {
            task.abort();
            let _ = task.await;
        }
        tracing::info!("session manager disposed");
    }
}

fn push_audio_inner(inner: &Arc<Inner>, source: SourceId, samples: &[f32]) {
    if inner.disposed.load(Ordering::SeqCst) {
        return;
    }
    let bytes = encode_pcm16(samples);
    let lane = inner.lane(source);
    if let Ok(mut producer) = lane.producer.lock() {
        // Push what fits; overflow is silently dropped
        producer.push_slice(&bytes);
    }
}

/// Clamp to [-1, 1] and encode as 16-bit little-endian PCM.
fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let value = (s.clamp(-1.0, 1.0) * 32_767.0) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn spawn_pump(inner: Arc<Inner>, source: SourceId, mut consumer: HeapCons<u8>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(inner.timing.pump_interval);
        let mut buf = vec![0u8; 4096];
        loop {
            interval.tick().await;
            if inner.disposed.load(Ordering::SeqCst) {
                break;
            }
            // Without an installed session the ring keeps buffering, so a
            // reconnect window loses nothing the ring can still hold.
            let session = {
                let lane = inner.lane(source);
                lane.slot.lock().ok().and_then(|slot| slot.as_ref().cloned())
            };
            let Some(session) = session else {
                continue;
            };
            loop {
                let n = consumer.pop_slice(&mut buf);
                if n == 0 {
                    break;
                }
                session.write_audio(&buf[..n]);
            }
        }
    })
}

fn spawn_event_task(
    inner: Arc<Inner>,
    mut events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    transcript_tx: mpsc::UnboundedSender<TranscriptEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            if inner.disposed.load(Ordering::SeqCst) {
                break;
            }
            match event {
                SessionEvent::Recognized { source, text } => {
                    if text.trim().is_empty() {
                        continue;
                    }
                    let _ = transcript_tx.send(TranscriptEvent { source, text });
                }
                SessionEvent::Canceled { source, reason } => {
                    tracing::warn!(source = %source, "session canceled: {reason}");
                    reconnect_lane(&inner, source, &events_tx).await;
                }
                SessionEvent::Stopped { source } => {
                    tracing::info!(source = %source, "session stopped by backend");
                    reconnect_lane(&inner, source, &events_tx).await;
                }
            }
        }
    })
}

/// Replace one lane's session. The old handle is pulled out of the slot
/// first, so the pump buffers into the ring for the whole window instead of
/// writing to a dead session. Stop errors are ignored; after a settle
/// interval a replacement is installed and started unless the manager was
/// disposed or another reconnect won the race in the meantime.
async fn reconnect_lane(
    inner: &Arc<Inner>,
    source: SourceId,
    events: &mpsc::UnboundedSender<SessionEvent>,
) {
    if inner.disposed.load(Ordering::SeqCst) {
        return;
    }
    let lane = inner.lane(source);
    let snapshot = lane.epoch.load(Ordering::SeqCst);

    let current = lane.slot.lock().ok().and_then(|mut slot| slot.take());
    if let Some(session) = current {
        let _ = session.stop().await;
    }

    tokio::time::sleep(inner.timing.settle).await;

    let replacement = match inner.backend.create_session(source, events.clone()).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(source = %source, "failed to create replacement session: {e}");
            return;
        }
    };

    let installed = {
        let Ok(mut slot) = lane.slot.lock() else {
            return;
        };
        if inner.disposed.load(Ordering::SeqCst)
            || lane.epoch.load(Ordering::SeqCst) != snapshot
        {
            None
        } else {
            *slot = Some(Arc::clone(&replacement));
            lane.epoch.fetch_add(1, Ordering::SeqCst);
            Some(replacement)
        }
    };

    match installed {
        Some(session) => {
            if let Err(e) = session.start().await {
                tracing::error!(source = %source, "failed to start replacement session: {e}");
                return;
            }
            tracing::info!(source = %source, "session reconnected");
        }
        None => {
            // Disposed or raced by another reconnect; the fresh session was
            // never started and is simply dropped.
            tracing::debug!(source = %source, "reconnect abandoned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ringbuf::traits::Observer;
    use std::sync::atomic::AtomicUsize;

    struct CountingBackend {
        created: AtomicUsize,
    }

    impl CountingBackend {
        fn new() -> Self {
            Self {
                created: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SpeechBackend for CountingBackend {
        fn name(&self) -> &str {
            "counting"
        }

        async fn create_session(
            &self,
            source: SourceId,
            _events: mpsc::UnboundedSender<SessionEvent>,
        ) -> Result<Arc<dyn SpeechSession>, SpeechError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(CountingSession { source }))
        }
    }

    struct CountingSession {
        #[allow(dead_code)]
        source: SourceId,
    }

    #[async_trait]
    impl SpeechSession for CountingSession {
        async fn start(&self) -> Result<(), SpeechError> {
            Ok(())
        }

        fn write_audio(&self, _pcm: &[u8]) {}

        async fn stop(&self) -> Result<(), SpeechError> {
            Ok(())
        }
    }

    fn fast_timing() -> SessionTiming {
        SessionTiming {
            settle: Duration::from_millis(5),
            stop_timeout: Duration::from_millis(100),
            pump_interval: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_encode_pcm16_scaling_and_byte_order() {
        let bytes = encode_pcm16(&[0.0, 1.0, -1.0]);
        assert_eq!(bytes.len(), 6);
        assert_eq!(&bytes[0..2], &0i16.to_le_bytes());
        assert_eq!(&bytes[2..4], &32_767i16.to_le_bytes());
        assert_eq!(&bytes[4..6], &(-32_767i16).to_le_bytes());
    }

    #[test]
    fn test_encode_pcm16_clamps_out_of_range() {
        let bytes = encode_pcm16(&[2.0, -2.0]);
        assert_eq!(&bytes[0..2], &32_767i16.to_le_bytes());
        assert_eq!(&bytes[2..4], &(-32_767i16).to_le_bytes());
    }

    #[test]
    fn test_encode_pcm16_half_scale() {
        let bytes = encode_pcm16(&[0.5]);
        assert_eq!(&bytes[0..2], &16_383i16.to_le_bytes());
    }

    #[tokio::test]
    async fn test_push_audio_buffers_before_start() {
        let backend: Arc<dyn SpeechBackend> = Arc::new(CountingBackend::new());
        let manager = SessionManager::new(backend, fast_timing(), 1024);
        manager.push_audio(SourceId::Mic, &[0.1; 100]);
        let occupied = manager.inner.mic.producer.lock().unwrap().occupied_len();
        assert_eq!(occupied, 200);
    }

    #[tokio::test]
    async fn test_push_audio_after_dispose_is_ignored() {
        let backend: Arc<dyn SpeechBackend> = Arc::new(CountingBackend::new());
        let mut manager = SessionManager::new(backend, fast_timing(), 1024);
        manager.dispose().await;
        manager.push_audio(SourceId::Mic, &[0.1; 100]);
        let occupied = manager.inner.mic.producer.lock().unwrap().occupied_len();
        assert_eq!(occupied, 0);
    }

    #[tokio::test]
    async fn test_push_overflow_silently_dropped() {
        let backend: Arc<dyn SpeechBackend> = Arc::new(CountingBackend::new());
        let manager = SessionManager::new(backend, fast_timing(), 64);
        manager.push_audio(SourceId::System, &[0.1; 100]);
        let occupied = manager.inner.system.producer.lock().unwrap().occupied_len();
        assert_eq!(occupied, 64);
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent() {
        let backend: Arc<dyn SpeechBackend> = Arc::new(CountingBackend::new());
        let mut manager = SessionManager::new(backend, fast_timing(), 1024);
        manager.start().await.unwrap();
        manager.dispose().await;
        assert!(manager.is_disposed());
        // Second call must return immediately without touching anything.
        tokio::time::timeout(Duration::from_secs(2), manager.dispose())
            .await
            .expect("second dispose hung");
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let backend = Arc::new(CountingBackend::new());
        let mut manager =
            SessionManager::new(Arc::clone(&backend) as Arc<dyn SpeechBackend>, fast_timing(), 1024);
        manager.start().await.unwrap();
        manager.start().await.unwrap();
        assert_eq!(backend.created.load(Ordering::SeqCst), 2);
        manager.dispose().await;
    }

    #[tokio::test]
    async fn test_concurrent_reconnects_install_exactly_once() {
        let backend = Arc::new(CountingBackend::new());
        let manager =
            SessionManager::new(Arc::clone(&backend) as Arc<dyn SpeechBackend>, fast_timing(), 1024);
        let (events_tx, _events_rx) = mpsc::unbounded_channel();

        let inner = Arc::clone(&manager.inner);
        let epoch_before = inner.mic.epoch.load(Ordering::SeqCst);

        tokio::join!(
            reconnect_lane(&inner, SourceId::Mic, &events_tx),
            reconnect_lane(&inner, SourceId::Mic, &events_tx),
        );

        // Both built a replacement, but only one may install it.
        assert_eq!(backend.created.load(Ordering::SeqCst), 2);
        assert_eq!(inner.mic.epoch.load(Ordering::SeqCst), epoch_before + 1);
        assert!(inner.mic.slot.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reconnect_after_dispose_does_not_install() {
        let backend = Arc::new(CountingBackend::new());
        let mut manager =
            SessionManager::new(Arc::clone(&backend) as Arc<dyn SpeechBackend>, fast_timing(), 1024);
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let inner = Arc::clone(&manager.inner);

        manager.dispose().await;
        reconnect_lane(&inner, SourceId::System, &events_tx).await;

        assert_eq!(backend.created.load(Ordering::SeqCst), 0);
        assert!(inner.system.slot.lock().unwrap().is_none());
    }

    #[test]
    fn test_session_timing_from_config() {
        let cfg = SpeechConfig {
            backend: "null".to_string(),
            settle_ms: 250,
            stop_timeout_secs: 3,
            pump_interval_ms: 20,
        };
        let timing = SessionTiming::from(&cfg);
        assert_eq!(timing.settle, Duration::from_millis(250));
        assert_eq!(timing.stop_timeout, Duration::from_secs(3));
        assert_eq!(timing.pump_interval, Duration::from_millis(20));
    }
}
