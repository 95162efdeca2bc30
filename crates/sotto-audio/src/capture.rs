use crate::convert::{downmix_to_mono, i16_to_f32};
use crate::level::LevelBus;
use crate::resample::{resample_to_target, rms_level};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream};
use sotto_core::{AudioError, AudioFrame, SourceId};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

const STATUS_OK: u8 = 0;
const STATUS_ERROR: u8 = 1;

// ── CaptureHandle ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    Ok,
    Error,
}

#[derive(Clone)]
pub struct CaptureHandle {
    status: Arc<AtomicU8>,
    frames_dropped: Arc<AtomicU64>,
    source: SourceId,
}

impl CaptureHandle {
    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn status(&self) -> CaptureStatus {
        match self.status.load(Ordering::Relaxed) {
            STATUS_ERROR => CaptureStatus::Error,
            _ => CaptureStatus::Ok,
        }
    }

    /// Frames discarded because the sink channel was full.
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }
}

// ── CaptureSource ─────────────────────────────────────────────

/// Owns one input endpoint and its cpal stream. `start` negotiates the
/// device's native format and runs the canonicalization pipeline in the
/// driver callback; `stop` releases the stream and leaves the instance
/// reusable. Both are no-ops when already in the requested state.
pub struct CaptureSource {
    source: SourceId,
    device: Device,
    stream: Option<Stream>,
    handle: CaptureHandle,
}

impl CaptureSource {
    pub fn new(source: SourceId, device: Device) -> Self {
        let handle = CaptureHandle {
            status: Arc::new(AtomicU8::new(STATUS_OK)),
            frames_dropped: Arc::new(AtomicU64::new(0)),
            source,
        };
        Self {
            source,
            device,
            stream: None,
            handle,
        }
    }

    pub fn handle(&self) -> CaptureHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    pub fn start(
        &mut self,
        sink: mpsc::Sender<AudioFrame>,
        levels: LevelBus,
    ) -> Result<(), AudioError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let native = self
            .device
            .default_input_config()
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?;
        let src_rate = native.sample_rate().0;
        let channels = native.channels();
        let config = native.config();

        let source = self.source;
        let status = Arc::clone(&self.handle.status);
        let dropped = Arc::clone(&self.handle.frames_dropped);

        let err_callback = move |err: cpal::StreamError| {
            tracing::error!("capture stream error on {}: {}", source, err);
            status.store(STATUS_ERROR, Ordering::Relaxed);
        };

        let stream = match native.sample_format() {
            SampleFormat::F32 => self.device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    forward_block(data, channels, src_rate, source, &sink, &levels, &dropped);
                },
                err_callback,
                None,
            ),
            SampleFormat::I16 => self.device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let floats: Vec<f32> = data.iter().map(|&s| i16_to_f32(s)).collect();
                    forward_block(&floats, channels, src_rate, source, &sink, &levels, &dropped);
                },
                err_callback,
                None,
            ),
            other => {
                return Err(AudioError::UnsupportedFormat(format!(
                    "{:?} on {}",
                    other, self.source
                )));
            }
        }
        .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

        stream.play().map_err(|e| AudioError::StreamBuild(e.to_string()))?;
        tracing::info!(
            source = %self.source,
            rate = src_rate,
            channels,
            "capture started",
        );
        self.stream = Some(stream);
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            tracing::info!(source = %self.source, "capture stopped");
        }
    }
}

/// Pure canonicalization step: interleaved device samples in, mono 16 kHz
/// samples plus an unclamped level reading out. `None` means the buffer had
/// nothing usable and the frame is dropped.
pub fn process_block(data: &[f32], channels: u16, src_rate: u32) -> Option<(Vec<f32>, f32)> {
    if data.is_empty() || channels == 0 {
        return None;
    }
    let mono = downmix_to_mono(data, channels);
    let canonical = resample_to_target(&mono, src_rate);
    if canonical.is_empty() {
        return None;
    }
    let level = rms_level(&canonical);
    Some((canonical, level))
}

// One level reading per hardware buffer; a full sink drops the frame and
// bumps the counter instead of blocking the driver thread.
fn forward_block(
    data: &[f32],
    channels: u16,
    src_rate: u32,
    source: SourceId,
    sink: &mpsc::Sender<AudioFrame>,
    levels: &LevelBus,
    dropped: &AtomicU64,
) {
    match process_block(data, channels, src_rate) {
        Some((samples, level)) => {
            if sink.try_send(AudioFrame { source, samples }).is_err() {
                dropped.fetch_add(1, Ordering::Relaxed);
            }
            levels.publish(source, level);
        }
        None => levels.publish(source, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_handle(source: SourceId) -> CaptureHandle {
        CaptureHandle {
            status: Arc::new(AtomicU8::new(STATUS_OK)),
            frames_dropped: Arc::new(AtomicU64::new(0)),
            source,
        }
    }

    #[test]
    fn test_process_block_silence_scenario() {
        // 50 ms of stereo silence at 44.1 kHz: 2205 frames interleaved.
        let data = vec![0.0f32; 2205 * 2];
        let (samples, level) = process_block(&data, 2, 44_100).unwrap();
        assert_eq!(samples.len(), 800);
        assert_eq!(level, 0.0);
    }

    #[test]
    fn test_process_block_identity_rate_passthrough() {
        let data = vec![0.25f32; 160];
        let (samples, level) = process_block(&data, 1, 16_000).unwrap();
        assert_eq!(samples, data);
        assert!((level - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_process_block_empty_buffer_dropped() {
        assert!(process_block(&[], 2, 44_100).is_none());
    }

    #[test]
    fn test_process_block_zero_channels_dropped() {
        assert!(process_block(&[0.1, 0.2], 0, 44_100).is_none());
    }

    #[test]
    fn test_process_block_sub_sample_buffer_dropped() {
        // One frame at 44.1 kHz rounds to zero canonical samples.
        assert!(process_block(&[0.5, 0.5], 2, 44_100).is_none());
    }

    #[test]
    fn test_process_block_matches_i16_conversion() {
        let ints: Vec<i16> = vec![8_192, -8_192, 16_384, -16_384];
        let floats: Vec<f32> = ints.iter().map(|&s| i16_to_f32(s)).collect();
        let (samples, _) = process_block(&floats, 1, 16_000).unwrap();
        assert_eq!(samples, vec![0.25, -0.25, 0.5, -0.5]);
    }

    #[test]
    fn test_forward_block_full_sink_counts_drop() {
        let (tx, mut rx) = mpsc::channel::<AudioFrame>(1);
        let levels = LevelBus::new();
        let handle = make_handle(SourceId::Mic);

        let data = vec![0.1f32; 160];
        forward_block(&data, 1, 16_000, SourceId::Mic, &tx, &levels, &handle.frames_dropped);
        forward_block(&data, 1, 16_000, SourceId::Mic, &tx, &levels, &handle.frames_dropped);

        assert_eq!(handle.frames_dropped(), 1);
        let frame = rx.try_recv().unwrap();
        assert_eq!(frame.samples.len(), 160);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_forward_block_failure_publishes_zero_level() {
        let (tx, mut rx) = mpsc::channel::<AudioFrame>(4);
        let levels = LevelBus::new();
        let level_rx = levels.subscribe(SourceId::System);
        let handle = make_handle(SourceId::System);

        // Non-zero so a (wrong) successful publish would be visible.
        levels.publish(SourceId::System, 0.7);
        forward_block(&[], 2, 44_100, SourceId::System, &tx, &levels, &handle.frames_dropped);

        assert_eq!(*level_rx.borrow(), 0.0);
        assert!(rx.try_recv().is_err());
        assert_eq!(handle.frames_dropped(), 0);
    }

    #[test]
    fn test_forward_block_publishes_clamped_level() {
        let (tx, _rx) = mpsc::channel::<AudioFrame>(4);
        let levels = LevelBus::new();
        let level_rx = levels.subscribe(SourceId::Mic);
        let handle = make_handle(SourceId::Mic);

        // Full-scale input: raw reading exceeds 1.0, wire value must not.
        let data = vec![1.0f32; 160];
        forward_block(&data, 1, 16_000, SourceId::Mic, &tx, &levels, &handle.frames_dropped);
        assert_eq!(*level_rx.borrow(), 1.0);
    }

    #[test]
    fn test_capture_handle_clone_shares_state() {
        let h1 = make_handle(SourceId::Mic);
        let h2 = h1.clone();
        h1.frames_dropped.fetch_add(3, Ordering::Relaxed);
        h1.status.store(STATUS_ERROR, Ordering::Relaxed);
        assert_eq!(h2.frames_dropped(), 3);
        assert_eq!(h2.status(), CaptureStatus::Error);
        assert_eq!(h2.source(), SourceId::Mic);
    }

    #[test]
    fn test_capture_handle_default_status_ok() {
        let handle = make_handle(SourceId::System);
        assert_eq!(handle.status(), CaptureStatus::Ok);
        assert_eq!(handle.frames_dropped(), 0);
    }
}
