use sotto_audio::capture::process_block;
use sotto_audio::convert::i16_to_f32;
use sotto_audio::LevelBus;
use sotto_core::{AudioFrame, SourceId};
use tokio::sync::mpsc;

#[test]
fn test_silence_pipeline_end_to_end() {
    // 50 ms of stereo float silence at 44.1 kHz.
    let device_buffer = vec![0.0f32; 2205 * 2];
    let levels = LevelBus::new();
    let level_rx = levels.subscribe(SourceId::System);

    let (samples, level) = process_block(&device_buffer, 2, 44_100).expect("usable buffer");
    levels.publish(SourceId::System, level);

    assert_eq!(samples.len(), 800);
    assert_eq!(*level_rx.borrow(), 0.0);
}

#[test]
fn test_i16_device_buffer_reaches_canonical_form() {
    // A 16-bit stereo device at 48 kHz, both channels at half scale.
    let device_buffer: Vec<i16> = vec![16_384; 480 * 2];
    let floats: Vec<f32> = device_buffer.iter().map(|&s| i16_to_f32(s)).collect();

    let (samples, level) = process_block(&floats, 2, 48_000).expect("usable buffer");
    assert_eq!(samples.len(), 160);
    for s in &samples {
        assert!((s - 0.5).abs() < 1e-3);
    }
    // RMS 0.5 doubled for display, clamped to 1.0 on the bus.
    let levels = LevelBus::new();
    levels.publish(SourceId::Mic, level);
    assert_eq!(*levels.subscribe(SourceId::Mic).borrow(), 1.0);
}

#[tokio::test]
async fn test_frame_order_preserved_through_sink() {
    let (tx, mut rx) = mpsc::channel::<AudioFrame>(16);

    tokio::spawn(async move {
        for i in 0..10u32 {
            let marker = i as f32 / 10.0;
            let frame = AudioFrame {
                source: SourceId::Mic,
                samples: vec![marker; 4],
            };
            if tx.send(frame).await.is_err() {
                break;
            }
        }
    });

    for i in 0..10u32 {
        let frame = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed");
        assert_eq!(frame.source, SourceId::Mic);
        assert!((frame.samples[0] - i as f32 / 10.0).abs() < 1e-6);
    }
}

#[test]
fn test_half_scale_tone_maxes_the_meter() {
    let device_buffer = vec![0.5f32; 2205];
    let (samples, level) = process_block(&device_buffer, 1, 44_100).expect("usable buffer");
    assert_eq!(samples.len(), 800);

    let levels = LevelBus::new();
    levels.publish(SourceId::Mic, level);
    assert!(*levels.subscribe(SourceId::Mic).borrow() >= 0.99);
}
