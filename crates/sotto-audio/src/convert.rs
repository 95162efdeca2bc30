/// Convert one 16-bit PCM sample to float in [-1, 1).
pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32_768.0
}

/// Downmix an interleaved buffer to mono by averaging each frame's channels.
///
/// Trailing samples that do not fill a whole frame are discarded.
pub fn downmix_to_mono(data: &[f32], channels: u16) -> Vec<f32> {
    if channels == 0 {
        return Vec::new();
    }
    if channels == 1 {
        return data.to_vec();
    }
    let ch = channels as usize;
    let frames = data.len() / ch;
    let mut mono = Vec::with_capacity(frames);
    for frame in 0..frames {
        let start = frame * ch;
        let sum: f32 = data[start..start + ch].iter().sum();
        mono.push(sum / channels as f32);
    }
    mono
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i16_to_f32_scaling() {
        assert_eq!(i16_to_f32(0), 0.0);
        assert_eq!(i16_to_f32(i16::MIN), -1.0);
        assert_eq!(i16_to_f32(16_384), 0.5);
        assert!(i16_to_f32(i16::MAX) < 1.0);
    }

    #[test]
    fn test_downmix_mono_passthrough() {
        let data = vec![0.1, 0.2, 0.3];
        assert_eq!(downmix_to_mono(&data, 1), data);
    }

    #[test]
    fn test_downmix_stereo_averages_frames() {
        let data = vec![0.2, 0.4, -0.6, 0.2];
        let mono = downmix_to_mono(&data, 2);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.3).abs() < 1e-6);
        assert!((mono[1] - (-0.2)).abs() < 1e-6);
    }

    #[test]
    fn test_downmix_four_channels() {
        let data = vec![1.0, 0.0, 0.0, 0.0, 0.4, 0.4, 0.4, 0.4];
        let mono = downmix_to_mono(&data, 4);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.25).abs() < 1e-6);
        assert!((mono[1] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_downmix_discards_partial_frame() {
        let data = vec![0.5, 0.5, 0.5];
        let mono = downmix_to_mono(&data, 2);
        assert_eq!(mono.len(), 1);
    }

    #[test]
    fn test_downmix_zero_channels_is_empty() {
        let data = vec![0.5, 0.5];
        assert!(downmix_to_mono(&data, 0).is_empty());
    }
}
