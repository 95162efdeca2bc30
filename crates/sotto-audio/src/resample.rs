/// Canonical rate every capture path converts to before recognition.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Gain applied to raw RMS so normal speech fills a 0..1 meter.
const DISPLAY_GAIN: f32 = 2.0;

/// Linear resample of a mono buffer to the canonical 16 kHz rate.
///
/// Output length is `round(len * 16000 / src_rate)`. Equal rates pass the
/// input through unchanged; a zero rate or empty input yields an empty
/// buffer rather than a panic.
pub fn resample_to_target(input: &[f32], src_rate: u32) -> Vec<f32> {
    if src_rate == 0 || input.is_empty() {
        return Vec::new();
    }
    if src_rate == TARGET_SAMPLE_RATE {
        return input.to_vec();
    }

    let out_len =
        (input.len() as f64 * TARGET_SAMPLE_RATE as f64 / src_rate as f64).round() as usize;
    if out_len == 0 {
        return Vec::new();
    }
    if out_len == 1 {
        return vec![input[0]];
    }

    let last = input.len() - 1;
    let ratio = last as f64 / (out_len - 1) as f64;
    let mut output = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let pos = i as f64 * ratio;
        let i0 = pos as usize;
        let i1 = (i0 + 1).min(last);
        let frac = pos - i0 as f64;
        output.push(((1.0 - frac) * input[i0] as f64 + frac * input[i1] as f64) as f32);
    }
    output
}

/// RMS of a buffer scaled for display. Callers clamp before broadcast.
pub fn rms_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let energy: f32 = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    energy.sqrt() * DISPLAY_GAIN
}
