//! Sample-level edits: silence, truncation and time stretch.

use crate::error::StretchError;
use crate::types::ms_to_samples;

/// Fade applied at a hard truncation point.
pub const TRUNCATE_FADE_MS: f64 = 5.0;

/// Generate silence of given duration. Non-positive durations yield nothing.
pub fn generate_silence(duration_ms: i64, sr: u32) -> Vec<f64> {
    vec![0.0; ms_to_samples(duration_ms, sr)]
}

/// Half-sine fade-out over the last `fade_ms`.
pub fn fade_out(samples: &mut [f64], fade_ms: f64, sr: u32) {
    let fade_len = ((fade_ms / 1000.0 * sr as f64).round() as usize).min(samples.len());
    if fade_len == 0 {
        return;
    }
    let start = samples.len() - fade_len;
    for (i, s) in samples[start..].iter_mut().enumerate() {
        let t = (i + 1) as f64 / fade_len as f64;
        *s *= ((1.0 - t) * std::f64::consts::FRAC_PI_2).sin();
    }
}

/// Keep the first `keep_ms` of audio, fading out the cut.
pub fn truncate(samples: &mut Vec<f64>, keep_ms: i64, sr: u32) {
    let keep = ms_to_samples(keep_ms, sr);
    if keep >= samples.len() {
        return;
    }
    samples.truncate(keep);
    fade_out(samples, TRUNCATE_FADE_MS, sr);
}

/// Drop up to `n` samples from the end. Returns how many were removed.
pub fn trim_tail(samples: &mut Vec<f64>, n: usize) -> usize {
    let removed = n.min(samples.len());
    samples.truncate(samples.len() - removed);
    removed
}

/// Time-stretch by `factor` using Signalsmith Stretch (phase vocoder).
///
/// `factor` > 1.0 = slower (longer), < 1.0 = faster (shorter). Pitch is
/// preserved. Output length is `round(len * factor)`.
pub fn time_stretch(samples: &[f64], sr: u32, factor: f64) -> Result<Vec<f64>, StretchError> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(StretchError::InvalidRatio(factor));
    }
    if samples.is_empty() {
        return Err(StretchError::EmptyBuffer);
    }
    if samples.iter().any(|s| !s.is_finite()) {
        return Err(StretchError::NonFiniteSamples);
    }
    if (factor - 1.0).abs() < 1e-6 {
        return Ok(samples.to_vec());
    }

    let out_len = (samples.len() as f64 * factor).round() as usize;
    if out_len == 0 || out_len > i32::MAX as usize || samples.len() > i32::MAX as usize {
        return Err(StretchError::InvalidRatio(factor));
    }

    let mut stretch = ssstretch::Stretch::new();
    stretch.preset_default(1, sr as f32);

    let input_f32: Vec<f32> = samples.iter().map(|&s| s as f32).collect();
    let in_len = input_f32.len() as i32;
    let mut output_f32 = vec![vec![0.0f32; out_len]; 1];
    stretch.process_vec(&[input_f32], in_len, &mut output_f32, out_len as i32);

    let output: Vec<f64> = output_f32
        .into_iter()
        .next()
        .unwrap_or_default()
        .into_iter()
        .map(|s| s as f64)
        .collect();
    if output.iter().any(|s| !s.is_finite()) {
        return Err(StretchError::Backend("stretch produced non-finite samples".into()));
    }
    Ok(output)
}
