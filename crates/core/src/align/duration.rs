//! Reconciling synthesized duration with the subtitle window.
//!
//! The decision is pure; applying it may call the time-stretch primitive,
//! whose failure falls back to padding or trimming.

use serde::{Deserialize, Serialize};

use crate::audio::effects::{time_stretch, truncate};
use crate::error::StretchError;
use crate::types::AudioBuffer;

pub const DEFAULT_TOLERANCE_MS: i64 = 150;

/// Allowed range of `target / current` for pitch-preserving stretch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StretchBounds {
    pub min_ratio: f64,
    pub max_ratio: f64,
}

impl StretchBounds {
    /// ±5%: inaudible in practice.
    pub const CONSERVATIVE: StretchBounds = StretchBounds {
        min_ratio: 0.95,
        max_ratio: 1.05,
    };

    /// 0.80–1.25: noticeable on close listening.
    pub const LOOSE: StretchBounds = StretchBounds {
        min_ratio: 0.80,
        max_ratio: 1.25,
    };

    pub fn contains(&self, ratio: f64) -> bool {
        ratio >= self.min_ratio && ratio <= self.max_ratio
    }
}

/// What to do with a synthesized segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "UPPERCASE")]
pub enum AlignDecision {
    /// Leave the audio as is
    None,
    /// Append this many ms of silence
    Pad(i64),
    /// Cut this many ms from the end
    Trim(i64),
    /// Time-stretch by target/current
    Stretch(f64),
}

/// Choose how to fit `current_ms` of audio into `target_ms`.
///
/// `stretch` is `None` when stretching is disabled or no stretcher is
/// available.
pub fn decide_alignment(
    current_ms: i64,
    target_ms: i64,
    tolerance_ms: i64,
    stretch: Option<StretchBounds>,
) -> AlignDecision {
    if target_ms <= 0 || current_ms <= 0 {
        return AlignDecision::None;
    }

    let diff = target_ms - current_ms;
    if diff.abs() <= tolerance_ms {
        return AlignDecision::None;
    }

    let ratio = target_ms as f64 / current_ms as f64;
    if let Some(bounds) = stretch {
        if bounds.contains(ratio) {
            return AlignDecision::Stretch(ratio);
        }
    }

    pad_or_trim(diff)
}

fn pad_or_trim(diff_ms: i64) -> AlignDecision {
    if diff_ms > 0 {
        AlignDecision::Pad(diff_ms)
    } else {
        AlignDecision::Trim(-diff_ms)
    }
}

/// Pitch-preserving time stretch.
pub trait TimeStretcher: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Whether the primitive can be used at all.
    fn is_available(&self) -> bool;

    /// Stretch `audio` so its duration is multiplied by `ratio`.
    fn stretch(&self, audio: &AudioBuffer, ratio: f64) -> Result<AudioBuffer, StretchError>;
}

/// Signalsmith Stretch phase vocoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalsmithStretcher;

impl TimeStretcher for SignalsmithStretcher {
    fn name(&self) -> &str {
        "signalsmith"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn stretch(&self, audio: &AudioBuffer, ratio: f64) -> Result<AudioBuffer, StretchError> {
        let samples = time_stretch(&audio.samples, audio.sample_rate, ratio)?;
        Ok(AudioBuffer::new(samples, audio.sample_rate))
    }
}

/// Stretcher that is never available; forces pad/trim.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStretcher;

impl TimeStretcher for NoStretcher {
    fn name(&self) -> &str {
        "none"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn stretch(&self, _audio: &AudioBuffer, ratio: f64) -> Result<AudioBuffer, StretchError> {
        Err(StretchError::Backend(format!("no stretcher available (ratio {:.3})", ratio)))
    }
}

/// Result of aligning one segment.
#[derive(Debug, Clone)]
pub struct AlignOutcome {
    pub audio: AudioBuffer,
    /// Decision actually applied (the fallback when stretching failed)
    pub decision: AlignDecision,
    /// Set when a stretch was attempted and failed
    pub fallback: Option<StretchError>,
}

/// Fit `audio` into `target_ms`.
///
/// A failed stretch is never propagated: the audio is padded or trimmed
/// instead and the error is returned in `fallback`.
pub fn align_duration(
    audio: AudioBuffer,
    target_ms: i64,
    tolerance_ms: i64,
    bounds: Option<StretchBounds>,
    stretcher: &dyn TimeStretcher,
) -> AlignOutcome {
    let current_ms = audio.duration_ms();
    let bounds = bounds.filter(|_| stretcher.is_available());
    let decision = decide_alignment(current_ms, target_ms, tolerance_ms, bounds);

    match decision {
        AlignDecision::None => AlignOutcome {
            audio,
            decision,
            fallback: None,
        },
        AlignDecision::Pad(_) | AlignDecision::Trim(_) => AlignOutcome {
            audio: pad_or_trim_to(audio, target_ms),
            decision,
            fallback: None,
        },
        AlignDecision::Stretch(ratio) => match stretcher.stretch(&audio, ratio) {
            Ok(stretched) => {
                log::debug!(
                    "Stretched {}ms -> {}ms (ratio {:.3})",
                    current_ms,
                    stretched.duration_ms(),
                    ratio
                );
                AlignOutcome {
                    audio: stretched,
                    decision,
                    fallback: None,
                }
            }
            Err(e) => {
                log::warn!(
                    "Time stretch via {} failed ({}), falling back to pad/trim",
                    stretcher.name(),
                    e
                );
                AlignOutcome {
                    audio: pad_or_trim_to(audio, target_ms),
                    decision: pad_or_trim(target_ms - current_ms),
                    fallback: Some(e),
                }
            }
        },
    }
}

/// Pad with silence or cut so the buffer is exactly `target_ms` long.
fn pad_or_trim_to(mut audio: AudioBuffer, target_ms: i64) -> AudioBuffer {
    let target_len = audio.samples_for_ms(target_ms);
    let sr = audio.sample_rate;
    if audio.len() < target_len {
        audio.samples.resize(target_len, 0.0);
    } else if audio.len() > target_len {
        truncate(&mut audio.samples, target_ms, sr);
    }
    audio
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 24000;

    fn tone_ms(ms: i64) -> AudioBuffer {
        let n = crate::types::ms_to_samples(ms, SR);
        AudioBuffer::new(
            (0..n)
                .map(|i| (2.0 * std::f64::consts::PI * 200.0 * i as f64 / SR as f64).sin() * 0.3)
                .collect(),
            SR,
        )
    }

    struct FailingStretcher;

    impl TimeStretcher for FailingStretcher {
        fn name(&self) -> &str {
            "failing"
        }
        fn is_available(&self) -> bool {
            true
        }
        fn stretch(&self, _audio: &AudioBuffer, _ratio: f64) -> Result<AudioBuffer, StretchError> {
            Err(StretchError::Backend("boom".into()))
        }
    }

    /// Resamples by repeating/dropping samples; exact lengths for tests.
    struct NaiveStretcher;

    impl TimeStretcher for NaiveStretcher {
        fn name(&self) -> &str {
            "naive"
        }
        fn is_available(&self) -> bool {
            true
        }
        fn stretch(&self, audio: &AudioBuffer, ratio: f64) -> Result<AudioBuffer, StretchError> {
            let out_len = (audio.len() as f64 * ratio).round() as usize;
            let samples = (0..out_len)
                .map(|i| audio.samples[((i as f64 / ratio) as usize).min(audio.len() - 1)])
                .collect();
            Ok(AudioBuffer::new(samples, audio.sample_rate))
        }
    }

    #[test]
    fn test_decide_equal_is_none() {
        assert_eq!(decide_alignment(1000, 1000, 150, None), AlignDecision::None);
    }

    #[test]
    fn test_decide_within_tolerance() {
        assert_eq!(decide_alignment(1000, 1150, 150, None), AlignDecision::None);
        assert_eq!(decide_alignment(1000, 851, 150, None), AlignDecision::None);
    }

    #[test]
    fn test_decide_invalid_inputs() {
        assert_eq!(decide_alignment(1000, 0, 150, None), AlignDecision::None);
        assert_eq!(decide_alignment(1000, -200, 150, None), AlignDecision::None);
        assert_eq!(decide_alignment(0, 1000, 150, None), AlignDecision::None);
    }

    #[test]
    fn test_decide_pad_and_trim() {
        assert_eq!(decide_alignment(1000, 1400, 150, None), AlignDecision::Pad(400));
        assert_eq!(decide_alignment(1400, 1000, 150, None), AlignDecision::Trim(400));
    }

    #[test]
    fn test_decide_stretch_bounds() {
        // 1.04 is inside conservative bounds
        assert_eq!(
            decide_alignment(5000, 5200, 150, Some(StretchBounds::CONSERVATIVE)),
            AlignDecision::Stretch(1.04)
        );
        // 1.2 needs loose bounds
        assert_eq!(
            decide_alignment(1000, 1200, 150, Some(StretchBounds::CONSERVATIVE)),
            AlignDecision::Pad(200)
        );
        assert_eq!(
            decide_alignment(1000, 1200, 150, Some(StretchBounds::LOOSE)),
            AlignDecision::Stretch(1.2)
        );
        assert_eq!(
            decide_alignment(1000, 500, 150, Some(StretchBounds::LOOSE)),
            AlignDecision::Trim(500)
        );
    }

    #[test]
    fn test_align_pad_to_target() {
        let out = align_duration(tone_ms(1000), 1400, 150, None, &NoStretcher);
        assert_eq!(out.decision, AlignDecision::Pad(400));
        assert_eq!(out.audio.duration_ms(), 1400);
        assert_eq!(*out.audio.samples.last().unwrap(), 0.0);
    }

    #[test]
    fn test_align_trim_to_target() {
        let out = align_duration(tone_ms(1400), 1000, 150, None, &NoStretcher);
        assert_eq!(out.decision, AlignDecision::Trim(400));
        assert_eq!(out.audio.duration_ms(), 1000);
        assert!(out.fallback.is_none());
    }

    #[test]
    fn test_align_negative_target_passthrough() {
        let audio = tone_ms(800);
        let out = align_duration(audio.clone(), -100, 150, Some(StretchBounds::LOOSE), &NaiveStretcher);
        assert_eq!(out.decision, AlignDecision::None);
        assert_eq!(out.audio, audio);
    }

    #[test]
    fn test_align_stretch_applied() {
        let out = align_duration(tone_ms(1000), 1200, 150, Some(StretchBounds::LOOSE), &NaiveStretcher);
        assert_eq!(out.decision, AlignDecision::Stretch(1.2));
        assert_eq!(out.audio.duration_ms(), 1200);
    }

    #[test]
    fn test_align_stretch_failure_falls_back() {
        let out = align_duration(tone_ms(1000), 1200, 150, Some(StretchBounds::LOOSE), &FailingStretcher);
        assert_eq!(out.decision, AlignDecision::Pad(200));
        assert_eq!(out.audio.duration_ms(), 1200);
        assert_eq!(out.fallback, Some(StretchError::Backend("boom".into())));
    }

    #[test]
    fn test_unavailable_stretcher_not_attempted() {
        let out = align_duration(tone_ms(1000), 1200, 150, Some(StretchBounds::LOOSE), &NoStretcher);
        assert_eq!(out.decision, AlignDecision::Pad(200));
        assert!(out.fallback.is_none());
    }
}
