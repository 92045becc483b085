//! Phase 1: matching and rate decisions for every segment.
//!
//! Produces a materialized plan; smoothing runs over the whole plan before
//! any synthesis happens.

use serde::Serialize;

use crate::config::BuildConfig;
use crate::subtitle::voice_for_speaker;
use crate::timing::{
    match_words_to_segment, smooth_rates_with, MatchResult, RateCalculator, RateWindow, TimingStrategy,
};
use crate::types::{Segment, WordTiming};
use crate::voice::VoiceProfiles;

/// Rate chosen for one segment, frozen after smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateDecision {
    /// Clamped to the voice range, before smoothing
    pub raw_rate_percent: i32,
    pub smoothed_rate_percent: i32,
    pub adjusted_start_s: f64,
    pub adjusted_end_s: f64,
    pub strategy: TimingStrategy,
    pub elastic_applied: bool,
}

#[derive(Debug, Clone)]
pub struct SegmentPlan<'a> {
    pub segment: &'a Segment,
    pub voice: String,
    /// `None` when no word timings were supplied
    pub matching: Option<MatchResult>,
    pub rate: RateDecision,
}

impl SegmentPlan<'_> {
    /// Window the synthesized audio must fill, in ms.
    ///
    /// Equals the subtitle window unless elastic timing widened it.
    pub fn window_ms(&self) -> (u64, u64) {
        if self.rate.elastic_applied {
            (
                (self.rate.adjusted_start_s.max(0.0) * 1000.0).round() as u64,
                (self.rate.adjusted_end_s.max(0.0) * 1000.0).round() as u64,
            )
        } else {
            (self.segment.start_ms, self.segment.end_ms)
        }
    }

    pub fn target_duration_ms(&self) -> i64 {
        let (start, end) = self.window_ms();
        end as i64 - start as i64
    }

    /// `None` when no word timings were supplied.
    pub fn confidence(&self) -> Option<f64> {
        self.matching.as_ref().map(|m| m.confidence)
    }

    /// Whether the configured time stretch may touch this segment.
    ///
    /// With word timings only HIGH confidence segments stretch; without
    /// them the configuration alone decides.
    pub fn allows_stretch(&self) -> bool {
        self.matching.is_none() || self.rate.strategy.allows_stretch()
    }
}

/// Match and rate every non-empty segment, in order.
///
/// The previous segment's adjusted end bounds how much silence elastic
/// timing may borrow before the current one.
pub fn plan_segments<'a>(
    segments: &'a [Segment],
    word_timings: Option<&[WordTiming]>,
    config: &BuildConfig,
    profiles: &VoiceProfiles,
) -> Vec<SegmentPlan<'a>> {
    let spoken: Vec<&Segment> = segments
        .iter()
        .filter(|s| {
            let empty = s.text.trim().is_empty();
            if empty {
                log::debug!("Segment {}: no text, skipped", s.index);
            }
            !empty
        })
        .collect();

    let mut plans: Vec<SegmentPlan<'a>> = Vec::with_capacity(spoken.len());
    let mut prev_end_s: Option<f64> = None;

    for (pos, &segment) in spoken.iter().enumerate() {
        let next_start_s = spoken.get(pos + 1).map(|s| s.start_s());
        let voice = voice_for_speaker(
            segment.speaker.as_deref(),
            &config.speaker_voices,
            &config.default_voice,
        )
        .to_string();
        let profile = profiles.lookup(&voice);
        if !profiles.contains(&voice) {
            log::debug!("Voice {} has no profile, using defaults", voice);
        }
        let calculator =
            RateCalculator::for_voice(profile, config.use_voice_profiles, config.default_rate);
        let window = RateWindow::new(segment.start_s(), segment.end_s())
            .with_neighbours(prev_end_s, next_start_s);

        let (matching, strategy, calculation) = match word_timings {
            Some(timings) => {
                let result = match_words_to_segment(
                    &segment.text,
                    timings,
                    segment.start_s(),
                    segment.end_s(),
                    config.fuzzy_threshold,
                );
                let strategy = TimingStrategy::from_confidence(result.confidence);
                let calculation = if strategy.uses_word_timing() {
                    let elastic = config.elastic_timing && strategy.allows_elastic();
                    calculator.calculate(&window, timings, elastic)
                } else {
                    calculator.default_calculation(&window)
                };
                (Some(result), strategy, calculation)
            }
            None => (None, TimingStrategy::None, calculator.default_calculation(&window)),
        };

        log::debug!(
            "Segment {}: voice={} strategy={} rate={:+}%{}",
            segment.index,
            voice,
            strategy,
            calculation.rate,
            if calculation.elastic_applied { " (elastic)" } else { "" }
        );

        prev_end_s = Some(calculation.adjusted_end_s);
        plans.push(SegmentPlan {
            segment,
            voice,
            matching,
            rate: RateDecision {
                raw_rate_percent: calculation.rate,
                smoothed_rate_percent: calculation.rate,
                adjusted_start_s: calculation.adjusted_start_s,
                adjusted_end_s: calculation.adjusted_end_s,
                strategy,
                elastic_applied: calculation.elastic_applied,
            },
        });
    }

    plans
}

/// Limit rate steps across the whole plan. Runs once, after planning.
///
/// The step into each segment is the configured maximum, tightened by that
/// segment's timing strategy.
pub fn smooth_plan(plans: &mut [SegmentPlan<'_>], config: &BuildConfig) {
    if !config.rate_smoothing {
        return;
    }
    let raw: Vec<i32> = plans.iter().map(|p| p.rate.raw_rate_percent).collect();
    let smoothed = smooth_rates_with(&raw, |i| {
        config
            .max_rate_change
            .min(plans[i].rate.strategy.max_rate_change())
    });
    let mut changed = 0;
    for (plan, rate) in plans.iter_mut().zip(smoothed) {
        if plan.rate.smoothed_rate_percent != rate {
            changed += 1;
        }
        plan.rate.smoothed_rate_percent = rate;
    }
    if changed > 0 {
        log::debug!("Rate smoothing adjusted {} segment(s)", changed);
    }
}
