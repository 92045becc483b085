//! Phase 2: synthesis, duration alignment and assembly.

use crate::align::{align_duration, AlignDecision, TimeStretcher};
use crate::audio::effects::generate_silence;
use crate::audio::io::conform;
use crate::config::{BuildConfig, FailurePolicy};
use crate::error::{BuildError, SynthesisError};
use crate::pipeline::assembler::{Placement, Timeline};
use crate::pipeline::plan::{plan_segments, smooth_plan, SegmentPlan};
use crate::quality::{QualityReport, SegmentObservation};
use crate::synth::{SynthesisRequest, Synthesizer};
use crate::types::{AudioBuffer, Segment, WordTiming};
use crate::voice::VoiceProfiles;

/// External services a build talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub synthesizer: &'a dyn Synthesizer,
    pub stretcher: &'a dyn TimeStretcher,
    pub profiles: &'a VoiceProfiles,
}

fn observation(plan: &SegmentPlan<'_>) -> SegmentObservation {
    let (matched_words, total_words) = match &plan.matching {
        Some(m) => (m.matched_count(), m.total_words),
        None => (0, 0),
    };
    SegmentObservation {
        index: plan.segment.index,
        speaker: plan.segment.speaker.clone(),
        text: plan.segment.text.clone(),
        confidence: plan.confidence(),
        rate: plan.rate.smoothed_rate_percent,
        strategy: plan.rate.strategy,
        matched_words,
        total_words,
    }
}

/// Build one voiceover track from subtitle segments.
///
/// Segments are planned and smoothed first, then synthesized in order and
/// placed at their start times. Returns the track and the quality report.
pub fn build(
    segments: &[Segment],
    word_timings: Option<&[WordTiming]>,
    config: &BuildConfig,
    collab: Collaborators<'_>,
) -> Result<(AudioBuffer, QualityReport), BuildError> {
    config.validate()?;
    collab.profiles.validate()?;
    let word_timings = word_timings.filter(|w| !w.is_empty());
    if config.elastic_timing && word_timings.is_none() {
        return Err(BuildError::ElasticWithoutWordTimings);
    }

    let mut plans = plan_segments(segments, word_timings, config, collab.profiles);
    smooth_plan(&mut plans, config);

    let bounds = config.stretch.bounds();
    if bounds.is_some() && !collab.stretcher.is_available() {
        log::warn!(
            "Time stretching enabled but {} is unavailable; using pad/trim",
            collab.stretcher.name()
        );
    }

    log::info!(
        "Building {} segment(s) with {}",
        plans.len(),
        collab.synthesizer.name()
    );

    let mut report = QualityReport::new();
    let mut timeline = Timeline::new(config.sample_rate);
    let mut succeeded = 0usize;

    for (n, plan) in plans.iter().enumerate() {
        let index = plan.segment.index;
        let (start_ms, _) = plan.window_ms();
        let target_ms = plan.target_duration_ms();

        let placement = timeline.place(start_ms);
        report.add_segment(observation(plan));
        if let Placement::Overlap(samples) = placement {
            let ms = samples as f64 * 1000.0 / config.sample_rate as f64;
            report.record_issue(index, format!("Overlaps previous segment by {:.0}ms", ms));
        }
        if plan.rate.elastic_applied {
            log::debug!(
                "Segment {}: window widened to {:.3}s - {:.3}s",
                index,
                plan.rate.adjusted_start_s,
                plan.rate.adjusted_end_s
            );
        }

        let request = SynthesisRequest::new(&plan.segment.text, &plan.voice)
            .with_rate(plan.rate.smoothed_rate_percent)
            .with_volume(config.volume_percent)
            .with_pitch(config.pitch_hz);

        log::info!(
            "[{}/{}] Segment {} ({}, {})",
            n + 1,
            plans.len(),
            index,
            plan.voice,
            request.rate_string()
        );

        let synthesized = collab.synthesizer.synthesize(&request).and_then(|audio| {
            conform(audio, config.sample_rate)
                .map_err(|e| SynthesisError::Resample(format!("{:#}", e)))
        });
        let audio = match synthesized {
            Ok(audio) => audio,
            Err(source) => match config.failure_policy {
                FailurePolicy::Abort => {
                    return Err(BuildError::SegmentFailed {
                        index,
                        succeeded,
                        source,
                    });
                }
                FailurePolicy::Placeholder => {
                    log::warn!("Segment {} failed: {}; inserting silence", index, source);
                    let issue = match &source {
                        SynthesisError::Resample(msg) => format!("Resampling failed: {}", msg),
                        _ => format!("Synthesis failed: {}", source),
                    };
                    report.record_issue(index, issue);
                    let silence = AudioBuffer::new(
                        generate_silence(target_ms, config.sample_rate),
                        config.sample_rate,
                    );
                    timeline.append(&silence);
                    continue;
                }
            },
        };

        let segment_bounds = bounds.filter(|_| plan.allows_stretch());
        if bounds.is_some() && segment_bounds.is_none() {
            log::debug!("Segment {}: {} confidence, no time stretch", index, plan.rate.strategy);
        }
        let outcome = align_duration(
            audio,
            target_ms,
            config.tolerance_ms,
            segment_bounds,
            collab.stretcher,
        );
        if let Some(err) = &outcome.fallback {
            report.record_issue(index, format!("Time stretch failed ({}); used pad/trim", err));
        }
        if outcome.decision != AlignDecision::None {
            log::debug!("Segment {}: {:?}", index, outcome.decision);
        }
        report.record_alignment(index, outcome.decision);

        timeline.append(&outcome.audio);
        succeeded += 1;
    }

    report.finish();
    let audio = timeline.into_audio();
    log::info!(
        "Built {:.2}s of audio ({}/{} segment(s) synthesized)",
        audio.duration_ms() as f64 / 1000.0,
        succeeded,
        plans.len()
    );
    Ok((audio, report))
}
