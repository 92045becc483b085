//! Synchronization quality metrics.
//!
//! One report per build. Segments are appended in processing order and
//! checked against a fixed set of issue rules; summaries are computed on
//! demand.

use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::align::AlignDecision;
use crate::timing::TimingStrategy;

pub const LOW_CONFIDENCE: f64 = 0.5;
pub const LARGE_RATE_JUMP: i32 = 25;
pub const HIGH_RATE: i32 = 40;
pub const LOW_RATE: i32 = -40;
pub const LOW_MATCH_RATIO: f64 = 0.5;

/// What the pipeline observed for one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentObservation {
    pub index: usize,
    pub speaker: Option<String>,
    pub text: String,
    /// `None` when the segment was never matched against word timings
    pub confidence: Option<f64>,
    /// Rate actually used for synthesis
    pub rate: i32,
    pub strategy: TimingStrategy,
    pub matched_words: usize,
    pub total_words: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentQualityMetrics {
    pub segment_index: usize,
    pub speaker: Option<String>,
    pub text: String,
    pub confidence: Option<f64>,
    pub rate: i32,
    pub prev_rate: Option<i32>,
    pub rate_change: Option<i32>,
    pub strategy: TimingStrategy,
    pub matched_words: usize,
    pub total_words: usize,
    /// Duration alignment applied after synthesis
    pub alignment: Option<AlignDecision>,
    pub issues: Vec<String>,
}

impl SegmentQualityMetrics {
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn add_issue(&mut self, issue: impl Into<String>) {
        self.issues.push(issue.into());
    }

    fn check_for_issues(&mut self) {
        if let Some(confidence) = self.confidence.filter(|&c| c < LOW_CONFIDENCE) {
            let msg = format!("Low word match confidence ({:.1}%)", confidence * 100.0);
            self.add_issue(msg);
        }

        if let (Some(prev), Some(change)) = (self.prev_rate, self.rate_change) {
            if change.abs() > LARGE_RATE_JUMP {
                let msg = format!("Large rate jump: {:+}% -> {:+}% ({:+}%)", prev, self.rate, change);
                self.add_issue(msg);
            }
        }

        if self.rate > HIGH_RATE {
            let msg = format!("High speech rate ({:+}%) may sound unnatural", self.rate);
            self.add_issue(msg);
        }
        if self.rate < LOW_RATE {
            let msg = format!("Low speech rate ({:+}%) may sound slow", self.rate);
            self.add_issue(msg);
        }

        if self.total_words > 0 {
            if self.matched_words == 0 {
                self.add_issue("No words matched to timing data");
            }
            let ratio = self.matched_words as f64 / self.total_words as f64;
            if ratio < LOW_MATCH_RATIO {
                let msg = format!(
                    "Only {}/{} words matched ({:.0}%)",
                    self.matched_words,
                    self.total_words,
                    ratio * 100.0
                );
                self.add_issue(msg);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLevel {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ConfidenceLevel {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > 0.9 {
            ConfidenceLevel::Excellent
        } else if confidence > 0.75 {
            ConfidenceLevel::Good
        } else if confidence > 0.6 {
            ConfidenceLevel::Fair
        } else {
            ConfidenceLevel::Poor
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceLevel::Excellent => "EXCELLENT",
            ConfidenceLevel::Good => "GOOD",
            ConfidenceLevel::Fair => "FAIR",
            ConfidenceLevel::Poor => "POOR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualitySummary {
    pub total_segments: usize,
    /// Mean confidence over segments that have words
    pub avg_confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub segments_with_issues: usize,
    pub issue_percentage: f64,
    pub max_rate_change: i32,
    pub avg_rate_change: f64,
    pub processing_time_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityStatistics {
    pub total_segments: usize,
    pub avg_confidence: f64,
    pub min_confidence: f64,
    pub max_confidence: f64,
    pub avg_rate: f64,
    pub min_rate: i32,
    pub max_rate: i32,
    pub issues_count: usize,
    pub total_issues: usize,
}

pub const HISTOGRAM_BUCKETS: [&str; 5] = ["0.0-0.2", "0.2-0.4", "0.4-0.6", "0.6-0.8", "0.8-1.0"];

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[derive(Debug, Clone)]
pub struct QualityReport {
    segments: Vec<SegmentQualityMetrics>,
    started: Instant,
    /// Fixed once `finish` is called
    elapsed: Option<Duration>,
    created_unix_s: u64,
}

impl Default for QualityReport {
    fn default() -> Self {
        Self::new()
    }
}

impl QualityReport {
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
            started: Instant::now(),
            elapsed: None,
            created_unix_s: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }

    /// Record a processed segment and check it for issues.
    pub fn add_segment(&mut self, obs: SegmentObservation) -> &SegmentQualityMetrics {
        let prev_rate = self.segments.last().map(|s| s.rate);
        let mut metrics = SegmentQualityMetrics {
            segment_index: obs.index,
            speaker: obs.speaker,
            text: obs.text,
            confidence: obs.confidence,
            rate: obs.rate,
            prev_rate,
            rate_change: prev_rate.map(|p| obs.rate - p),
            strategy: obs.strategy,
            matched_words: obs.matched_words,
            total_words: obs.total_words,
            alignment: None,
            issues: Vec::new(),
        };
        metrics.check_for_issues();
        self.segments.push(metrics);
        &self.segments[self.segments.len() - 1]
    }

    fn segment_mut(&mut self, index: usize) -> Option<&mut SegmentQualityMetrics> {
        self.segments.iter_mut().rev().find(|s| s.segment_index == index)
    }

    /// Attach an issue to an already recorded segment.
    pub fn record_issue(&mut self, index: usize, issue: impl Into<String>) {
        let issue = issue.into();
        match self.segment_mut(index) {
            Some(seg) => seg.add_issue(issue),
            None => log::debug!("Issue for unrecorded segment {}: {}", index, issue),
        }
    }

    pub fn record_alignment(&mut self, index: usize, decision: AlignDecision) {
        if let Some(seg) = self.segment_mut(index) {
            seg.alignment = Some(decision);
        }
    }

    /// Freeze the processing time.
    pub fn finish(&mut self) {
        self.elapsed.get_or_insert_with(|| self.started.elapsed());
    }

    pub fn segments(&self) -> &[SegmentQualityMetrics] {
        &self.segments
    }

    pub fn processing_time(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.started.elapsed())
    }

    fn scored_confidences(&self) -> Vec<f64> {
        self.segments
            .iter()
            .filter(|s| s.total_words > 0)
            .filter_map(|s| s.confidence)
            .collect()
    }

    pub fn summary(&self) -> QualitySummary {
        let confidences = self.scored_confidences();
        let rate_changes: Vec<i32> = self
            .segments
            .iter()
            .filter_map(|s| s.rate_change.map(i32::abs))
            .collect();
        let with_issues = self.segments.iter().filter(|s| s.has_issues()).count();

        let avg_confidence = if confidences.is_empty() {
            0.0
        } else {
            confidences.iter().sum::<f64>() / confidences.len() as f64
        };
        let avg_rate_change = if rate_changes.is_empty() {
            0.0
        } else {
            rate_changes.iter().sum::<i32>() as f64 / rate_changes.len() as f64
        };
        let issue_percentage = if self.segments.is_empty() {
            0.0
        } else {
            100.0 * with_issues as f64 / self.segments.len() as f64
        };

        QualitySummary {
            total_segments: self.segments.len(),
            avg_confidence: round_to(avg_confidence, 3),
            confidence_level: ConfidenceLevel::from_confidence(avg_confidence),
            segments_with_issues: with_issues,
            issue_percentage: round_to(issue_percentage, 1),
            max_rate_change: rate_changes.iter().copied().max().unwrap_or(0),
            avg_rate_change: round_to(avg_rate_change, 1),
            processing_time_s: round_to(self.processing_time().as_secs_f64(), 2),
        }
    }

    pub fn problematic_segments(&self) -> Vec<&SegmentQualityMetrics> {
        self.segments.iter().filter(|s| s.has_issues()).collect()
    }

    /// Segment counts per confidence band, in [`HISTOGRAM_BUCKETS`] order.
    /// Unmatched segments are not counted.
    pub fn confidence_histogram(&self) -> Vec<(&'static str, usize)> {
        let mut counts = [0usize; 5];
        for confidence in self.segments.iter().filter_map(|s| s.confidence) {
            let bucket = [0.2, 0.4, 0.6, 0.8]
                .iter()
                .position(|&upper| confidence < upper)
                .unwrap_or(4);
            counts[bucket] += 1;
        }
        HISTOGRAM_BUCKETS.iter().copied().zip(counts).collect()
    }

    /// Detailed statistics; `None` before any segment is recorded.
    pub fn statistics(&self) -> Option<QualityStatistics> {
        if self.segments.is_empty() {
            return None;
        }
        let confidences = self.scored_confidences();
        let rates: Vec<i32> = self.segments.iter().map(|s| s.rate).collect();
        let (min_confidence, max_confidence, avg_confidence) = if confidences.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            (
                confidences.iter().copied().fold(f64::INFINITY, f64::min),
                confidences.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                confidences.iter().sum::<f64>() / confidences.len() as f64,
            )
        };

        Some(QualityStatistics {
            total_segments: self.segments.len(),
            avg_confidence,
            min_confidence,
            max_confidence,
            avg_rate: rates.iter().sum::<i32>() as f64 / rates.len() as f64,
            min_rate: rates.iter().copied().min().unwrap_or(0),
            max_rate: rates.iter().copied().max().unwrap_or(0),
            issues_count: self.segments.iter().filter(|s| s.has_issues()).count(),
            total_issues: self.segments.iter().map(|s| s.issues.len()).sum(),
        })
    }

    /// Human-readable report. Shows problematic segments (at most
    /// `max_shown`) unless `show_all` is set.
    pub fn render(&self, max_shown: usize, show_all: bool) -> String {
        let summary = self.summary();
        let rule = "=".repeat(72);
        let mut out = String::new();

        out.push_str(&format!("{}\nVOICEOVER SYNCHRONIZATION QUALITY REPORT\n{}\n", rule, rule));
        out.push_str(&format!("Total segments:       {}\n", summary.total_segments));
        out.push_str(&format!(
            "Average confidence:   {:.1}% ({})\n",
            summary.avg_confidence * 100.0,
            summary.confidence_level.as_str()
        ));
        out.push_str(&format!(
            "Segments with issues: {}/{} ({}%)\n",
            summary.segments_with_issues, summary.total_segments, summary.issue_percentage
        ));
        out.push_str(&format!("Max rate change:      {}%\n", summary.max_rate_change));
        out.push_str(&format!("Avg rate change:      {}%\n", summary.avg_rate_change));
        out.push_str(&format!("Processing time:      {}s\n", summary.processing_time_s));

        let shown: Vec<&SegmentQualityMetrics> = if show_all {
            self.segments.iter().collect()
        } else {
            self.problematic_segments().into_iter().take(max_shown).collect()
        };

        if !shown.is_empty() {
            out.push_str(&format!("{}\n", "-".repeat(72)));
            for seg in shown {
                let preview: String = seg.text.chars().take(60).collect();
                let ellipsis = if seg.text.chars().count() > 60 { "..." } else { "" };
                let confidence = match seg.confidence {
                    Some(c) => format!("{:.1}%", c * 100.0),
                    None => "n/a".to_string(),
                };
                out.push_str(&format!(
                    "\n[Segment {}] {}\n  Text: {}{}\n  Confidence: {} | Rate: {:+}% | {}",
                    seg.segment_index,
                    seg.speaker.as_deref().unwrap_or("Unknown"),
                    preview,
                    ellipsis,
                    confidence,
                    seg.rate,
                    seg.strategy
                ));
                if let Some(change) = seg.rate_change {
                    out.push_str(&format!(" | Change: {:+}%", change));
                }
                out.push('\n');
                for issue in &seg.issues {
                    out.push_str(&format!("  ! {}\n", issue));
                }
            }
        }
        out.push_str(&rule);
        out.push('\n');
        out
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "summary": self.summary(),
            "statistics": self.statistics(),
            "confidence_histogram": self
                .confidence_histogram()
                .into_iter()
                .map(|(k, v)| (k.to_string(), serde_json::Value::from(v)))
                .collect::<serde_json::Map<_, _>>(),
            "segments": self.segments,
            "created_unix_s": self.created_unix_s,
        })
    }

    pub fn export_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.to_json())?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write quality report: {}", path.display()))?;
        Ok(())
    }
}
