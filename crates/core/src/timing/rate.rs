//! Speech-rate calculation from observed word timings.

use serde::Serialize;

use crate::types::WordTiming;
use crate::voice::profiles::{VoiceProfile, DEFAULT_BASELINE_WPM, DEFAULT_MAX_RATE, DEFAULT_MIN_RATE};

/// Raw rate above which elastic timing tries to borrow silence.
pub const ELASTIC_TRIGGER_RATE: i32 = 30;
/// Most silence (seconds) a segment may borrow from its neighbours.
pub const MAX_BORROW_S: f64 = 0.5;
/// Silence (seconds) left untouched in every gap.
pub const MIN_GAP_RESERVE_S: f64 = 0.1;

/// Segment window plus the neighbouring boundaries elastic timing may use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateWindow {
    pub start_s: f64,
    pub end_s: f64,
    /// End of the previous segment (adjusted), `None` for the first segment
    pub prev_end_s: Option<f64>,
    /// Start of the next segment, `None` for the last segment
    pub next_start_s: Option<f64>,
}

impl RateWindow {
    pub fn new(start_s: f64, end_s: f64) -> Self {
        Self {
            start_s,
            end_s,
            prev_end_s: None,
            next_start_s: None,
        }
    }

    pub fn with_neighbours(mut self, prev_end_s: Option<f64>, next_start_s: Option<f64>) -> Self {
        self.prev_end_s = prev_end_s;
        self.next_start_s = next_start_s;
        self
    }

    fn duration_s(&self) -> f64 {
        self.end_s - self.start_s
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateCalculation {
    /// Final rate percentage, clamped to the voice range
    pub rate: i32,
    /// Rate before clamping
    pub unclamped_rate: i32,
    pub adjusted_start_s: f64,
    pub adjusted_end_s: f64,
    /// Timings counted inside the original window
    pub word_count: usize,
    pub elastic_applied: bool,
}

/// Converts words-per-minute into rate percentages for one voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateCalculator {
    baseline_wpm: f64,
    min_rate: i32,
    max_rate: i32,
    default_rate: i32,
}

impl Default for RateCalculator {
    fn default() -> Self {
        Self {
            baseline_wpm: DEFAULT_BASELINE_WPM as f64,
            min_rate: DEFAULT_MIN_RATE,
            max_rate: DEFAULT_MAX_RATE,
            default_rate: 0,
        }
    }
}

impl RateCalculator {
    /// Calculator for `profile`. With `use_profile == false` the generic
    /// 150 wpm baseline is used, but the voice range still bounds the result.
    pub fn for_voice(profile: &VoiceProfile, use_profile: bool, default_rate: i32) -> Self {
        let baseline_wpm = if use_profile {
            profile.baseline_wpm as f64
        } else {
            DEFAULT_BASELINE_WPM as f64
        };
        Self {
            baseline_wpm: baseline_wpm.max(1.0),
            min_rate: profile.min_rate,
            max_rate: profile.max_rate,
            default_rate,
        }
    }

    pub fn baseline_wpm(&self) -> f64 {
        self.baseline_wpm
    }

    pub fn clamp(&self, rate: i32) -> i32 {
        rate.clamp(self.min_rate, self.max_rate)
    }

    /// Static rate used when timings are missing or untrusted.
    pub fn default_calculation(&self, window: &RateWindow) -> RateCalculation {
        RateCalculation {
            rate: self.clamp(self.default_rate),
            unclamped_rate: self.default_rate,
            adjusted_start_s: window.start_s,
            adjusted_end_s: window.end_s,
            word_count: 0,
            elastic_applied: false,
        }
    }

    fn rate_for(&self, word_count: usize, duration_s: f64) -> i32 {
        let wpm = word_count as f64 / (duration_s / 60.0);
        ((wpm / self.baseline_wpm - 1.0) * 100.0).round() as i32
    }

    /// Rate for the words spoken in `window`.
    ///
    /// Timings are counted when their start lies in `[start_s, end_s)`.
    /// With `elastic` set and a raw rate above +30, up to 0.5 s of the
    /// surrounding silence is borrowed to slow delivery down.
    pub fn calculate(
        &self,
        window: &RateWindow,
        word_timings: &[WordTiming],
        elastic: bool,
    ) -> RateCalculation {
        let duration_s = window.duration_s();
        let word_count = word_timings
            .iter()
            .filter(|w| w.start_s >= window.start_s && w.start_s < window.end_s)
            .count();

        if word_count == 0 || duration_s <= 0.0 {
            return self.default_calculation(window);
        }

        let raw = self.rate_for(word_count, duration_s);
        let mut adjusted_start_s = window.start_s;
        let mut adjusted_end_s = window.end_s;
        let mut unclamped = raw;
        let mut elastic_applied = false;

        if elastic && raw > ELASTIC_TRIGGER_RATE {
            if let Some((take_before, take_after)) = self.borrow_silence(window, word_count) {
                adjusted_start_s -= take_before;
                adjusted_end_s += take_after;
                unclamped = self.rate_for(word_count, adjusted_end_s - adjusted_start_s);
                elastic_applied = true;
                log::debug!(
                    "Elastic timing: borrowed {:.0}ms before, {:.0}ms after (rate {:+}% -> {:+}%)",
                    take_before * 1000.0,
                    take_after * 1000.0,
                    raw,
                    unclamped
                );
            }
        }

        RateCalculation {
            rate: self.clamp(unclamped),
            unclamped_rate: unclamped,
            adjusted_start_s,
            adjusted_end_s,
            word_count,
            elastic_applied,
        }
    }

    /// Seconds to take from the gap before and after, or `None` when there
    /// is nothing to borrow.
    fn borrow_silence(&self, window: &RateWindow, word_count: usize) -> Option<(f64, f64)> {
        let target_wpm = self.baseline_wpm * (1.0 + ELASTIC_TRIGGER_RATE as f64 / 100.0);
        let needed_s = word_count as f64 / target_wpm * 60.0;
        let shortfall = (needed_s - window.duration_s()).min(MAX_BORROW_S);
        if shortfall <= 0.0 {
            return None;
        }

        // No previous segment: the track start bounds the gap
        let gap_before = (window.start_s - window.prev_end_s.unwrap_or(0.0)).max(0.0);
        let gap_after = window
            .next_start_s
            .map(|next| (next - window.end_s).max(0.0))
            .unwrap_or(0.0);

        let avail_before = (gap_before - MIN_GAP_RESERVE_S).max(0.0);
        let avail_after = (gap_after - MIN_GAP_RESERVE_S).max(0.0);
        let total = avail_before + avail_after;
        if total <= 0.0 {
            return None;
        }

        let borrow = shortfall.min(total);
        let take_before = borrow * avail_before / total;
        Some((take_before, borrow - take_before))
    }
}
