//! Cursor-based assembly of the output track.
//!
//! The cursor is the end of the assembled audio. Positions are tracked in
//! samples so rounding never accumulates across segments.

use serde::Serialize;

use crate::audio::effects::trim_tail;
use crate::types::{ms_to_samples, AudioBuffer};

/// How the cursor was moved to a segment's start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Placement {
    /// Cursor already at the start
    Aligned,
    /// Silence inserted (samples)
    Gap(usize),
    /// Assembled tail cut back (samples actually removed)
    Overlap(usize),
}

#[derive(Debug, Clone)]
pub struct Timeline {
    samples: Vec<f64>,
    sample_rate: u32,
}

impl Timeline {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Cursor position in samples.
    pub fn cursor(&self) -> usize {
        self.samples.len()
    }

    /// Cursor position rounded to milliseconds.
    pub fn cursor_ms(&self) -> i64 {
        (self.samples.len() as f64 * 1000.0 / self.sample_rate as f64).round() as i64
    }

    /// Move the cursor to `start_ms`: fill a gap with silence, or trim the
    /// assembled tail when the previous segment ran past the start.
    pub fn place(&mut self, start_ms: u64) -> Placement {
        let start = ms_to_samples(start_ms as i64, self.sample_rate);
        let cursor = self.samples.len();
        if start > cursor {
            self.samples.resize(start, 0.0);
            Placement::Gap(start - cursor)
        } else if start < cursor {
            let removed = trim_tail(&mut self.samples, cursor - start);
            log::debug!(
                "Overlap at {}ms: trimmed {} sample(s) of previous audio",
                start_ms,
                removed
            );
            Placement::Overlap(removed)
        } else {
            Placement::Aligned
        }
    }

    /// Append audio at the cursor and advance by its length.
    ///
    /// Audio must already be at the timeline's sample rate.
    pub fn append(&mut self, audio: &AudioBuffer) {
        debug_assert_eq!(audio.sample_rate, self.sample_rate);
        self.samples.extend_from_slice(&audio.samples);
    }

    pub fn into_audio(self) -> AudioBuffer {
        AudioBuffer::new(self.samples, self.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 1000;

    fn ones(n: usize) -> AudioBuffer {
        AudioBuffer::new(vec![1.0; n], SR)
    }

    #[test]
    fn test_gap_inserts_silence() {
        let mut t = Timeline::new(SR);
        assert_eq!(t.place(250), Placement::Gap(250));
        t.append(&ones(100));
        assert_eq!(t.cursor(), 350);
        let audio = t.into_audio();
        assert_eq!(audio.samples[249], 0.0);
        assert_eq!(audio.samples[250], 1.0);
    }

    #[test]
    fn test_aligned_start() {
        let mut t = Timeline::new(SR);
        assert_eq!(t.place(0), Placement::Aligned);
        t.append(&ones(100));
        assert_eq!(t.place(100), Placement::Aligned);
    }

    #[test]
    fn test_overlap_trims_tail() {
        let mut t = Timeline::new(SR);
        t.append(&ones(500));
        assert_eq!(t.place(300), Placement::Overlap(200));
        assert_eq!(t.cursor(), 300);
        assert_eq!(t.cursor_ms(), 300);
    }

    #[test]
    fn test_overlap_to_track_start() {
        let mut t = Timeline::new(SR);
        t.append(&ones(100));
        assert_eq!(t.place(0), Placement::Overlap(100));
        assert_eq!(t.cursor(), 0);
    }
}
