use serde::{Deserialize, Serialize};

/// One subtitle cue after speaker extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    /// 1-based position in the subtitle file
    pub index: usize,
    pub speaker: Option<String>,
    /// Spoken content, speaker label removed
    pub text: String,
    /// Cue start (milliseconds)
    pub start_ms: u64,
    /// Cue end (milliseconds)
    pub end_ms: u64,
}

impl Segment {
    /// Length of the cue window. Negative when the input has end before start.
    pub fn target_duration_ms(&self) -> i64 {
        self.end_ms as i64 - self.start_ms as i64
    }

    pub fn start_s(&self) -> f64 {
        self.start_ms as f64 / 1000.0
    }

    pub fn end_s(&self) -> f64 {
        self.end_ms as f64 / 1000.0
    }
}

/// Observed word with timing from transcription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WordTiming {
    pub word: String,
    /// Start time in seconds
    #[serde(alias = "start")]
    pub start_s: f64,
    /// End time in seconds
    #[serde(alias = "end")]
    pub end_s: f64,
}

impl WordTiming {
    pub fn new(word: &str, start_s: f64, end_s: f64) -> Self {
        Self {
            word: word.to_string(),
            start_s,
            end_s,
        }
    }
}

/// A timed span of transcribed text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptSegment {
    pub text: String,
    pub start_s: f64,
    pub end_s: f64,
}

/// Result of transcription. Word timings are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    pub segments: Vec<TranscriptSegment>,
    pub words: Option<Vec<WordTiming>>,
    pub language: String,
}

/// Mono audio held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Samples normalized to [-1, 1]
    pub samples: Vec<f64>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn empty(sample_rate: u32) -> Self {
        Self::new(Vec::new(), sample_rate)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration rounded to the nearest millisecond.
    pub fn duration_ms(&self) -> i64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as f64 * 1000.0 / self.sample_rate as f64).round() as i64
    }

    /// Number of samples covering `ms` milliseconds at this buffer's rate.
    pub fn samples_for_ms(&self, ms: i64) -> usize {
        ms_to_samples(ms, self.sample_rate)
    }
}

/// Convert milliseconds to a sample count, clamping negatives to zero.
pub fn ms_to_samples(ms: i64, sample_rate: u32) -> usize {
    if ms <= 0 {
        return 0;
    }
    (ms as f64 * sample_rate as f64 / 1000.0).round() as usize
}
