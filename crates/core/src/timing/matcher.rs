//! Fuzzy matching of subtitle words against transcribed word timings.
//!
//! Assignment is greedy in text order: each text word claims the most
//! similar unused candidate, so an early word can take a candidate that a
//! later word would have matched better.

use serde::Serialize;

use crate::timing::similarity::similarity;
use crate::types::WordTiming;

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.7;

/// Outcome of matching one segment's text against word timings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchResult {
    /// Matched timings in the order text words claimed them
    pub matched: Vec<WordTiming>,
    /// Similarity of each entry in `matched`
    pub scores: Vec<f64>,
    /// (matched / total words) * mean similarity
    pub confidence: f64,
    /// Text words with no acceptable candidate
    pub unmatched: Vec<String>,
    pub total_words: usize,
}

impl MatchResult {
    pub fn matched_count(&self) -> usize {
        self.matched.len()
    }

    pub fn match_ratio(&self) -> f64 {
        if self.total_words == 0 {
            return 0.0;
        }
        self.matched.len() as f64 / self.total_words as f64
    }
}

/// How aggressively timing data is trusted for a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimingStrategy {
    High,
    Medium,
    Low,
    None,
}

impl TimingStrategy {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > 0.9 {
            TimingStrategy::High
        } else if confidence > 0.7 {
            TimingStrategy::Medium
        } else if confidence > 0.5 {
            TimingStrategy::Low
        } else {
            TimingStrategy::None
        }
    }

    /// Whether measured word rate drives the synthesis rate.
    pub fn uses_word_timing(self) -> bool {
        matches!(self, TimingStrategy::High | TimingStrategy::Medium)
    }

    /// Whether silence may be borrowed from neighbouring gaps.
    pub fn allows_elastic(self) -> bool {
        matches!(self, TimingStrategy::High | TimingStrategy::Medium)
    }

    /// Whether synthesized audio may be time-stretched into its window.
    pub fn allows_stretch(self) -> bool {
        self == TimingStrategy::High
    }

    /// Largest rate step from the previous segment, in percent.
    pub fn max_rate_change(self) -> i32 {
        match self {
            TimingStrategy::High => 10,
            TimingStrategy::Medium => 15,
            TimingStrategy::Low => 20,
            TimingStrategy::None => 30,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimingStrategy::High => "HIGH",
            TimingStrategy::Medium => "MEDIUM",
            TimingStrategy::Low => "LOW",
            TimingStrategy::None => "NONE",
        }
    }
}

impl std::fmt::Display for TimingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remove `(...)` and `[...]` asides. Unclosed brackets are kept as text.
fn strip_asides(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(['(', '[']) {
        let close = if rest[pos..].starts_with('(') { ')' } else { ']' };
        match rest[pos + 1..].find(close) {
            Some(len) => {
                out.push_str(&rest[..pos]);
                rest = &rest[pos + 1 + len + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

/// Split subtitle text into words, keeping contractions.
///
/// "Don't do it! (laughs)" -> ["Don't", "do", "it"]
pub fn split_words(text: &str) -> Vec<String> {
    let stripped = strip_asides(text);
    stripped
        .split(|c: char| !(c.is_alphabetic() || c == '\''))
        .filter(|w| w.chars().any(char::is_alphabetic))
        .map(str::to_string)
        .collect()
}

/// Best unused candidate for `word`: (candidate index, score).
///
/// The first maximum wins ties.
fn best_candidate(word: &str, candidates: &[&WordTiming], used: &[bool]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, cand) in candidates.iter().enumerate() {
        if used[i] || cand.word.trim().is_empty() {
            continue;
        }
        let score = similarity(word, &cand.word);
        if best.map(|(_, s)| score > s).unwrap_or(score > 0.0) {
            best = Some((i, score));
        }
    }
    best
}

/// Match the words of `segment_text` to timings starting inside
/// `[start_s, end_s]`.
pub fn match_words_to_segment(
    segment_text: &str,
    word_timings: &[WordTiming],
    start_s: f64,
    end_s: f64,
    fuzzy_threshold: f64,
) -> MatchResult {
    let text_words = split_words(segment_text);
    let total_words = text_words.len();

    let candidates: Vec<&WordTiming> = word_timings
        .iter()
        .filter(|w| w.start_s >= start_s && w.start_s <= end_s)
        .collect();

    if candidates.is_empty() {
        log::debug!(
            "No word timings in range [{:.2}s - {:.2}s]",
            start_s,
            end_s
        );
        return MatchResult {
            unmatched: text_words,
            total_words,
            ..Default::default()
        };
    }

    let mut used = vec![false; candidates.len()];
    let mut matched = Vec::new();
    let mut scores = Vec::new();
    let mut unmatched = Vec::new();

    for word in text_words {
        match best_candidate(&word, &candidates, &used) {
            Some((i, score)) if score >= fuzzy_threshold => {
                used[i] = true;
                matched.push(candidates[i].clone());
                scores.push(score);
            }
            _ => unmatched.push(word),
        }
    }

    let confidence = if total_words == 0 || scores.is_empty() {
        0.0
    } else {
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        (matched.len() as f64 / total_words as f64) * mean
    };

    log::debug!(
        "Matched {}/{} words (confidence {:.1}%)",
        matched.len(),
        total_words,
        confidence * 100.0
    );

    MatchResult {
        matched,
        scores,
        confidence,
        unmatched,
        total_words,
    }
}
