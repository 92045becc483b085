//! Speaker label extraction and continuation inference.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

/// First words that mark a line as continuing the previous speaker.
const CONTINUATION_WORDS: &[&str] = &[
    "and", "but", "so", "or", "because", "that", "they", "it", "this", "there", "here",
];

const MAX_SPEAKER_LEN: usize = 30;

/// Return true if `candidate` looks like a "Name:" label rather than content.
fn is_speaker_label(candidate: &str) -> bool {
    let Some(first) = candidate.chars().next() else {
        return false;
    };
    let compact: String = candidate.chars().filter(|c| *c != ' ').collect();
    first.is_uppercase()
        && !compact.is_empty()
        && compact.chars().all(char::is_alphabetic)
        && candidate.chars().count() <= MAX_SPEAKER_LEN
        && !candidate.contains("://")
}

/// True if the text reads like the previous speaker carrying on.
fn looks_like_continuation(text: &str) -> bool {
    let Some(first_char) = text.chars().next() else {
        return false;
    };
    let first_word = text
        .split_whitespace()
        .next()
        .map(str::to_lowercase)
        .unwrap_or_default();
    CONTINUATION_WORDS.contains(&first_word.as_str()) || !first_char.is_uppercase()
}

/// Split raw subtitle text into an optional speaker and the spoken content.
///
/// Physical lines are joined with single spaces. When no label is present and
/// `prev_speaker` is supplied, continuation lines inherit that speaker.
pub fn extract_speaker(raw_text: &str, prev_speaker: Option<&str>) -> (Option<String>, String) {
    let lines: Vec<&str> = raw_text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let Some(first_line) = lines.first() else {
        return (None, String::new());
    };

    let mut speaker = None;
    let mut content: Vec<&str> = lines.clone();

    if let Some((label, rest)) = first_line.split_once(':') {
        let label = label.trim();
        // "https://..." splits on the scheme colon
        if is_speaker_label(label) && !rest.starts_with("//") {
            speaker = Some(label.to_string());
            content = Vec::with_capacity(lines.len());
            let rest = rest.trim_start();
            if !rest.is_empty() {
                content.push(rest);
            }
            content.extend_from_slice(&lines[1..]);
        }
    }

    let text = content.join(" ").trim().to_string();

    if speaker.is_none() {
        if let Some(prev) = prev_speaker {
            if looks_like_continuation(&text) {
                speaker = Some(prev.to_string());
            }
        }
    }

    (speaker, text)
}

/// Pick the TTS voice for a speaker, falling back to `default_voice`.
pub fn voice_for_speaker<'a>(
    speaker: Option<&str>,
    speaker_voices: &'a HashMap<String, String>,
    default_voice: &'a str,
) -> &'a str {
    speaker
        .and_then(|s| speaker_voices.get(s))
        .map(String::as_str)
        .unwrap_or(default_voice)
}

/// Aggregate speaker counts for a subtitle file.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SpeakerStatistics {
    pub total_segments: usize,
    pub segments_with_speakers: usize,
    pub segments_without_speakers: usize,
    /// Speakers in order of first appearance
    pub unique_speakers: Vec<String>,
    pub speaker_counts: BTreeMap<String, usize>,
    pub has_multiple_speakers: bool,
    /// Most frequent speaker; ties go to the one seen first
    pub primary_speaker: Option<String>,
}

/// Running record of resolved speakers, threaded through segment parsing.
#[derive(Debug, Clone, Default)]
pub struct SpeakerContext {
    history: Vec<(usize, Option<String>)>,
}

impl SpeakerContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a segment's resolved speaker.
    pub fn record(&mut self, index: usize, speaker: Option<String>) {
        self.history.push((index, speaker));
    }

    /// Extract the speaker for `raw_text` using this context, then record it.
    pub fn resolve(&mut self, index: usize, raw_text: &str) -> (Option<String>, String) {
        let (speaker, text) = extract_speaker(raw_text, self.last_speaker());
        self.record(index, speaker.clone());
        (speaker, text)
    }

    /// The most recent non-empty speaker.
    pub fn last_speaker(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find_map(|(_, s)| s.as_deref())
    }

    pub fn history(&self) -> &[(usize, Option<String>)] {
        &self.history
    }

    pub fn statistics(&self) -> SpeakerStatistics {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut order: Vec<String> = Vec::new();
        for (_, speaker) in &self.history {
            if let Some(s) = speaker {
                let count = counts.entry(s.clone()).or_insert(0);
                if *count == 0 {
                    order.push(s.clone());
                }
                *count += 1;
            }
        }

        let mut primary: Option<(&String, usize)> = None;
        for name in &order {
            let c = counts[name];
            if primary.map(|(_, best)| c > best).unwrap_or(true) {
                primary = Some((name, c));
            }
        }

        let with = self.history.iter().filter(|(_, s)| s.is_some()).count();
        SpeakerStatistics {
            total_segments: self.history.len(),
            segments_with_speakers: with,
            segments_without_speakers: self.history.len() - with,
            has_multiple_speakers: order.len() > 1,
            primary_speaker: primary.map(|(n, _)| n.clone()),
            unique_speakers: order,
            speaker_counts: counts,
        }
    }
}
