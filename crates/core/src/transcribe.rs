//! Transcription interface and Whisper JSON import.
//!
//! Word timings come from an external ASR run; this module reads its JSON
//! output and turns words into subtitle-sized segments.

use std::path::Path;

use anyhow::{Context, Result};

use crate::error::TranscriptionError;
use crate::types::{AudioBuffer, Segment, TranscriptSegment, TranscriptionResult, WordTiming};

/// Longest subtitle segment produced by word grouping (seconds).
pub const DEFAULT_MAX_SEGMENT_S: f64 = 5.0;
/// Silence that always starts a new segment (seconds).
pub const SEGMENT_BREAK_GAP_S: f64 = 1.0;

/// Speech-to-text backend.
pub trait Transcriber: Send + Sync {
    /// Backend name for display.
    fn name(&self) -> &str;

    /// Transcribe audio, with word timings when the backend provides them.
    fn transcribe(&self, audio: &AudioBuffer) -> Result<TranscriptionResult, TranscriptionError>;
}

/// Transcriber that returns a result computed ahead of time.
#[derive(Debug, Clone)]
pub struct PrecomputedTranscriber {
    result: TranscriptionResult,
}

impl PrecomputedTranscriber {
    pub fn new(result: TranscriptionResult) -> Self {
        Self { result }
    }

    /// Load from a Whisper-style JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        Ok(Self::new(load_transcription(path)?))
    }
}

impl Transcriber for PrecomputedTranscriber {
    fn name(&self) -> &str {
        "precomputed"
    }

    fn transcribe(&self, _audio: &AudioBuffer) -> Result<TranscriptionResult, TranscriptionError> {
        Ok(self.result.clone())
    }
}

fn parse_word(value: &serde_json::Value) -> Option<WordTiming> {
    let word = value["word"]
        .as_str()
        .or_else(|| value["text"].as_str())?
        .trim();
    if word.is_empty() {
        return None;
    }
    let start = value["start"].as_f64().unwrap_or(0.0);
    let end = value["end"].as_f64().unwrap_or(start);
    Some(WordTiming::new(word, start, end))
}

/// Parse Whisper's verbose JSON into a [`TranscriptionResult`].
///
/// Words are read from `segments[].words[]`, falling back to a top-level
/// `words[]` array. `words` is `None` when neither is present.
pub fn parse_whisper_json(
    json_str: &str,
    default_language: &str,
) -> Result<TranscriptionResult, TranscriptionError> {
    let value: serde_json::Value = serde_json::from_str(json_str)?;
    if !value.is_object() {
        return Err(TranscriptionError::Backend(
            "expected a JSON object at the top level".into(),
        ));
    }

    let language = value["language"]
        .as_str()
        .unwrap_or(default_language)
        .to_string();

    let mut segments = Vec::new();
    let mut nested_words: Vec<WordTiming> = Vec::new();
    let mut saw_word_arrays = false;

    for seg in value["segments"].as_array().into_iter().flatten() {
        let text = seg["text"].as_str().unwrap_or("").trim().to_string();
        let start_s = seg["start"].as_f64().unwrap_or(0.0);
        let end_s = seg["end"].as_f64().unwrap_or(start_s);
        if !text.is_empty() {
            segments.push(TranscriptSegment { text, start_s, end_s });
        }
        if let Some(words) = seg["words"].as_array() {
            saw_word_arrays = true;
            nested_words.extend(words.iter().filter_map(parse_word));
        }
    }

    let words = if saw_word_arrays {
        Some(nested_words)
    } else {
        value["words"]
            .as_array()
            .map(|words| words.iter().filter_map(parse_word).collect())
    };

    let text = match value["text"].as_str() {
        Some(t) => t.trim().to_string(),
        None => segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" "),
    };

    Ok(TranscriptionResult {
        text,
        segments,
        words,
        language,
    })
}

/// Read and parse a Whisper JSON file.
pub fn load_transcription(path: &Path) -> Result<TranscriptionResult> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcription: {}", path.display()))?;
    let result = parse_whisper_json(&data, "en")
        .with_context(|| format!("Failed to parse transcription: {}", path.display()))?;
    log::info!(
        "Loaded transcription: {} segment(s), {} word timing(s)",
        result.segments.len(),
        result.words.as_ref().map(Vec::len).unwrap_or(0)
    );
    Ok(result)
}

/// Group word timings into subtitle segments.
///
/// A new segment starts when adding the next word would make the segment
/// longer than `max_duration_s`, or when the silence before it exceeds 1 s.
pub fn group_words_into_segments(words: &[WordTiming], max_duration_s: f64) -> Vec<TranscriptSegment> {
    let mut segments: Vec<TranscriptSegment> = Vec::new();
    let Some(first) = words.first() else {
        return segments;
    };

    let mut current = TranscriptSegment {
        text: first.word.clone(),
        start_s: first.start_s,
        end_s: first.end_s,
    };

    for word in &words[1..] {
        let duration = word.end_s - current.start_s;
        let gap = word.start_s - current.end_s;
        if duration > max_duration_s || gap > SEGMENT_BREAK_GAP_S {
            let next = TranscriptSegment {
                text: word.word.clone(),
                start_s: word.start_s,
                end_s: word.end_s,
            };
            segments.push(std::mem::replace(&mut current, next));
        } else {
            current.end_s = word.end_s;
            current.text.push(' ');
            current.text.push_str(&word.word);
        }
    }

    if !current.text.is_empty() {
        segments.push(current);
    }
    segments
}

/// Transcribe `audio` and cut the result into numbered subtitle segments.
///
/// Word timings are grouped when present; otherwise the backend's own
/// segments are used as-is.
pub fn transcribe_segments(
    transcriber: &dyn Transcriber,
    audio: &AudioBuffer,
    max_segment_s: f64,
) -> Result<Vec<Segment>, TranscriptionError> {
    let result = transcriber.transcribe(audio)?;
    let transcript = match result.words {
        Some(words) if !words.is_empty() => group_words_into_segments(&words, max_segment_s),
        _ => {
            log::warn!("No word timings from {}; using transcript segments as-is", transcriber.name());
            result.segments
        }
    };
    if let Some(last) = transcript.last().filter(|_| !audio.is_empty()) {
        let audio_s = audio.duration_ms() as f64 / 1000.0;
        if last.end_s > audio_s + 0.5 {
            log::warn!(
                "Transcript ends at {:.2}s but the audio is only {:.2}s long",
                last.end_s,
                audio_s
            );
        }
    }
    Ok(transcript_to_segments(&transcript))
}

/// Number transcript segments from 1 and convert to millisecond segments.
pub fn transcript_to_segments(transcript: &[TranscriptSegment]) -> Vec<Segment> {
    transcript
        .iter()
        .enumerate()
        .map(|(i, t)| Segment {
            index: i + 1,
            speaker: None,
            text: t.text.clone(),
            start_ms: (t.start_s.max(0.0) * 1000.0).round() as u64,
            end_ms: (t.end_s.max(0.0) * 1000.0).round() as u64,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = r#"{
        "text": " Hello world. Second line.",
        "language": "en",
        "segments": [
            {"text": " Hello world.", "start": 0.0, "end": 1.0,
             "words": [{"word": " Hello", "start": 0.0, "end": 0.4},
                       {"word": " world.", "start": 0.5, "end": 1.0}]},
            {"text": " Second line.", "start": 2.5, "end": 3.5,
             "words": [{"word": "Second", "start": 2.5, "end": 3.0},
                       {"word": "  ", "start": 3.0, "end": 3.0},
                       {"word": "line.", "start": 3.0, "end": 3.5}]}
        ]
    }"#;

    #[test]
    fn test_parse_nested_words() {
        let result = parse_whisper_json(NESTED, "xx").unwrap();
        assert_eq!(result.text, "Hello world. Second line.");
        assert_eq!(result.language, "en");
        assert_eq!(result.segments.len(), 2);
        let words = result.words.unwrap();
        assert_eq!(words.len(), 4);
        assert_eq!(words[0].word, "Hello");
        assert_eq!(words[3].start_s, 3.0);
    }

    #[test]
    fn test_parse_top_level_words() {
        let json = r#"{"words": [{"text": "hi", "start": 1.0, "end": 1.2}]}"#;
        let result = parse_whisper_json(json, "fr").unwrap();
        assert_eq!(result.language, "fr");
        assert_eq!(result.words.unwrap()[0].word, "hi");
        assert!(result.segments.is_empty());
    }

    #[test]
    fn test_parse_without_words() {
        let json = r#"{"text": "plain", "segments": [{"text": "plain", "start": 0, "end": 1}]}"#;
        let result = parse_whisper_json(json, "en").unwrap();
        assert!(result.words.is_none());
        assert_eq!(result.segments[0].end_s, 1.0);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_whisper_json("{not json", "en"),
            Err(TranscriptionError::Json(_))
        ));
        assert!(matches!(
            parse_whisper_json("[1, 2]", "en"),
            Err(TranscriptionError::Backend(_))
        ));
    }

    #[test]
    fn test_group_by_gap() {
        let words = vec![
            WordTiming::new("one", 0.0, 0.3),
            WordTiming::new("two", 0.4, 0.7),
            WordTiming::new("three", 2.0, 2.4),
        ];
        let segments = group_words_into_segments(&words, DEFAULT_MAX_SEGMENT_S);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "one two");
        assert_eq!(segments[0].end_s, 0.7);
        assert_eq!(segments[1].text, "three");
    }

    #[test]
    fn test_group_by_max_duration() {
        let words: Vec<WordTiming> = (0..12)
            .map(|i| WordTiming::new("w", i as f64 * 0.5, i as f64 * 0.5 + 0.4))
            .collect();
        let segments = group_words_into_segments(&words, 2.0);
        for seg in &segments {
            assert!(seg.end_s - seg.start_s <= 2.0);
        }
        let total: usize = segments.iter().map(|s| s.text.split(' ').count()).sum();
        assert_eq!(total, 12);
    }

    #[test]
    fn test_group_empty() {
        assert!(group_words_into_segments(&[], 5.0).is_empty());
    }

    #[test]
    fn test_transcript_to_segments() {
        let transcript = vec![TranscriptSegment {
            text: "hello".into(),
            start_s: 1.2346,
            end_s: 2.0,
        }];
        let segments = transcript_to_segments(&transcript);
        assert_eq!(segments[0].index, 1);
        assert_eq!(segments[0].start_ms, 1235);
        assert_eq!(segments[0].end_ms, 2000);
    }

    #[test]
    fn test_transcribe_segments_groups_words() {
        let t = PrecomputedTranscriber::new(parse_whisper_json(NESTED, "en").unwrap());
        assert_eq!(t.name(), "precomputed");
        let segments = transcribe_segments(&t, &AudioBuffer::empty(16000), DEFAULT_MAX_SEGMENT_S).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Hello world.");
        assert_eq!((segments[1].index, segments[1].start_ms), (2, 2500));
    }

    #[test]
    fn test_transcribe_segments_without_words() {
        let json = r#"{"segments": [{"text": "plain", "start": 0.5, "end": 1.5}]}"#;
        let t = PrecomputedTranscriber::new(parse_whisper_json(json, "en").unwrap());
        // Audio shorter than the transcript only warns
        let audio = AudioBuffer::new(vec![0.0; 8000], 16000);
        let segments = transcribe_segments(&t, &audio, DEFAULT_MAX_SEGMENT_S).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!((segments[0].start_ms, segments[0].end_ms), (500, 1500));
    }
}
