//! SRT reading and writing.

use std::path::Path;

use anyhow::{Context, Result};

use crate::subtitle::speaker::SpeakerContext;
use crate::types::Segment;

/// One raw SRT cue before speaker extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct SrtCue {
    pub index: usize,
    pub start_ms: u64,
    pub end_ms: u64,
    /// Cue text with original line breaks
    pub text: String,
}

/// Parse "HH:MM:SS,mmm" (or with '.') into milliseconds.
pub fn parse_timestamp(s: &str) -> Option<u64> {
    let s = s.trim();
    let (clock, millis) = match s.rsplit_once([',', '.']) {
        Some((clock, ms)) => (clock, ms),
        None => (s, "0"),
    };
    if millis.is_empty() || millis.len() > 3 || !millis.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    // "5" after the separator means 500 ms
    let ms: u64 = format!("{:0<3}", millis).parse().ok()?;

    let parts: Vec<&str> = clock.split(':').collect();
    let (h, m, sec) = match parts.as_slice() {
        [h, m, s] => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, s.parse::<u64>().ok()?),
        [m, s] => (0, m.parse::<u64>().ok()?, s.parse::<u64>().ok()?),
        _ => return None,
    };
    if m >= 60 || sec >= 60 {
        return None;
    }
    Some(((h * 3600 + m * 60 + sec) * 1000) + ms)
}

/// Format milliseconds as an SRT timestamp.
pub fn format_timestamp(ms: u64) -> String {
    let h = ms / 3_600_000;
    let m = (ms % 3_600_000) / 60_000;
    let s = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, millis)
}

fn parse_timing_line(line: &str) -> Option<(u64, u64)> {
    let (start, end) = line.split_once("-->")?;
    // Strip trailing cue settings such as "X1:40 X2:600"
    let end = end.split_whitespace().next()?;
    Some((parse_timestamp(start)?, parse_timestamp(end)?))
}

/// Parse SRT content into cues. Malformed blocks are skipped.
pub fn parse_srt(content: &str) -> Vec<SrtCue> {
    let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let mut cues = Vec::new();

    for block in content.split("\n\n") {
        let lines: Vec<&str> = block.lines().filter(|l| !l.trim().is_empty()).collect();
        let Some(timing_pos) = lines.iter().position(|l| l.contains("-->")) else {
            if !lines.is_empty() {
                log::warn!("Skipping SRT block without timing line: {:?}", lines[0]);
            }
            continue;
        };

        let Some((start_ms, end_ms)) = parse_timing_line(lines[timing_pos]) else {
            log::warn!("Skipping SRT block with bad timing: {:?}", lines[timing_pos]);
            continue;
        };

        let index = timing_pos
            .checked_sub(1)
            .and_then(|i| lines[i].trim().parse::<usize>().ok())
            .unwrap_or(cues.len() + 1);

        let text = lines[timing_pos + 1..]
            .iter()
            .map(|l| l.trim())
            .collect::<Vec<_>>()
            .join("\n");

        cues.push(SrtCue {
            index,
            start_ms,
            end_ms,
            text,
        });
    }

    cues
}

/// Read and parse an SRT file.
pub fn read_srt(path: &Path) -> Result<Vec<SrtCue>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;
    let cues = parse_srt(&content);
    log::info!("Parsed {} cue(s) from {}", cues.len(), path.display());
    Ok(cues)
}

/// Resolve speakers across cues, returning segments and the final context.
///
/// Cues keep their position even when the cleaned text is empty; the
/// assembler skips those.
pub fn cues_to_segments(cues: &[SrtCue]) -> (Vec<Segment>, SpeakerContext) {
    cues.iter().fold(
        (Vec::with_capacity(cues.len()), SpeakerContext::new()),
        |(mut segments, mut ctx), cue| {
            let (speaker, text) = ctx.resolve(cue.index, &cue.text);
            segments.push(Segment {
                index: cue.index,
                speaker,
                text,
                start_ms: cue.start_ms,
                end_ms: cue.end_ms,
            });
            (segments, ctx)
        },
    )
}

/// Render segments as SRT, renumbering from 1.
pub fn format_srt(segments: &[Segment], include_speaker: bool) -> String {
    let mut out = String::new();
    for (i, seg) in segments.iter().enumerate() {
        let text = match (&seg.speaker, include_speaker) {
            (Some(speaker), true) => format!("{}: {}", speaker, seg.text),
            _ => seg.text.clone(),
        };
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_timestamp(seg.start_ms),
            format_timestamp(seg.end_ms),
            text
        ));
    }
    out
}

/// Write segments to an SRT file, creating parent directories.
pub fn write_srt(path: &Path, segments: &[Segment], include_speaker: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, format_srt(segments, include_speaker))
        .with_context(|| format!("Failed to write subtitle file: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:00,000 --> 00:00:02,000\nNathan: Hello world!\n\n2\n00:00:02,000 --> 00:00:05,000\nNarrator: This is a test.\n";

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("00:01:02,345"), Some(62345));
        assert_eq!(parse_timestamp("01:00:00.500"), Some(3_600_500));
        assert_eq!(parse_timestamp("00:00:01,5"), Some(1500));
        assert_eq!(parse_timestamp("garbage"), None);
        assert_eq!(parse_timestamp("00:61:00,000"), None);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(62345), "00:01:02,345");
        assert_eq!(format_timestamp(3_600_500), "01:00:00,500");
    }

    #[test]
    fn test_parse_srt_basic() {
        let cues = parse_srt(SAMPLE);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[0].end_ms, 2000);
        assert_eq!(cues[1].text, "Narrator: This is a test.");
    }

    #[test]
    fn test_parse_srt_crlf_bom_multiline() {
        let content = "\u{feff}7\r\n00:00:01,000 --> 00:00:03,000\r\nFirst line\r\nsecond line\r\n\r\n";
        let cues = parse_srt(content);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].index, 7);
        assert_eq!(cues[0].text, "First line\nsecond line");
    }

    #[test]
    fn test_parse_srt_skips_bad_block() {
        let content = "1\nnot a timing line\nhello\n\n2\n00:00:01,000 --> 00:00:02,000\nok\n";
        let cues = parse_srt(content);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "ok");
    }

    #[test]
    fn test_cues_to_segments_resolves_speakers() {
        let content = "1\n00:00:00,000 --> 00:00:01,000\nNathan: Hi\n\n2\n00:00:01,000 --> 00:00:02,000\nand bye\n";
        let (segments, ctx) = cues_to_segments(&parse_srt(content));
        assert_eq!(segments[0].speaker.as_deref(), Some("Nathan"));
        assert_eq!(segments[0].text, "Hi");
        assert_eq!(segments[1].speaker.as_deref(), Some("Nathan"));
        assert_eq!(ctx.statistics().speaker_counts["Nathan"], 2);
    }

    #[test]
    fn test_format_srt_with_speaker() {
        let (segments, _) = cues_to_segments(&parse_srt(SAMPLE));
        let out = format_srt(&segments, true);
        assert!(out.starts_with("1\n00:00:00,000 --> 00:00:02,000\nNathan: Hello world!\n"));
        let reparsed = parse_srt(&out);
        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed[1].start_ms, 2000);
    }

    #[test]
    fn test_write_srt_file() {
        let dir = std::env::temp_dir().join(format!("voicesync_srt_{}", std::process::id()));
        let path = dir.join("nested").join("out.srt");
        let (segments, _) = cues_to_segments(&parse_srt(SAMPLE));
        write_srt(&path, &segments, false).unwrap();
        let cues = read_srt(&path).unwrap();
        assert_eq!(cues[0].text, "Hello world!");
        std::fs::remove_dir_all(&dir).ok();
    }
}
