//! Subtitle parsing, speaker labels, and SRT output.

pub mod speaker;
pub mod srt;

pub use speaker::{extract_speaker, voice_for_speaker, SpeakerContext, SpeakerStatistics};
pub use srt::{cues_to_segments, parse_srt, read_srt, write_srt, SrtCue};
