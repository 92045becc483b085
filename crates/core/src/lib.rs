//! Subtitle-driven voiceover synthesis with timing reconciliation.

pub mod align;
pub mod audio;
pub mod cache;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod quality;
pub mod subtitle;
pub mod synth;
pub mod timing;
pub mod transcribe;
pub mod types;
pub mod voice;
