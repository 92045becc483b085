//! Speech synthesis interface and backends.
//!
//! - `HttpSynthesizer`: OpenAI-compatible `/v1/audio/speech` endpoint
//!   (feature `http-tts`)
//! - `CachedSynthesizer`: content-addressed WAV cache around any backend

#[cfg(feature = "http-tts")]
pub mod http;

use serde::Serialize;

use crate::error::SynthesisError;
use crate::types::AudioBuffer;

pub use crate::cache::CachedSynthesizer;
#[cfg(feature = "http-tts")]
pub use http::{HttpSynthesizer, HttpSynthesizerConfig};

/// One synthesis call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: String,
    /// Speaking-rate change in percent (0 = voice default)
    pub rate_percent: i32,
    pub volume_percent: i32,
    pub pitch_hz: i32,
}

impl SynthesisRequest {
    pub fn new(text: &str, voice: &str) -> Self {
        Self {
            text: text.to_string(),
            voice: voice.to_string(),
            rate_percent: 0,
            volume_percent: 0,
            pitch_hz: 0,
        }
    }

    pub fn with_rate(mut self, rate_percent: i32) -> Self {
        self.rate_percent = rate_percent;
        self
    }

    pub fn with_volume(mut self, volume_percent: i32) -> Self {
        self.volume_percent = volume_percent;
        self
    }

    pub fn with_pitch(mut self, pitch_hz: i32) -> Self {
        self.pitch_hz = pitch_hz;
        self
    }

    /// "+10%" / "-5%" form used in logs and SSML-style backends.
    pub fn rate_string(&self) -> String {
        format!("{:+}%", self.rate_percent)
    }

    pub fn volume_string(&self) -> String {
        format!("{:+}%", self.volume_percent)
    }

    pub fn pitch_string(&self) -> String {
        format!("{:+}Hz", self.pitch_hz)
    }

    /// Playback speed multiplier for speed-based APIs (+20% -> 1.2).
    pub fn speed(&self) -> f64 {
        (1.0 + self.rate_percent as f64 / 100.0).max(0.25)
    }
}

/// Text-to-speech backend.
pub trait Synthesizer: Send + Sync {
    /// Backend name for display.
    fn name(&self) -> &str;

    /// Identifies everything besides the request that changes the rendered
    /// audio (endpoint, model, output format). Part of the cache key.
    fn cache_tag(&self) -> String {
        self.name().to_string()
    }

    /// Render `request` to mono audio at the backend's native rate.
    fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioBuffer, SynthesisError>;
}

impl<S: Synthesizer + ?Sized> Synthesizer for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn cache_tag(&self) -> String {
        (**self).cache_tag()
    }

    fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioBuffer, SynthesisError> {
        (**self).synthesize(request)
    }
}
