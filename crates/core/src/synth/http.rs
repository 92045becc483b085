//! OpenAI-compatible speech endpoint (e.g. openai-edge-tts).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::io::decode_audio_bytes;
use crate::error::SynthesisError;
use crate::synth::{SynthesisRequest, Synthesizer};
use crate::types::AudioBuffer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpSynthesizerConfig {
    /// Full URL of the speech endpoint
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// "mp3" or "wav"
    pub response_format: String,
    pub timeout_s: u64,
}

impl Default for HttpSynthesizerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5050/v1/audio/speech".to_string(),
            api_key: None,
            model: "tts-1".to_string(),
            response_format: "mp3".to_string(),
            timeout_s: 60,
        }
    }
}

#[derive(Serialize)]
struct SpeechBody<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
    speed: f64,
}

pub struct HttpSynthesizer {
    config: HttpSynthesizerConfig,
    client: reqwest::blocking::Client,
}

impl HttpSynthesizer {
    pub fn new(config: HttpSynthesizerConfig) -> Result<Self, SynthesisError> {
        if config.url.trim().is_empty() {
            return Err(SynthesisError::NotConfigured("empty TTS URL".into()));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_s.max(1)))
            .build()
            .map_err(|e| SynthesisError::NotConfigured(format!("HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &HttpSynthesizerConfig {
        &self.config
    }
}

impl Synthesizer for HttpSynthesizer {
    fn name(&self) -> &str {
        "http"
    }

    fn cache_tag(&self) -> String {
        format!(
            "http|{}|{}|{}",
            self.config.url, self.config.model, self.config.response_format
        )
    }

    fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioBuffer, SynthesisError> {
        let body = SpeechBody {
            model: &self.config.model,
            input: &request.text,
            voice: &request.voice,
            response_format: &self.config.response_format,
            speed: request.speed(),
        };

        let mut builder = self.client.post(&self.config.url).json(&body);
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .map_err(|e| SynthesisError::Unreachable(format!("{}: {}", self.config.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(SynthesisError::Backend {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let bytes = response
            .bytes()
            .map_err(|e| SynthesisError::Unreachable(format!("reading response: {}", e)))?;

        decode_audio_bytes(&bytes, &self.config.response_format)
            .map_err(|e| SynthesisError::Decode(format!("{:#}", e)))
    }
}
