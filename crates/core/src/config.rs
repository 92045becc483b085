//! Build and application configuration.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::align::{StretchBounds, DEFAULT_TOLERANCE_MS};
use crate::error::BuildError;
use crate::timing::{DEFAULT_FUZZY_THRESHOLD, DEFAULT_MAX_RATE_CHANGE};
use crate::voice::{VoiceProfile, VoiceProfiles};

pub const DEFAULT_VOICE: &str = "en-US-AndrewMultilingualNeural";
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// What to do when synthesizing a segment fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Insert silence for the segment window and record an issue
    #[default]
    Placeholder,
    /// Stop the build
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StretchPreset {
    #[default]
    Conservative,
    Loose,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StretchSettings {
    pub enabled: bool,
    pub preset: StretchPreset,
    /// Overrides the preset's lower bound
    pub min_ratio: Option<f64>,
    /// Overrides the preset's upper bound
    pub max_ratio: Option<f64>,
}

impl Default for StretchSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            preset: StretchPreset::Conservative,
            min_ratio: None,
            max_ratio: None,
        }
    }
}

impl StretchSettings {
    /// Effective bounds, or `None` when stretching is off.
    pub fn bounds(&self) -> Option<StretchBounds> {
        if !self.enabled {
            return None;
        }
        let base = match self.preset {
            StretchPreset::Conservative => StretchBounds::CONSERVATIVE,
            StretchPreset::Loose => StretchBounds::LOOSE,
        };
        Some(StretchBounds {
            min_ratio: self.min_ratio.unwrap_or(base.min_ratio),
            max_ratio: self.max_ratio.unwrap_or(base.max_ratio),
        })
    }
}

/// Parameters of one build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub default_voice: String,
    /// Speaker label -> voice id
    pub speaker_voices: HashMap<String, String>,
    /// Rate used when no trusted word timings exist (percent)
    pub default_rate: i32,
    pub volume_percent: i32,
    pub pitch_hz: i32,
    #[serde(alias = "timing_tolerance_ms")]
    pub tolerance_ms: i64,
    /// Output sample rate; synthesized audio is resampled to it
    pub sample_rate: u32,
    pub fuzzy_threshold: f64,
    /// Borrow silence from neighbouring gaps for fast segments
    pub elastic_timing: bool,
    /// Use per-voice baseline speed instead of 150 wpm
    pub use_voice_profiles: bool,
    pub rate_smoothing: bool,
    pub max_rate_change: i32,
    pub stretch: StretchSettings,
    pub failure_policy: FailurePolicy,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            default_voice: DEFAULT_VOICE.to_string(),
            speaker_voices: HashMap::new(),
            default_rate: 0,
            volume_percent: 0,
            pitch_hz: 0,
            tolerance_ms: DEFAULT_TOLERANCE_MS,
            sample_rate: DEFAULT_SAMPLE_RATE,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            elastic_timing: false,
            use_voice_profiles: true,
            rate_smoothing: true,
            max_rate_change: DEFAULT_MAX_RATE_CHANGE,
            stretch: StretchSettings::default(),
            failure_policy: FailurePolicy::Placeholder,
        }
    }
}

impl BuildConfig {
    /// Reject settings no build can run with.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.default_voice.trim().is_empty() {
            return Err(BuildError::invalid_config("default_voice is empty"));
        }
        if self.sample_rate == 0 {
            return Err(BuildError::invalid_config("sample_rate must be positive"));
        }
        if self.tolerance_ms < 0 {
            return Err(BuildError::invalid_config("tolerance_ms must not be negative"));
        }
        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(BuildError::invalid_config(format!(
                "fuzzy_threshold {} is outside [0, 1]",
                self.fuzzy_threshold
            )));
        }
        if self.max_rate_change < 0 {
            return Err(BuildError::invalid_config("max_rate_change must not be negative"));
        }
        if let Some(b) = self.stretch.bounds() {
            if !(b.min_ratio > 0.0 && b.min_ratio <= b.max_ratio) {
                return Err(BuildError::invalid_config(format!(
                    "stretch bounds [{}, {}] are invalid",
                    b.min_ratio, b.max_ratio
                )));
            }
        }
        Ok(())
    }
}

/// Config file contents: backend settings plus build parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(alias = "edge_tts_url")]
    pub tts_url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Audio format requested from the backend ("mp3" or "wav")
    pub response_format: String,
    pub timeout_s: u64,
    /// Cache synthesized segments on disk
    pub cache: bool,
    /// Extra or replacement voice profiles
    pub voice_profiles: HashMap<String, VoiceProfile>,
    #[serde(flatten)]
    pub build: BuildConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tts_url: "http://localhost:5050/v1/audio/speech".to_string(),
            api_key: None,
            model: "tts-1".to_string(),
            response_format: "mp3".to_string(),
            timeout_s: 60,
            cache: true,
            voice_profiles: HashMap::new(),
            build: BuildConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        VoiceProfiles::from_map(config.voice_profiles.clone())
            .validate()
            .with_context(|| format!("Invalid voice profile in config: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Example config with a two-speaker voice map.
    pub fn sample() -> Self {
        let mut config = Self::default();
        config.api_key = Some("your_api_key_here".to_string());
        config.build.speaker_voices = HashMap::from([
            ("Nathan".to_string(), "en-US-AndrewMultilingualNeural".to_string()),
            ("Nicole".to_string(), "en-US-EmmaMultilingualNeural".to_string()),
        ]);
        config
    }

    #[cfg(feature = "http-tts")]
    pub fn http_config(&self) -> crate::synth::HttpSynthesizerConfig {
        crate::synth::HttpSynthesizerConfig {
            url: self.tts_url.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            response_format: self.response_format.clone(),
            timeout_s: self.timeout_s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_defaults() {
        let c = BuildConfig::default();
        assert_eq!(c.tolerance_ms, 150);
        assert_eq!(c.sample_rate, 24000);
        assert_eq!(c.max_rate_change, 15);
        assert_eq!(c.failure_policy, FailurePolicy::Placeholder);
        assert!(c.stretch.bounds().is_none());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_stretch_bounds() {
        let mut s = StretchSettings {
            enabled: true,
            ..Default::default()
        };
        assert_eq!(s.bounds(), Some(StretchBounds::CONSERVATIVE));
        s.preset = StretchPreset::Loose;
        s.max_ratio = Some(1.1);
        let b = s.bounds().unwrap();
        assert_eq!(b.min_ratio, 0.80);
        assert_eq!(b.max_ratio, 1.1);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut c = BuildConfig {
            fuzzy_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(c.validate(), Err(BuildError::InvalidConfig(_))));
        c.fuzzy_threshold = 0.7;
        c.stretch.enabled = true;
        c.stretch.min_ratio = Some(1.3);
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_parse_partial_json() {
        let json = r#"{
            "edge_tts_url": "http://tts.local/v1/audio/speech",
            "default_voice": "en-US-GuyNeural",
            "timing_tolerance_ms": 200,
            "speaker_voices": {"Nathan": "en-US-AndrewMultilingualNeural"},
            "failure_policy": "abort",
            "stretch": {"enabled": true, "preset": "loose"}
        }"#;
        let c: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(c.tts_url, "http://tts.local/v1/audio/speech");
        assert_eq!(c.model, "tts-1");
        assert_eq!(c.build.default_voice, "en-US-GuyNeural");
        assert_eq!(c.build.tolerance_ms, 200);
        assert_eq!(c.build.failure_policy, FailurePolicy::Abort);
        assert_eq!(c.build.stretch.bounds(), Some(StretchBounds::LOOSE));
        assert_eq!(c.build.speaker_voices.len(), 1);
        assert_eq!(c.build.sample_rate, 24000);
    }

    #[test]
    fn test_sample_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let sample = AppConfig::sample();
        sample.save(&path).unwrap();
        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, sample);
    }

    #[test]
    fn test_load_rejects_inverted_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let json = r#"{
            "voice_profiles": {
                "en-US-AndrewMultilingualNeural": {
                    "display_name": "Andrew",
                    "baseline_wpm": 155,
                    "min_rate": 20,
                    "max_rate": -20,
                    "natural_pause_threshold": 0.3,
                    "characteristics": "inverted"
                }
            }
        }"#;
        std::fs::write(&path, json).unwrap();
        let err = AppConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("min_rate 20 exceeds max_rate -20"));
    }
}
