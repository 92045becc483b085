//! Per-voice speaking-rate profiles.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::BuildError;

pub const DEFAULT_BASELINE_WPM: u32 = 150;
pub const DEFAULT_MIN_RATE: i32 = -35;
pub const DEFAULT_MAX_RATE: i32 = 35;

/// Baseline speaking speed and comfortable rate range for one voice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub display_name: String,
    pub baseline_wpm: u32,
    pub min_rate: i32,
    pub max_rate: i32,
    /// Pause length (seconds) the voice renders naturally
    pub natural_pause_threshold: f64,
    pub characteristics: String,
}

impl VoiceProfile {
    /// Profile used for voices missing from the table.
    pub fn fallback(voice_id: &str) -> Self {
        Self {
            display_name: voice_id.to_string(),
            baseline_wpm: DEFAULT_BASELINE_WPM,
            min_rate: DEFAULT_MIN_RATE,
            max_rate: DEFAULT_MAX_RATE,
            natural_pause_threshold: 0.3,
            characteristics: "Unknown voice (using default)".to_string(),
        }
    }

    /// Reject profiles the rate calculator cannot use.
    pub fn validate(&self, voice_id: &str) -> Result<(), BuildError> {
        if self.baseline_wpm == 0 {
            return Err(BuildError::invalid_config(format!(
                "voice profile {}: baseline_wpm must be positive",
                voice_id
            )));
        }
        if self.min_rate > self.max_rate {
            return Err(BuildError::invalid_config(format!(
                "voice profile {}: min_rate {} exceeds max_rate {}",
                voice_id, self.min_rate, self.max_rate
            )));
        }
        if self.natural_pause_threshold.is_nan() || self.natural_pause_threshold < 0.0 {
            return Err(BuildError::invalid_config(format!(
                "voice profile {}: natural_pause_threshold must not be negative",
                voice_id
            )));
        }
        Ok(())
    }
}

// (id, display name, wpm, min, max, pause, characteristics)
type ProfileRow = (&'static str, &'static str, u32, i32, i32, f64, &'static str);

lazy_static::lazy_static! {
    static ref BUILTIN_PROFILES: Vec<ProfileRow> = vec![
        ("en-US-AndrewMultilingualNeural", "Andrew (US Male, Multilingual)", 155, -35, 35, 0.3, "Clear, professional, neutral"),
        ("en-US-GuyNeural", "Guy (US Male)", 150, -40, 40, 0.35, "Young, professional"),
        ("en-US-EmmaMultilingualNeural", "Emma (US Female, Multilingual)", 160, -40, 40, 0.25, "Clear, engaging, professional"),
        ("en-US-JennyNeural", "Jenny (US Female)", 165, -35, 35, 0.25, "Friendly, conversational"),
        ("en-US-AriaNeural", "Aria (US Female)", 158, -38, 38, 0.28, "Natural, expressive"),
        ("en-GB-RyanNeural", "Ryan (UK Male)", 145, -40, 35, 0.4, "Friendly, approachable"),
        ("en-GB-LibbyNeural", "Libby (UK Female)", 150, -40, 35, 0.35, "Clear, friendly"),
        ("en-AU-DuncanNeural", "Duncan (AU Male)", 152, -35, 35, 0.32, "Casual, friendly"),
        ("en-AU-NatashaNeural", "Natasha (AU Female)", 155, -35, 35, 0.3, "Friendly, professional"),
        ("en-IN-NeerjaNeural", "Neerja (India Female)", 160, -30, 40, 0.25, "Expressive, engaging"),
        ("en-IN-PrabhatNeural", "Prabhat (India Male)", 158, -35, 35, 0.28, "Professional, clear"),
        ("es-ES-AlvaroNeural", "Álvaro (Spain Male)", 148, -40, 35, 0.35, "Formal, professional"),
        ("es-MX-JorgeNeural", "Jorge (Mexico Male)", 155, -35, 40, 0.3, "Friendly, casual"),
        ("fr-FR-HenriNeural", "Henri (France Male)", 140, -40, 35, 0.4, "Formal, educated"),
        ("fr-FR-DeniseNeural", "Denise (France Female)", 145, -40, 35, 0.38, "Professional, clear"),
        ("de-DE-KayanNeural", "Kayan (Germany Male)", 135, -40, 30, 0.45, "Professional, formal"),
        ("it-IT-DiegoNeural", "Diego (Italy Male)", 150, -35, 35, 0.3, "Expressive, warm"),
        // Japanese and Mandarin baselines count morae/syllables, not words
        ("ja-JP-KeitaNeural", "Keita (Japan Male)", 130, -30, 40, 0.4, "Clear, professional"),
        ("zh-CN-YunxiNeural", "Yunxi (China Male)", 125, -30, 40, 0.35, "Clear, professional"),
    ];
}

/// Immutable voice-id → profile table. Lookups never fail.
#[derive(Debug, Clone)]
pub struct VoiceProfiles {
    profiles: HashMap<String, VoiceProfile>,
    default: VoiceProfile,
}

impl Default for VoiceProfiles {
    fn default() -> Self {
        Self::builtin()
    }
}

impl VoiceProfiles {
    /// Table with the bundled neural voices.
    pub fn builtin() -> Self {
        let profiles = BUILTIN_PROFILES
            .iter()
            .map(|&(id, name, wpm, min, max, pause, traits)| {
                (
                    id.to_string(),
                    VoiceProfile {
                        display_name: name.to_string(),
                        baseline_wpm: wpm,
                        min_rate: min,
                        max_rate: max,
                        natural_pause_threshold: pause,
                        characteristics: traits.to_string(),
                    },
                )
            })
            .collect();
        Self::from_map(profiles)
    }

    /// Table with no known voices; every lookup yields the default profile.
    pub fn empty() -> Self {
        Self::from_map(HashMap::new())
    }

    pub fn from_map(profiles: HashMap<String, VoiceProfile>) -> Self {
        Self {
            profiles,
            default: VoiceProfile::fallback("default"),
        }
    }

    /// Builtin table plus user-supplied overrides.
    pub fn with_overrides(mut self, overrides: HashMap<String, VoiceProfile>) -> Self {
        self.profiles.extend(overrides);
        self
    }

    /// Check every profile, in voice id order.
    pub fn validate(&self) -> Result<(), BuildError> {
        let mut ids: Vec<&String> = self.profiles.keys().collect();
        ids.sort();
        for id in ids {
            self.profiles[id].validate(id)?;
        }
        Ok(())
    }

    /// Profile for `voice_id`, or the default profile.
    pub fn lookup(&self, voice_id: &str) -> &VoiceProfile {
        self.profiles.get(voice_id).unwrap_or(&self.default)
    }

    pub fn contains(&self, voice_id: &str) -> bool {
        self.profiles.contains_key(voice_id)
    }

    /// All voices as (id, profile), sorted by display name.
    pub fn list(&self) -> Vec<(&str, &VoiceProfile)> {
        let mut voices: Vec<(&str, &VoiceProfile)> = self
            .profiles
            .iter()
            .map(|(id, p)| (id.as_str(), p))
            .collect();
        voices.sort_by(|a, b| a.1.display_name.cmp(&b.1.display_name));
        voices
    }

    /// Voices whose id starts with `prefix` (e.g. "en-US"), sorted by id.
    pub fn for_language(&self, prefix: &str) -> Vec<(&str, &VoiceProfile)> {
        let mut voices: Vec<(&str, &VoiceProfile)> = self
            .profiles
            .iter()
            .filter(|(id, _)| id.starts_with(prefix))
            .map(|(id, p)| (id.as_str(), p))
            .collect();
        voices.sort_by(|a, b| a.0.cmp(b.0));
        voices
    }
}
