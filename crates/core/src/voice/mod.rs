//! Voice characteristics used for rate decisions.

pub mod profiles;

pub use profiles::{VoiceProfile, VoiceProfiles};
