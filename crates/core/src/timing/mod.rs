//! Word-timing matching and speech-rate decisions.

pub mod matcher;
pub mod rate;
pub mod similarity;
pub mod smoothing;

pub use matcher::{match_words_to_segment, MatchResult, TimingStrategy, DEFAULT_FUZZY_THRESHOLD};
pub use rate::{RateCalculation, RateCalculator, RateWindow};
pub use smoothing::{smooth_rates, smooth_rates_with, DEFAULT_MAX_RATE_CHANGE};
