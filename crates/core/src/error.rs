//! Typed errors at the collaborator seams.

use thiserror::Error;

/// Failure of the speech synthesis backend.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("synthesis backend not configured: {0}")]
    NotConfigured(String),
    #[error("synthesis backend unreachable: {0}")]
    Unreachable(String),
    #[error("synthesis backend returned status {status}: {message}")]
    Backend { status: u16, message: String },
    #[error("could not decode synthesized audio: {0}")]
    Decode(String),
    #[error("could not resample synthesized audio: {0}")]
    Resample(String),
    #[error("synthesis cache error: {0}")]
    Cache(String),
}

/// Failure of the pitch-preserving time-stretch primitive.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StretchError {
    #[error("cannot stretch an empty buffer")]
    EmptyBuffer,
    #[error("invalid stretch ratio {0}")]
    InvalidRatio(f64),
    #[error("buffer contains non-finite samples")]
    NonFiniteSamples,
    #[error("stretch backend failed: {0}")]
    Backend(String),
}

/// Failure reading or producing transcription data.
#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("transcription JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("transcription backend failed: {0}")]
    Backend(String),
}

/// Errors that stop a build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("elastic timing requires word timings, but none were supplied")]
    ElasticWithoutWordTimings,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("segment {index} failed after {succeeded} segment(s) succeeded: {source}")]
    SegmentFailed {
        index: usize,
        succeeded: usize,
        #[source]
        source: SynthesisError,
    },
}

impl BuildError {
    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}
