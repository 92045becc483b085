//! Two-phase voiceover build.
//!
//! Phase 1 plans every segment (matching, rate, smoothing). Phase 2
//! synthesizes, aligns and assembles in subtitle order.

pub mod assembler;
pub mod build;
pub mod plan;

pub use assembler::{Placement, Timeline};
pub use build::{build, Collaborators};
pub use plan::{plan_segments, smooth_plan, RateDecision, SegmentPlan};
