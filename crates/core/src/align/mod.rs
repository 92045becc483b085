//! Duration alignment of synthesized segments.

pub mod duration;

pub use duration::{
    align_duration, decide_alignment, AlignDecision, AlignOutcome, NoStretcher,
    SignalsmithStretcher, StretchBounds, TimeStretcher, DEFAULT_TOLERANCE_MS,
};
