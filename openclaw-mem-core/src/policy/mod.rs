//! The policy engine (spec §4.7): auto-recall trivial-prompt gating and
//! auto-capture candidate classification.

pub mod capture;
pub mod secrets;
pub mod trivial;

pub use capture::{classify_turn, CaptureCategory, CaptureConfig, ClassifiedCandidate, RejectReason};
pub use trivial::{classify_default as classify_trivial, TrivialReason};
