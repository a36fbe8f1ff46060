/// Capture readiness quality signals
///
/// Alignment scoring from the motion stream and the human-readable status
/// line derived from alignment plus the latest marker check.
pub mod alignment;
pub mod status;

pub use alignment::{clamp01, score_sample, AlignmentMetrics, AlignmentTracker};
pub use status::status_message;
