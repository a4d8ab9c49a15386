//! blinkcheck-core: blink-based liveness heuristic.
//!
//! Pure logic with no camera or vision dependency: the evaluator that turns
//! per-frame face/eye detections into a liveness verdict, and the tracker that
//! carries its state from one frame to the next.

pub mod liveness;
pub mod tracker;
pub mod types;

pub use liveness::{LivenessPolicy, LivenessState, Verdict};
pub use tracker::{FrameReport, LivenessTracker};
pub use types::{Detection, Region};
