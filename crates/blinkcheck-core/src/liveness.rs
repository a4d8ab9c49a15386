//! Blink-based liveness heuristic.
//!
//! A subject is judged live when the eye detector keeps firing on the primary
//! face at a short enough interval. The default [`LivenessPolicy::RecentBlink`]
//! policy carries one timestamp and one bit of memory between frames; the two
//! other policies are earlier formulations of the same idea, kept selectable
//! for comparison.
//!
//! # Threat Coverage
//!
//! - **Blocks:** nothing reliably. A frame with no face, or a face without
//!   detectable eyes, reads as spoof.
//! - **Does not block:** photographs with open eyes, video replay, printed eye
//!   cutouts. This is a demonstration heuristic, not anti-spoofing.
//!
//! # Stale verdicts
//!
//! Under `RecentBlink`, an eye detection arriving after the window has lapsed
//! changes neither the verdict nor the blink timestamp. Since the timestamp is
//! only ever refreshed from inside the window, once it lapses it stays lapsed:
//! a `Real` verdict is then held until a frame without a face or without eyes
//! clears it, and no later frame can set it again. This mirrors the behaviour
//! the heuristic was first written with and is kept as is.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::types::Detection;

/// Maximum gap between eye detections that still counts as a blink.
pub const DEFAULT_BLINK_WINDOW: Duration = Duration::from_millis(300);

/// Number of eye detections `BlinkWindow` requires inside the window.
pub const DEFAULT_BLINK_COUNT: usize = 3;

/// Eyes the `ConsecutiveFrames` policy expects on the primary face.
pub const DEFAULT_MIN_EYES: usize = 2;

/// How detections are folded into a liveness verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessPolicy {
    /// Live while each eye detection follows the previous one within `window`.
    RecentBlink { window: Duration },
    /// Live once the last `blinks` eye detections span at most `window`.
    BlinkWindow { blinks: usize, window: Duration },
    /// Live after `frames` consecutive frames with at least `min_eyes` eyes.
    ConsecutiveFrames { frames: usize, min_eyes: usize },
}

impl Default for LivenessPolicy {
    fn default() -> Self {
        LivenessPolicy::RecentBlink {
            window: DEFAULT_BLINK_WINDOW,
        }
    }
}

/// State carried across frames. Created once before the first frame.
#[derive(Debug, Clone)]
pub struct LivenessState {
    /// Time of the last eye detection accepted as a blink.
    pub last_blink: Instant,
    pub is_live: bool,
    blinks: VecDeque<Instant>,
    consecutive: usize,
}

impl LivenessState {
    pub fn new(start: Instant) -> Self {
        Self {
            last_blink: start,
            is_live: false,
            blinks: VecDeque::new(),
            consecutive: 0,
        }
    }

    /// Eye detections currently retained by `BlinkWindow`.
    pub fn recorded_blinks(&self) -> usize {
        self.blinks.len()
    }

    /// Current streak counted by `ConsecutiveFrames`.
    pub fn consecutive_frames(&self) -> usize {
        self.consecutive
    }
}

impl LivenessPolicy {
    /// Fold one frame's detection into `state` and return the new verdict.
    ///
    /// Total over its inputs. A `now` earlier than the recorded blink counts
    /// as zero elapsed time. Gaps are compared in whole milliseconds, so
    /// 300.9 ms still falls inside a 300 ms window.
    pub fn evaluate(&self, state: &mut LivenessState, detection: Detection, now: Instant) -> bool {
        let eyes = match detection {
            Detection::NoFace => {
                state.is_live = false;
                return false;
            }
            Detection::Face { eyes } => eyes,
        };

        match *self {
            LivenessPolicy::RecentBlink { window } => {
                if eyes >= 1 {
                    if within(state.last_blink, now, window) {
                        state.is_live = true;
                        state.last_blink = now;
                    }
                } else {
                    state.is_live = false;
                }
            }
            LivenessPolicy::BlinkWindow { blinks, window } => {
                let blinks = blinks.max(1);
                if eyes >= 1 {
                    state.blinks.push_back(now);
                    while state.blinks.len() > blinks {
                        state.blinks.pop_front();
                    }
                    state.last_blink = now;
                    if state.blinks.len() >= blinks {
                        let oldest = state.blinks[0];
                        if within(oldest, now, window) {
                            state.is_live = true;
                        }
                    }
                } else {
                    state.blinks.clear();
                    state.is_live = false;
                }
            }
            LivenessPolicy::ConsecutiveFrames { frames, min_eyes } => {
                if eyes >= min_eyes.max(1) {
                    state.consecutive = state.consecutive.saturating_add(1);
                    state.last_blink = now;
                    if state.consecutive >= frames {
                        state.is_live = true;
                    }
                } else {
                    state.consecutive = 0;
                    state.is_live = false;
                }
            }
        }

        state.is_live
    }

    /// Short name used in configuration and logs.
    pub fn name(&self) -> &'static str {
        match self {
            LivenessPolicy::RecentBlink { .. } => "recent",
            LivenessPolicy::BlinkWindow { .. } => "window",
            LivenessPolicy::ConsecutiveFrames { .. } => "consecutive",
        }
    }
}

/// Whether `now` follows `since` by at most `window`, truncated to milliseconds.
fn within(since: Instant, now: Instant, window: Duration) -> bool {
    now.saturating_duration_since(since).as_millis() <= window.as_millis()
}

/// Per-frame liveness verdict as shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Real,
    Spoof,
}

impl From<bool> for Verdict {
    fn from(is_live: bool) -> Self {
        if is_live {
            Verdict::Real
        } else {
            Verdict::Spoof
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Real => f.write_str("Real"),
            Verdict::Spoof => f.write_str("Spoof"),
        }
    }
}
