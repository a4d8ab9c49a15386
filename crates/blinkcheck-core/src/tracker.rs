use std::time::Instant;

use serde::Serialize;

use crate::liveness::{LivenessPolicy, LivenessState, Verdict};
use crate::types::{Detection, Region};

/// Outcome of folding one frame into the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    /// First face returned by the face detector, in frame coordinates.
    pub face: Option<Region>,
    /// Eyes found inside `face`, translated into frame coordinates.
    pub eyes: Vec<Region>,
    pub is_live: bool,
    pub verdict: Verdict,
}

/// Threads [`LivenessState`] through successive frames.
///
/// Only the first face of each frame is considered. Eye detection runs on
/// that face alone and its results are moved from face-local to frame
/// coordinates before they are reported.
#[derive(Debug, Clone)]
pub struct LivenessTracker {
    policy: LivenessPolicy,
    state: LivenessState,
}

impl LivenessTracker {
    pub fn new(policy: LivenessPolicy, start: Instant) -> Self {
        Self {
            policy,
            state: LivenessState::new(start),
        }
    }

    pub fn state(&self) -> &LivenessState {
        &self.state
    }

    /// Evaluate one frame.
    ///
    /// `detect_eyes` is called at most once, with the primary face. If it
    /// fails, the error is returned and the liveness state is left as it was.
    pub fn observe<F, E>(
        &mut self,
        faces: &[Region],
        now: Instant,
        detect_eyes: F,
    ) -> Result<FrameReport, E>
    where
        F: FnOnce(&Region) -> Result<Vec<Region>, E>,
    {
        let Some(face) = faces.first().copied() else {
            let is_live = self.policy.evaluate(&mut self.state, Detection::NoFace, now);
            return Ok(FrameReport {
                face: None,
                eyes: Vec::new(),
                is_live,
                verdict: Verdict::from(is_live),
            });
        };

        let eyes: Vec<Region> = detect_eyes(&face)?
            .iter()
            .map(|eye| eye.offset_by(&face))
            .collect();

        let detection = Detection::Face { eyes: eyes.len() };
        let is_live = self.policy.evaluate(&mut self.state, detection, now);

        Ok(FrameReport {
            face: Some(face),
            eyes,
            is_live,
            verdict: Verdict::from(is_live),
        })
    }
}
