//! `blinkcheck run`: the live camera loop.

use std::io;
use std::time::Instant;

use anyhow::{Context, Result};
use blinkcheck_core::LivenessTracker;
use blinkcheck_hw::{annotate, Camera, CascadeDetector, CascadeParams, Display, KEY_ESCAPE};
use chrono::Utc;
use opencv::core::Mat;

use crate::config::Config;
use crate::report::Reporter;

/// Run until Escape is pressed (or `max_frames` frames were evaluated).
///
/// Classifiers are loaded before the camera is opened, so a missing asset
/// never leaves the device claimed. Camera and window are released on every
/// return path by their guards.
pub fn run(config: &Config, max_frames: Option<u64>) -> Result<()> {
    let face_path = config.face_cascade_path();
    let eye_path = config.eye_cascade_path();

    let mut face_detector = CascadeDetector::load(&face_path, CascadeParams::default())
        .with_context(|| format!("failed to load face cascade {}", face_path.display()))?;
    let mut eye_detector = CascadeDetector::load(&eye_path, CascadeParams::default())
        .with_context(|| format!("failed to load eye cascade {}", eye_path.display()))?;
    tracing::info!(
        face = %face_detector.path().display(),
        eye = %eye_detector.path().display(),
        "cascades loaded"
    );

    let mut camera =
        match Camera::open(config.camera_index, config.frame_width, config.frame_height) {
            Ok(camera) => camera,
            Err(e) => {
                tracing::error!(index = config.camera_index, error = %e, "camera unavailable");
                return Err(e).context("failed to open the camera");
            }
        };
    tracing::info!(
        index = camera.index,
        width = camera.width,
        height = camera.height,
        "camera opened"
    );

    let display = Display::open(&config.window_name).context("failed to open preview window")?;

    let policy = config.liveness_policy();
    tracing::info!(policy = policy.name(), ?policy, "liveness policy");
    let mut tracker = LivenessTracker::new(policy, Instant::now());
    let mut reporter = Reporter::new(config.output, io::stdout().lock());

    tracing::info!(window = display.window(), "running; press Esc to quit");

    let mut frame = Mat::default();
    loop {
        if camera.capture_frame(&mut frame)? {
            let faces = face_detector.detect(&frame)?;
            let report = tracker.observe(&faces, Instant::now(), |face| {
                eye_detector.detect_in(&frame, face)
            })?;
            tracing::trace!(
                faces = faces.len(),
                eyes = report.eyes.len(),
                live = report.is_live,
                "frame evaluated"
            );

            annotate(&mut frame, &report)?;
            display.show(&frame)?;
            reporter.emit(&report, Utc::now())?;
        } else {
            tracing::debug!("camera returned no frame");
        }

        if display.wait_for_key(config.key_poll_ms)? == Some(KEY_ESCAPE) {
            tracing::info!("escape pressed");
            break;
        }
        if max_frames.is_some_and(|max| reporter.frames() >= max) {
            tracing::info!(frames = reporter.frames(), "frame limit reached");
            break;
        }
    }

    tracing::info!(frames = reporter.frames(), "stopped");
    Ok(())
}
