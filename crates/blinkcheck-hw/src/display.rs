use blinkcheck_core::{FrameReport, Region, Verdict};
use opencv::core::{Mat, Point, Scalar};
use opencv::highgui;
use opencv::imgproc;
use thiserror::Error;

use crate::cascade::rect_from_region;

/// Key code `wait_for_key` reports for Escape.
pub const KEY_ESCAPE: i32 = 27;

/// Face boxes and the spoof verdict are red (BGR).
pub fn face_color() -> Scalar {
    Scalar::new(0.0, 0.0, 255.0, 0.0)
}

/// Eye boxes and the real verdict are green (BGR).
pub fn eye_color() -> Scalar {
    Scalar::new(0.0, 255.0, 0.0, 0.0)
}

const BOX_THICKNESS: i32 = 2;

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("opencv error: {0}")]
    OpenCv(#[from] opencv::Error),
}

/// A HighGUI window. All windows are torn down on drop.
pub struct Display {
    window: String,
}

impl Display {
    pub fn open(window: &str) -> Result<Self, DisplayError> {
        highgui::named_window(window, highgui::WINDOW_AUTOSIZE)?;
        Ok(Self {
            window: window.to_string(),
        })
    }

    pub fn window(&self) -> &str {
        &self.window
    }

    pub fn show(&self, frame: &Mat) -> Result<(), DisplayError> {
        highgui::imshow(&self.window, frame)?;
        Ok(())
    }

    /// Pump the GUI event loop for up to `timeout_ms` (at least 1 ms, since 0
    /// would block indefinitely) and return the key pressed, if any.
    pub fn wait_for_key(&self, timeout_ms: i32) -> Result<Option<i32>, DisplayError> {
        let key = highgui::wait_key(timeout_ms.max(1))?;
        Ok((key >= 0).then_some(key & 0xFF))
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_all_windows() {
            tracing::warn!(window = %self.window, error = %e, "failed to close windows");
        }
    }
}

pub fn draw_region(frame: &mut Mat, region: &Region, color: Scalar) -> Result<(), DisplayError> {
    outline(frame, region, color, BOX_THICKNESS)?;
    Ok(())
}

/// Rectangle outline of `region` with the given stroke width.
pub fn outline(frame: &mut Mat, region: &Region, color: Scalar, thickness: i32) -> opencv::Result<()> {
    imgproc::rectangle(
        frame,
        rect_from_region(region),
        color,
        thickness,
        imgproc::LINE_8,
        0,
    )
}

pub fn draw_verdict(frame: &mut Mat, verdict: Verdict) -> Result<(), DisplayError> {
    let color = match verdict {
        Verdict::Real => eye_color(),
        Verdict::Spoof => face_color(),
    };
    imgproc::put_text(
        frame,
        &format!("Liveness: {verdict}"),
        Point::new(10, 30),
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.8,
        color,
        2,
        imgproc::LINE_8,
        false,
    )?;
    Ok(())
}

/// Draw the primary face, its eyes, and the verdict onto `frame`.
pub fn annotate(frame: &mut Mat, report: &FrameReport) -> Result<(), DisplayError> {
    if let Some(face) = &report.face {
        draw_region(frame, face, face_color())?;
    }
    for eye in &report.eyes {
        draw_region(frame, eye, eye_color())?;
    }
    draw_verdict(frame, report.verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Vec3b, CV_8UC3};
    use opencv::prelude::*;

    fn blank(rows: i32, cols: i32) -> Mat {
        Mat::new_rows_cols_with_default(rows, cols, CV_8UC3, Scalar::all(0.0)).unwrap()
    }

    fn pixel(frame: &Mat, row: i32, col: i32) -> [u8; 3] {
        let px = frame.at_2d::<Vec3b>(row, col).unwrap();
        [px[0], px[1], px[2]]
    }

    #[test]
    fn draw_region_outlines_in_color() {
        let mut frame = blank(100, 100);
        draw_region(&mut frame, &Region::new(10, 10, 50, 50), face_color()).unwrap();

        assert_eq!(pixel(&frame, 10, 30), [0, 0, 255]);
        // interior untouched
        assert_eq!(pixel(&frame, 35, 35), [0, 0, 0]);
    }

    #[test]
    fn annotate_draws_face_and_translated_eyes() {
        let mut frame = blank(200, 200);
        let report = FrameReport {
            face: Some(Region::new(20, 60, 150, 120)),
            eyes: vec![Region::new(50, 100, 30, 30)],
            is_live: true,
            verdict: Verdict::Real,
        };
        annotate(&mut frame, &report).unwrap();

        assert_eq!(pixel(&frame, 60, 100), [0, 0, 255]);
        assert_eq!(pixel(&frame, 100, 65), [0, 255, 0]);
    }

    #[test]
    fn annotate_without_face_only_writes_verdict() {
        let mut frame = blank(120, 320);
        let report = FrameReport {
            face: None,
            eyes: Vec::new(),
            is_live: false,
            verdict: Verdict::Spoof,
        };
        annotate(&mut frame, &report).unwrap();

        // nothing drawn below the text band
        assert_eq!(pixel(&frame, 100, 160), [0, 0, 0]);
    }
}
