use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("failed to open camera {index}")]
    OpenFailed { index: i32 },
    #[error("opencv error: {0}")]
    OpenCv(#[from] opencv::Error),
}

/// An opened capture device.
///
/// The device is released when the value is dropped, so every exit path out
/// of the frame loop gives the camera back.
pub struct Camera {
    capture: VideoCapture,
    pub index: i32,
    pub width: i32,
    pub height: i32,
}

impl Camera {
    /// Open device `index` and request a `width`×`height` frame size.
    ///
    /// The driver may grant a different size; the granted one is stored in
    /// `width`/`height`. No retry and no fallback device.
    pub fn open(index: i32, width: i32, height: i32) -> Result<Self, CameraError> {
        let mut capture = VideoCapture::new(index, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(CameraError::OpenFailed { index });
        }

        capture.set(videoio::CAP_PROP_FRAME_WIDTH, f64::from(width))?;
        capture.set(videoio::CAP_PROP_FRAME_HEIGHT, f64::from(height))?;

        let granted_width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32;
        let granted_height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32;
        if granted_width != width || granted_height != height {
            tracing::warn!(
                requested_width = width,
                requested_height = height,
                granted_width,
                granted_height,
                "camera did not accept requested frame size"
            );
        }

        Ok(Self {
            capture,
            index,
            width: granted_width,
            height: granted_height,
        })
    }

    /// Read the most recent frame into `frame`, reusing its buffer.
    ///
    /// Returns `false` when the driver had nothing new; `frame` may then be
    /// empty or hold the previous image.
    pub fn capture_frame(&mut self, frame: &mut Mat) -> Result<bool, CameraError> {
        let grabbed = self.capture.read(frame)?;
        Ok(grabbed && !frame.empty())
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        match self.capture.release() {
            Ok(()) => tracing::debug!(index = self.index, "camera released"),
            Err(e) => tracing::warn!(index = self.index, error = %e, "camera release failed"),
        }
    }
}
