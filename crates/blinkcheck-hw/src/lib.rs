//! blinkcheck-hw: OpenCV boundary.
//!
//! Everything that touches a device, a model file, or a window lives here:
//! camera capture, Haar cascade detection, the HighGUI display and still
//! image files. The liveness logic itself stays in `blinkcheck-core`.

pub mod camera;
pub mod cascade;
pub mod display;
pub mod still;

pub use camera::{Camera, CameraError};
pub use cascade::{CascadeDetector, CascadeParams, DetectorError};
pub use display::{annotate, Display, DisplayError, KEY_ESCAPE};
pub use still::StillError;
