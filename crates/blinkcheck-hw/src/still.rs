//! Face detection on a single image file, without a camera.

use std::path::{Path, PathBuf};

use blinkcheck_core::Region;
use opencv::core::{Mat, Vector};
use opencv::imgcodecs;
use opencv::prelude::*;
use thiserror::Error;

use crate::cascade::CascadeParams;
use crate::display::{face_color, outline};

/// Stroke width of face boxes written to still images.
const STILL_BOX_THICKNESS: i32 = 3;

/// Smallest face, as a fraction of the image height.
const MIN_FACE_FRACTION: f32 = 0.2;

#[derive(Error, Debug)]
pub enum StillError {
    #[error("image path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),
    #[error("could not decode image: {0}")]
    Unreadable(PathBuf),
    #[error("could not encode image: {0}")]
    Unwritable(PathBuf),
    #[error("opencv error: {0}")]
    OpenCv(#[from] opencv::Error),
}

fn path_str(path: &Path) -> Result<&str, StillError> {
    path.to_str()
        .ok_or_else(|| StillError::NonUtf8Path(path.to_path_buf()))
}

/// Smallest face side searched for in an image `height` pixels tall:
/// a fifth of the height, rounded, and never negative.
pub fn min_face_size(height: i32) -> i32 {
    ((height as f32) * MIN_FACE_FRACTION).round().max(0.0) as i32
}

/// Face detector tuning for a still image: the live defaults with the
/// minimum size scaled to the image.
pub fn still_params(height: i32) -> CascadeParams {
    CascadeParams {
        min_size: min_face_size(height),
        ..CascadeParams::default()
    }
}

/// Decode a color image. OpenCV reports unreadable files as an empty matrix.
pub fn load_image(path: &Path) -> Result<Mat, StillError> {
    let image = imgcodecs::imread(path_str(path)?, imgcodecs::IMREAD_COLOR)?;
    if image.empty() {
        return Err(StillError::Unreadable(path.to_path_buf()));
    }
    Ok(image)
}

/// Encode `image` to `path`; the format follows the extension.
pub fn save_image(path: &Path, image: &Mat) -> Result<(), StillError> {
    if !imgcodecs::imwrite(path_str(path)?, image, &Vector::new())? {
        return Err(StillError::Unwritable(path.to_path_buf()));
    }
    Ok(())
}

/// Outline every face in red.
pub fn mark_faces(image: &mut Mat, faces: &[Region]) -> Result<(), StillError> {
    for face in faces {
        outline(image, face, face_color(), STILL_BOX_THICKNESS)?;
    }
    Ok(())
}
