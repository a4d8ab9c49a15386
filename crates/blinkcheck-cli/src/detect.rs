//! `blinkcheck detect`: run the face cascade over one image file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use blinkcheck_hw::still::{load_image, mark_faces, save_image, still_params};
use blinkcheck_hw::CascadeDetector;
use opencv::prelude::*;

/// Default for `--output`.
pub const DEFAULT_OUTPUT: &str = "images/output.jpg";

/// Make sure the directory `path` is written into exists.
fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display())),
        _ => Ok(()),
    }
}

/// Detect faces in `image`, outline them, write the result and return the
/// face count.
pub fn run(face_cascade: &Path, image: &Path, output: &Path) -> Result<usize> {
    let mut picture =
        load_image(image).with_context(|| format!("failed to read {}", image.display()))?;

    let params = still_params(picture.rows());
    let mut detector = CascadeDetector::load(face_cascade, params)
        .with_context(|| format!("failed to load face cascade {}", face_cascade.display()))?;

    let faces = detector.detect(&picture)?;
    tracing::info!(
        image = %image.display(),
        height = picture.rows(),
        min_size = params.min_size,
        faces = faces.len(),
        "still image scanned"
    );

    mark_faces(&mut picture, &faces)?;

    ensure_parent(output)?;
    save_image(output, &picture).with_context(|| format!("failed to write {}", output.display()))?;

    println!("Write success: {}", faces.len());
    Ok(faces.len())
}
