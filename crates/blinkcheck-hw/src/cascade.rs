use std::path::{Path, PathBuf};

use blinkcheck_core::Region;
use opencv::core::{Mat, Rect, Size, Vector};
use opencv::imgproc::{cvt_color, equalize_hist, COLOR_BGR2GRAY};
use opencv::objdetect::{self, CascadeClassifier};
use opencv::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("cascade file not found: {0}")]
    Missing(PathBuf),
    #[error("cascade path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),
    #[error("cascade loaded no stages: {0}")]
    EmptyClassifier(PathBuf),
    #[error("opencv error: {0}")]
    OpenCv(#[from] opencv::Error),
}

/// `detectMultiScale` tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeParams {
    pub scale_factor: f64,
    pub min_neighbors: i32,
    /// Smallest object side, in pixels.
    pub min_size: i32,
}

impl Default for CascadeParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.1,
            min_neighbors: 2,
            min_size: 30,
        }
    }
}

/// A Haar cascade loaded from disk.
pub struct CascadeDetector {
    classifier: CascadeClassifier,
    params: CascadeParams,
    path: PathBuf,
}

impl CascadeDetector {
    /// Load a cascade file. Fails if the file is absent or OpenCV ends up
    /// with an empty classifier, instead of detecting nothing forever.
    pub fn load(path: &Path, params: CascadeParams) -> Result<Self, DetectorError> {
        if !path.exists() {
            return Err(DetectorError::Missing(path.to_path_buf()));
        }
        let path_str = path
            .to_str()
            .ok_or_else(|| DetectorError::NonUtf8Path(path.to_path_buf()))?;

        let classifier = CascadeClassifier::new(path_str)?;
        if classifier.empty()? {
            return Err(DetectorError::EmptyClassifier(path.to_path_buf()));
        }

        tracing::debug!(path = %path.display(), ?params, "cascade loaded");

        Ok(Self {
            classifier,
            params,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Detect objects in a BGR (or already grayscale) image. Regions come
    /// back in detector order; callers treat the first as primary.
    pub fn detect(&mut self, image: &Mat) -> Result<Vec<Region>, DetectorError> {
        let equalized = prepare_gray(image)?;

        let mut found = Vector::<Rect>::new();
        self.classifier.detect_multi_scale(
            &equalized,
            &mut found,
            self.params.scale_factor,
            self.params.min_neighbors,
            objdetect::CASCADE_SCALE_IMAGE,
            Size::new(self.params.min_size, self.params.min_size),
            Size::new(0, 0),
        )?;

        Ok(found.iter().map(region_from_rect).collect())
    }

    /// Detect inside `region` of `frame`. Results are relative to the
    /// region's origin. A region entirely outside the frame yields nothing.
    pub fn detect_in(&mut self, frame: &Mat, region: &Region) -> Result<Vec<Region>, DetectorError> {
        match crop_region(frame, region)? {
            Some(crop) => self.detect(&crop),
            None => Ok(Vec::new()),
        }
    }
}

/// Copy of the part of `region` that lies inside `frame`, or `None` when
/// they do not overlap.
fn crop_region(frame: &Mat, region: &Region) -> Result<Option<Mat>, opencv::Error> {
    let Some(bounded) = region.clamp_to(frame.cols(), frame.rows()) else {
        return Ok(None);
    };
    let crop = Mat::roi(frame, rect_from_region(&bounded))?.try_clone()?;
    Ok(Some(crop))
}

/// Grayscale + histogram equalization, the input both cascades expect.
fn prepare_gray(image: &Mat) -> Result<Mat, opencv::Error> {
    let gray = if image.channels() == 1 {
        image.try_clone()?
    } else {
        let mut gray = Mat::default();
        cvt_color(image, &mut gray, COLOR_BGR2GRAY, 0)?;
        gray
    };

    let mut equalized = Mat::default();
    equalize_hist(&gray, &mut equalized)?;
    Ok(equalized)
}

pub fn rect_from_region(region: &Region) -> Rect {
    Rect::new(region.x, region.y, region.width, region.height)
}

pub fn region_from_rect(rect: Rect) -> Region {
    Region::new(rect.x, rect.y, rect.width, rect.height)
}
