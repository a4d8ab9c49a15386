use serde::Serialize;

/// Axis-aligned rectangle locating a detected face or eye.
///
/// Coordinates are relative to whatever image the detector ran on: the full
/// frame for faces, the face crop for eyes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Translate a region reported inside `parent` into `parent`'s own
    /// coordinate space.
    pub fn offset_by(&self, parent: &Region) -> Region {
        Region {
            x: parent.x + self.x,
            y: parent.y + self.y,
            width: self.width,
            height: self.height,
        }
    }

    /// Bottom-right corner (exclusive).
    pub fn bottom_right(&self) -> (i32, i32) {
        (self.x + self.width, self.y + self.height)
    }

    /// Intersect with an image of the given size. `None` if nothing remains.
    pub fn clamp_to(&self, width: i32, height: i32) -> Option<Region> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let (x1, y1) = self.bottom_right();
        let x1 = x1.min(width);
        let y1 = y1.min(height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Region::new(x0, y0, x1 - x0, y1 - y0))
    }
}

/// What the detectors saw in a single frame, reduced to the inputs the
/// liveness evaluator needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// The face detector returned nothing.
    NoFace,
    /// At least one face; `eyes` counts eye regions inside the first one.
    Face { eyes: usize },
}

impl Detection {
    /// Build from the two booleans the frame loop derives. `eye_found` is
    /// ignored when no face was found.
    pub fn from_flags(face_found: bool, eye_found: bool) -> Self {
        if face_found {
            Detection::Face {
                eyes: usize::from(eye_found),
            }
        } else {
            Detection::NoFace
        }
    }
}
