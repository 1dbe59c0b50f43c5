use serde::{Deserialize, Serialize};

/// A pair of corresponding pixel coordinates in the left and right images.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatch {
    /// `(x, y)` in the left image.
    pub left: [f64; 2],
    /// `(x, y)` in the right image.
    pub right: [f64; 2],
}

impl FeatureMatch {
    /// Create a match from the two pixel coordinates.
    pub fn new(left: [f64; 2], right: [f64; 2]) -> Self {
        Self { left, right }
    }

    /// Multiply both coordinates by `scale`, as when the images are resized.
    pub fn scaled(&self, scale: f64) -> Self {
        Self {
            left: self.left.map(|v| v * scale),
            right: self.right.map(|v| v * scale),
        }
    }
}

impl From<[f64; 4]> for FeatureMatch {
    /// A match from a `[x1, y1, x2, y2]` row.
    fn from(row: [f64; 4]) -> Self {
        Self::new([row[0], row[1]], [row[2], row[3]])
    }
}

/// Split matches into the left and right point lists.
pub fn split_matches(matches: &[FeatureMatch]) -> (Vec<[f64; 2]>, Vec<[f64; 2]>) {
    matches.iter().map(|m| (m.left, m.right)).unzip()
}
