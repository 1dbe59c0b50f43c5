use serde::{Deserialize, Serialize};

use crate::correspondence::FeatureMatch;
use crate::error::RectifyError;
use crate::rectify::RectifyingTransform;

/// A closed interval of signed disparities in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisparityRange {
    /// Smallest disparity.
    pub min: f64,
    /// Largest disparity.
    pub max: f64,
}

impl DisparityRange {
    /// Create a range, failing when it is inverted or not finite.
    pub fn new(min: f64, max: f64) -> Result<Self, RectifyError> {
        if !(min.is_finite() && max.is_finite()) || min > max {
            return Err(RectifyError::InvalidRange(min, max));
        }
        Ok(Self { min, max })
    }
}

/// Reduce a rectified coordinate difference to a signed disparity.
///
/// The component with the larger magnitude wins and keeps its sign; ties go to `x`.
pub fn dominant_disparity(diff: [f64; 2]) -> f64 {
    if diff[0].abs() >= diff[1].abs() {
        diff[0]
    } else {
        diff[1]
    }
}

/// Track the extremes of the dominant disparity over coordinate differences, in order.
///
/// Non finite differences are skipped.
pub fn disparity_range_from_differences(
    differences: impl IntoIterator<Item = [f64; 2]>,
) -> Result<DisparityRange, RectifyError> {
    let mut extremes: Option<(f64, f64)> = None;
    for diff in differences {
        if !(diff[0].is_finite() && diff[1].is_finite()) {
            continue;
        }
        let d = dominant_disparity(diff);
        extremes = Some(match extremes {
            Some((lo, hi)) => (lo.min(d), hi.max(d)),
            None => (d, d),
        });
    }
    let (min, max) = extremes.ok_or(RectifyError::EmptyMatches)?;
    DisparityRange::new(min, max)
}

/// Estimate the disparity search range of a rectified pair from correspondences.
///
/// Each match is mapped through both transforms and the difference `left - right` of the
/// rectified coordinates is reduced with [`dominant_disparity`].
///
/// # Example
///
/// ```
/// use stereo_3d::correspondence::FeatureMatch;
/// use stereo_3d::range::estimate_search_range;
/// use stereo_3d::rectify::RectifyingTransform;
///
/// let identity = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
/// let transform = RectifyingTransform::Homography(identity);
/// let matches = [
///     FeatureMatch::new([15.0, 10.0], [10.0, 10.0]),
///     FeatureMatch::new([7.0, 20.2], [10.0, 20.0]),
/// ];
///
/// let range = estimate_search_range(&matches, &transform, &transform).unwrap();
/// assert_eq!(range.min, -3.0);
/// assert_eq!(range.max, 5.0);
/// ```
pub fn estimate_search_range(
    matches: &[FeatureMatch],
    left: &RectifyingTransform,
    right: &RectifyingTransform,
) -> Result<DisparityRange, RectifyError> {
    if matches.is_empty() {
        return Err(RectifyError::EmptyMatches);
    }
    let range = disparity_range_from_differences(matches.iter().map(|m| {
        let p1 = left.map_point(&m.left);
        let p2 = right.map_point(&m.right);
        [p1[0] - p2[0], p1[1] - p2[1]]
    }))?;
    log::debug!("disparity search range [{:.3}, {:.3}]", range.min, range.max);
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_the_dominant_axis() -> Result<(), RectifyError> {
        let range = disparity_range_from_differences([[5.0, 0.0], [-3.0, 0.2]])?;
        assert_eq!(range, DisparityRange { min: -3.0, max: 5.0 });

        assert_eq!(dominant_disparity([0.5, -4.0]), -4.0);
        assert_eq!(dominant_disparity([-2.0, 2.0]), -2.0);
        Ok(())
    }

    #[test]
    fn single_match_is_a_point_range() -> Result<(), RectifyError> {
        let range = disparity_range_from_differences([[12.5, 0.1]])?;
        assert_eq!(range.min, 12.5);
        assert_eq!(range.max, 12.5);
        Ok(())
    }

    #[test]
    fn empty_and_invalid_input() {
        let identity = RectifyingTransform::Homography(crate::linalg::IDENTITY33);
        assert_eq!(
            estimate_search_range(&[], &identity, &identity),
            Err(RectifyError::EmptyMatches)
        );
        assert_eq!(
            disparity_range_from_differences([[f64::NAN, 0.0]]),
            Err(RectifyError::EmptyMatches)
        );
        assert_eq!(
            DisparityRange::new(4.0, -1.0),
            Err(RectifyError::InvalidRange(4.0, -1.0))
        );
    }

    #[test]
    fn homographies_are_applied() -> Result<(), RectifyError> {
        let shift = RectifyingTransform::Homography([
            [1.0, 0.0, 10.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ]);
        let identity = RectifyingTransform::Homography(crate::linalg::IDENTITY33);
        let matches = [
            FeatureMatch::new([0.0, 0.0], [4.0, 0.0]),
            FeatureMatch::new([30.0, 5.0], [20.0, 5.0]),
        ];
        let range = estimate_search_range(&matches, &shift, &identity)?;
        assert_eq!(range, DisparityRange { min: 6.0, max: 20.0 });
        Ok(())
    }
}
