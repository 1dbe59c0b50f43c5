use stereo_image::Image;

use crate::decode::FixedPointDisparity;
use crate::error::DisparityError;
use crate::window::SearchWindow;

/// A dense matcher of rectified grayscale image pairs.
///
/// The output has the size of the left image and holds disparity times 16, so that a pixel
/// `(x, y)` of the left image corresponds to `(x - d, y)` in the right one. Pixels without a match
/// hold [`SearchWindow::invalid_value`].
pub trait StereoMatcher {
    /// Compute the fixed-point disparity of `left` against `right` over `window`.
    fn compute(
        &self,
        left: &Image<u8, 1>,
        right: &Image<u8, 1>,
        window: &SearchWindow,
    ) -> Result<FixedPointDisparity, DisparityError>;
}
