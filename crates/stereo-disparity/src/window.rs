use serde::{Deserialize, Serialize};

use crate::error::DisparityError;

/// Number of fixed-point steps per pixel of disparity.
pub const DISPARITY_SCALE: i32 = 16;

/// The disparities a matcher searches: `min_disparity .. min_disparity + num_disparities`.
///
/// Both values are multiples of 16 and the count is positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchWindow {
    /// First disparity searched.
    pub min_disparity: i32,
    /// Number of disparities searched.
    pub num_disparities: i32,
}

impl Default for SearchWindow {
    fn default() -> Self {
        Self {
            min_disparity: 0,
            num_disparities: 64,
        }
    }
}

impl SearchWindow {
    /// Create a window, checking the multiple of 16 and fixed-point range constraints.
    pub fn new(min_disparity: i32, num_disparities: i32) -> Result<Self, DisparityError> {
        if min_disparity % DISPARITY_SCALE != 0
            || num_disparities % DISPARITY_SCALE != 0
            || num_disparities <= 0
        {
            return Err(DisparityError::InvalidSearchWindow(
                min_disparity,
                num_disparities,
            ));
        }
        let lo = (min_disparity - 1) * DISPARITY_SCALE;
        let hi = (min_disparity + num_disparities) * DISPARITY_SCALE;
        if lo < i16::MIN as i32 || hi > i16::MAX as i32 {
            return Err(DisparityError::WindowOverflow(
                min_disparity,
                min_disparity + num_disparities,
            ));
        }
        Ok(Self {
            min_disparity,
            num_disparities,
        })
    }

    /// Round a disparity range out to the enclosing window.
    ///
    /// The lower bound is rounded down to a multiple of 16. The window then grows by blocks of
    /// 16 until [`max_disparity`](Self::max_disparity) reaches the upper bound, so `hi` itself
    /// is always searched.
    ///
    /// # Example
    ///
    /// ```
    /// use stereo_disparity::SearchWindow;
    ///
    /// let window = SearchWindow::from_range(-3.0, 5.0).unwrap();
    /// assert_eq!(window.min_disparity, -16);
    /// assert_eq!(window.num_disparities, 32);
    /// ```
    pub fn from_range(lo: f64, hi: f64) -> Result<Self, DisparityError> {
        if !(lo.is_finite() && hi.is_finite()) || lo > hi {
            return Err(DisparityError::InvalidRange(lo, hi));
        }
        let scale = DISPARITY_SCALE as f64;
        let min = (lo / scale).floor() * scale;
        // one past the largest searched disparity
        let end = (hi / scale).floor() * scale + scale;
        if min < i16::MIN as f64 || end > i16::MAX as f64 {
            return Err(DisparityError::InvalidRange(lo, hi));
        }
        let (min, end) = (min as i32, end as i32);
        Self::new(min, end - min)
    }

    /// Largest disparity searched.
    pub fn max_disparity(&self) -> i32 {
        self.min_disparity + self.num_disparities - 1
    }

    /// The fixed-point value marking pixels without a match.
    pub fn invalid_value(&self) -> i16 {
        ((self.min_disparity - 1) * DISPARITY_SCALE) as i16
    }
}
