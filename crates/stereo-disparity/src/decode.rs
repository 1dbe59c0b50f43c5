use stereo_image::{ops, Image, ImageError, ImageSize};

use crate::error::DisparityError;
use crate::window::{SearchWindow, DISPARITY_SCALE};

/// The raw matcher output: disparity times 16 in a signed 16 bit image.
pub type FixedPointDisparity = Image<i16, 1>;

/// A real-valued disparity map in pixels. Pixels without a match are `NaN`.
#[derive(Clone, Debug, PartialEq)]
pub struct DisparityMap {
    /// The disparity values, row-major.
    pub data: Image<f32, 1>,
}

impl DisparityMap {
    /// Create a map with every pixel set to the no-match value.
    pub fn invalid(size: ImageSize) -> Result<Self, ImageError> {
        Ok(Self {
            data: Image::from_size_val(size, f32::NAN)?,
        })
    }

    /// Whether a disparity value is a match.
    pub fn is_valid(value: f32) -> bool {
        value.is_finite()
    }

    /// The size of the map.
    pub fn size(&self) -> ImageSize {
        self.data.size()
    }

    /// Number of pixels with a match.
    pub fn valid_count(&self) -> usize {
        self.data
            .as_slice()
            .iter()
            .filter(|v| Self::is_valid(**v))
            .count()
    }

    /// Smallest and largest matched disparity, `None` when nothing matched.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.data
            .as_slice()
            .iter()
            .copied()
            .filter(|v| Self::is_valid(*v))
            .fold(None, |acc, v| match acc {
                Some((lo, hi)) => Some((f32::min(lo, v), f32::max(hi, v))),
                None => Some((v, v)),
            })
    }

    /// A 16 bit preview: `(d - min_disparity + 1) * 16`, with `0` for pixels without a match.
    pub fn to_preview(&self, window: &SearchWindow) -> Result<Image<u16, 1>, ImageError> {
        let offset = (window.min_disparity - 1) as f32;
        let scale = DISPARITY_SCALE as f32;
        let data = self
            .data
            .as_slice()
            .iter()
            .map(|&v| {
                if Self::is_valid(v) {
                    ((v - offset) * scale).round().clamp(1.0, u16::MAX as f32) as u16
                } else {
                    0
                }
            })
            .collect();
        Image::new(self.size(), data)
    }
}

/// Decode the fixed-point matcher output into pixels.
///
/// Every value at or above `min_disparity * 16` is divided by 16; everything below, including
/// the no-match value `(min_disparity - 1) * 16`, becomes `NaN`.
pub fn decode_fixed_point(
    raw: &FixedPointDisparity,
    window: &SearchWindow,
) -> Result<DisparityMap, DisparityError> {
    let lowest = window.min_disparity * DISPARITY_SCALE;
    let scale = DISPARITY_SCALE as f32;
    let data = raw
        .as_slice()
        .iter()
        .map(|&v| {
            if (v as i32) < lowest {
                f32::NAN
            } else {
                v as f32 / scale
            }
        })
        .collect();
    Ok(DisparityMap {
        data: Image::new(raw.size(), data)?,
    })
}

/// Encode a disparity map in the fixed-point matcher format.
///
/// Values are rounded to the nearest 1/16 pixel; `NaN` becomes the window's no-match value.
pub fn encode_fixed_point(
    map: &DisparityMap,
    window: &SearchWindow,
) -> Result<FixedPointDisparity, DisparityError> {
    let mut raw = Image::from_size_val(map.size(), window.invalid_value())?;
    ops::quantize(
        &map.data,
        &mut raw,
        DISPARITY_SCALE as f32,
        window.invalid_value(),
    )?;
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size() -> ImageSize {
        ImageSize {
            width: 4,
            height: 2,
        }
    }

    #[test]
    fn integer_disparities_round_trip() -> Result<(), DisparityError> {
        let window = SearchWindow::new(-32, 96)?;
        for d in -32..64 {
            let raw = Image::new(size(), vec![(d * 16) as i16; 8])?;
            let map = decode_fixed_point(&raw, &window)?;
            for v in map.data.as_slice() {
                approx::assert_abs_diff_eq!(*v as f64, d as f64, epsilon = 1e-9);
            }
            assert_eq!(encode_fixed_point(&map, &window)?, raw);
        }
        Ok(())
    }

    #[test]
    fn sub_pixel_values() -> Result<(), DisparityError> {
        let window = SearchWindow::new(0, 16)?;
        let raw = Image::new(size(), vec![0, 1, 8, 15, 17, 100, 255, 24])?;
        let map = decode_fixed_point(&raw, &window)?;
        assert_eq!(
            map.data.as_slice(),
            &[0.0, 0.0625, 0.5, 0.9375, 1.0625, 6.25, 15.9375, 1.5]
        );
        Ok(())
    }

    #[test]
    fn all_invalid_map() -> Result<(), DisparityError> {
        let window = SearchWindow::new(16, 32)?;
        let raw = Image::from_size_val(size(), window.invalid_value())?;
        let map = decode_fixed_point(&raw, &window)?;

        assert!(map.data.as_slice().iter().all(|v| v.is_nan()));
        assert_eq!(map.valid_count(), 0);
        assert_eq!(map.min_max(), None);

        let preview = map.to_preview(&window)?;
        assert!(preview.as_slice().iter().all(|v| *v == 0));

        assert_eq!(encode_fixed_point(&map, &window)?, raw);
        Ok(())
    }

    #[test]
    fn preview_offsets_the_window() -> Result<(), DisparityError> {
        let window = SearchWindow::new(-16, 32)?;
        let mut map = DisparityMap::invalid(size())?;
        map.data.as_slice_mut()[0] = -16.0;
        map.data.as_slice_mut()[1] = 0.5;
        map.data.as_slice_mut()[2] = 15.0;

        let preview = map.to_preview(&window)?;
        assert_eq!(&preview.as_slice()[..4], &[16, 280, 512, 0]);
        assert_eq!(map.valid_count(), 3);
        assert_eq!(map.min_max(), Some((-16.0, 15.0)));
        Ok(())
    }
}
