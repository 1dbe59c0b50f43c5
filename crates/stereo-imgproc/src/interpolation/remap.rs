use crate::parallel;

use super::interpolate::interpolate_pixel;
use super::InterpolationMode;
use stereo_image::{Image, ImageDtype, ImageError};

/// Tolerance for coordinates that land just outside the source because of rounding.
const BORDER_TOLERANCE: f32 = 1e-3;

/// Check whether a source coordinate can be sampled from an image of the given extent.
pub fn sample_in_bounds(x: f32, y: f32, cols: usize, rows: usize) -> bool {
    x.is_finite()
        && y.is_finite()
        && x >= -BORDER_TOLERANCE
        && y >= -BORDER_TOLERANCE
        && x <= (cols - 1) as f32 + BORDER_TOLERANCE
        && y <= (rows - 1) as f32 + BORDER_TOLERANCE
}

/// Apply generic geometric transformation to an image.
///
/// Destination pixels whose source coordinate falls outside `src` are left untouched, so the
/// caller chooses the border value by pre-filling `dst`.
///
/// # Arguments
///
/// * `src` - The input image container with shape (height, width, C).
/// * `dst` - The output image container with shape (height, width, C).
/// * `map_x` - The x coordinates of the pixels to interpolate.
/// * `map_y` - The y coordinates of the pixels to interpolate.
/// * `interpolation` - The interpolation mode to use.
///
/// # Errors
///
/// * The mapx and mapy must have the same size.
/// * The output image must have the same size as the mapx and mapy.
pub fn remap<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    map_x: &Image<f32, 1>,
    map_y: &Image<f32, 1>,
    interpolation: InterpolationMode,
) -> Result<(), ImageError>
where
    T: ImageDtype + Into<f32>,
{
    if map_x.size() != map_y.size() {
        return Err(ImageError::InvalidImageSize(
            map_x.width(),
            map_x.height(),
            map_y.width(),
            map_y.height(),
        ));
    }

    if dst.size() != map_x.size() {
        return Err(ImageError::InvalidImageSize(
            map_x.width(),
            map_x.height(),
            dst.width(),
            dst.height(),
        ));
    }

    let (cols, rows) = (src.cols(), src.rows());

    // parallelize the remap operation by rows
    parallel::par_iter_rows_resample(dst, map_x, map_y, |&x, &y, dst_pixel| {
        if sample_in_bounds(x, y, cols, rows) {
            let pixel = interpolate_pixel(src, x, y, interpolation);
            dst_pixel
                .iter_mut()
                .zip(pixel.iter())
                .for_each(|(out, &value)| *out = T::from_f32(value));
        }
    });

    Ok(())
}
