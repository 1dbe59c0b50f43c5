use crate::interpolation::{grid::meshgrid_from_fn, remap, InterpolationMode};
use stereo_image::{Image, ImageDtype, ImageError, ImageSize};

/// Resize an image to a new size.
///
/// The corner pixels of the source are mapped onto the corner pixels of the destination and
/// the values in between are interpolated with the given mode.
///
/// # Arguments
///
/// * `src` - The input image container.
/// * `dst` - The output image container.
/// * `interpolation` - The interpolation mode to use.
///
/// # Example
///
/// ```
/// use stereo_image::{Image, ImageSize};
/// use stereo_imgproc::resize::resize_native;
/// use stereo_imgproc::interpolation::InterpolationMode;
///
/// let image = Image::<_, 3>::new(
///     ImageSize {
///         width: 4,
///         height: 5,
///     },
///     vec![0f32; 4 * 5 * 3],
/// )
/// .unwrap();
///
/// let new_size = ImageSize {
///     width: 2,
///     height: 3,
/// };
///
/// let mut image_resized = Image::<_, 3>::from_size_val(new_size, 0.0).unwrap();
///
/// resize_native(
///     &image,
///     &mut image_resized,
///     InterpolationMode::Nearest,
/// )
/// .unwrap();
///
/// assert_eq!(image_resized.num_channels(), 3);
/// assert_eq!(image_resized.size().width, 2);
/// assert_eq!(image_resized.size().height, 3);
/// ```
pub fn resize_native<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    interpolation: InterpolationMode,
) -> Result<(), ImageError>
where
    T: ImageDtype + Into<f32>,
{
    let step = |src_len: usize, dst_len: usize| {
        if dst_len > 1 {
            (src_len - 1) as f32 / (dst_len - 1) as f32
        } else {
            0.0
        }
    };
    let step_x = step(src.width(), dst.width());
    let step_y = step(src.height(), dst.height());

    let (map_x, map_y) = meshgrid_from_fn(dst.width(), dst.height(), |x, y| {
        Ok((x as f32 * step_x, y as f32 * step_y))
    })?;

    remap(src, dst, &map_x, &map_y, interpolation)
}

/// Compute the size that fits `size` into a square of `max_dimension` keeping the aspect ratio.
///
/// Returns the new size and the scale factor applied to the coordinates. Images already within
/// the limit keep their size and a scale of one.
pub fn fit_size(size: ImageSize, max_dimension: usize) -> (ImageSize, f64) {
    let longest = size.width.max(size.height);
    if longest <= max_dimension || max_dimension == 0 {
        return (size, 1.0);
    }
    let scale = max_dimension as f64 / longest as f64;
    let new_size = ImageSize {
        width: ((size.width as f64 * scale).round() as usize).max(1),
        height: ((size.height as f64 * scale).round() as usize).max(1),
    };
    (new_size, scale)
}

#[cfg(test)]
mod tests {
    use stereo_image::{Image, ImageError, ImageSize};

    #[test]
    fn resize_smoke_ch3() -> Result<(), ImageError> {
        let image = Image::<_, 3>::new(
            ImageSize {
                width: 4,
                height: 5,
            },
            vec![0f32; 4 * 5 * 3],
        )?;

        let new_size = ImageSize {
            width: 2,
            height: 3,
        };

        let mut image_resized = Image::<_, 3>::from_size_val(new_size, 0.0)?;

        super::resize_native(
            &image,
            &mut image_resized,
            super::InterpolationMode::Bilinear,
        )?;

        assert_eq!(image_resized.num_channels(), 3);
        assert_eq!(image_resized.size().width, 2);
        assert_eq!(image_resized.size().height, 3);

        Ok(())
    }

    #[test]
    fn resize_corners() -> Result<(), ImageError> {
        let image = Image::<_, 1>::new(
            ImageSize {
                width: 4,
                height: 4,
            },
            (0..16).map(|v| v as f32).collect(),
        )?;

        let mut image_resized = Image::<_, 1>::from_size_val([2, 2].into(), 0.0)?;

        super::resize_native(
            &image,
            &mut image_resized,
            super::InterpolationMode::Bilinear,
        )?;

        assert_eq!(image_resized.as_slice(), &[0.0, 3.0, 12.0, 15.0]);

        Ok(())
    }

    #[test]
    fn fit_size() {
        let size = ImageSize {
            width: 4000,
            height: 3000,
        };
        let (new_size, scale) = super::fit_size(size, 1000);
        assert_eq!(
            new_size,
            ImageSize {
                width: 1000,
                height: 750
            }
        );
        approx::assert_relative_eq!(scale, 0.25);

        let (same, scale) = super::fit_size(new_size, 1000);
        assert_eq!(same, new_size);
        assert_eq!(scale, 1.0);
    }
}
