use stereo_3d::linalg::{flatten_mat33, inverse_mat33};
use stereo_3d::rectify::RectifyingTransform;
use stereo_image::ImageSize;
use stereo_imgproc::interpolation::{grid::meshgrid_from_fn, remap, InterpolationMode};
use stereo_imgproc::warp::warp_perspective;

use crate::decode::DisparityMap;
use crate::error::DisparityError;

/// Bring a disparity map from the rectified frame back to the source image of a camera.
///
/// Every source pixel is mapped forward into the rectified frame and takes the disparity of the
/// nearest rectified pixel, so values are never blended across depth edges. Source pixels that
/// land outside the rectified image have no disparity.
///
/// # Arguments
///
/// * `map` - The disparity in the rectified frame.
/// * `transform` - The rectifying transform of the camera.
/// * `size` - The size of the source image.
pub fn unwarp_disparity(
    map: &DisparityMap,
    transform: &RectifyingTransform,
    size: ImageSize,
) -> Result<DisparityMap, DisparityError> {
    let mut dst = DisparityMap::invalid(size)?;

    match transform {
        RectifyingTransform::Homography(h) => {
            // warp from the rectified frame through the inverse homography
            let h_inv = inverse_mat33(h).ok_or(DisparityError::SingularHomography)?;
            warp_perspective(
                &map.data,
                &mut dst.data,
                &flatten_mat33(&h_inv),
                InterpolationMode::Nearest,
            )?;
        }
        RectifyingTransform::Remap { .. } => {
            let (map_x, map_y) = meshgrid_from_fn(size.width, size.height, |x, y| {
                let p = transform.map_point(&[x as f64, y as f64]);
                Ok((p[0] as f32, p[1] as f32))
            })?;
            remap(
                &map.data,
                &mut dst.data,
                &map_x,
                &map_y,
                InterpolationMode::Nearest,
            )?;
        }
    }

    log::debug!(
        "unwarped disparity keeps {} of {} pixels",
        dst.valid_count(),
        size.area()
    );

    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stereo_3d::camera::CameraModel;
    use stereo_3d::linalg::IDENTITY33;
    use stereo_image::Image;
    use stereo_imgproc::calibration::distortion::PolynomialDistortion;

    fn ramp(size: ImageSize) -> Result<DisparityMap, DisparityError> {
        Ok(DisparityMap {
            data: Image::from_fn(size, |r, c| [(r * 100 + c) as f32 / 16.0])?,
        })
    }

    #[test]
    fn homography_shift_is_undone() -> Result<(), DisparityError> {
        let size = ImageSize {
            width: 10,
            height: 6,
        };
        let rectified = ramp(size)?;
        // source (x, y) is rectified (x + 2, y)
        let transform = RectifyingTransform::Homography([
            [1.0, 0.0, 2.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ]);

        let out = unwarp_disparity(&rectified, &transform, size)?;
        for row in 0..6 {
            for col in 0..10 {
                let v = out.data.get([row, col, 0]).copied().unwrap_or(0.0);
                if col + 2 < 10 {
                    assert_eq!(v, rectified.data.get([row, col + 2, 0]).copied().unwrap_or(0.0));
                } else {
                    assert!(v.is_nan());
                }
            }
        }
        Ok(())
    }

    #[test]
    fn nearest_keeps_values_and_invalid() -> Result<(), DisparityError> {
        let size = ImageSize {
            width: 8,
            height: 8,
        };
        let mut rectified = ramp(size)?;
        rectified.data.as_slice_mut()[3 * 8 + 3] = f32::NAN;
        let values: Vec<f32> = rectified.data.as_slice().to_vec();

        // half pixel shift: every source pixel falls between rectified pixels
        let transform = RectifyingTransform::Homography([
            [1.0, 0.0, 0.4],
            [0.0, 1.0, -0.3],
            [0.0, 0.0, 1.0],
        ]);
        let out = unwarp_disparity(&rectified, &transform, size)?;
        for v in out.data.as_slice().iter().filter(|v| v.is_finite()) {
            assert!(values.contains(v));
        }
        assert!(out.data.get([3, 3, 0]).is_some_and(|v| v.is_nan()));
        Ok(())
    }

    #[test]
    fn singular_homography() -> Result<(), DisparityError> {
        let size = ImageSize {
            width: 4,
            height: 4,
        };
        let transform = RectifyingTransform::Homography([[0.0; 3]; 3]);
        let res = unwarp_disparity(&ramp(size)?, &transform, size);
        assert_eq!(res, Err(DisparityError::SingularHomography));
        Ok(())
    }

    #[test]
    fn identity_remap_is_identity() -> Result<(), DisparityError> {
        let size = ImageSize {
            width: 12,
            height: 9,
        };
        let k = [[20.0, 0.0, 6.0], [0.0, 20.0, 4.0], [0.0, 0.0, 1.0]];
        let camera = CameraModel::new(&k, PolynomialDistortion::default());
        let projection = [
            [20.0, 0.0, 6.0, 0.0],
            [0.0, 20.0, 4.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ];
        let transform =
            RectifyingTransform::from_calibrated(&camera, &IDENTITY33, &projection, size)?;
        let rectified = ramp(size)?;
        let out = unwarp_disparity(&rectified, &transform, size)?;
        assert_eq!(out, rectified);
        Ok(())
    }
}
