mod calibrated;
pub use calibrated::{
    init_rectify_map, projection_block, stereo_rectify, Roi, StereoRectification,
    StereoRectifyParams,
};

mod uncalibrated;
pub use uncalibrated::{hartley_rectify, HartleyRectification, MIN_INLIERS};

use stereo_image::{Image, ImageDtype, ImageError, ImageSize};
use stereo_imgproc::interpolation::{remap, InterpolationMode};
use stereo_imgproc::warp::warp_perspective;

use crate::camera::CameraModel;
use crate::error::RectifyError;
use crate::linalg::{flatten_mat33, transform_point2, Mat33, Mat44};

/// The transform bringing one image of a pair into the rectified frame.
#[derive(Clone, Debug)]
pub enum RectifyingTransform {
    /// A dense table of source coordinates per rectified pixel, with the camera model it was
    /// built from.
    Remap {
        /// Source column of each rectified pixel.
        map_x: Image<f32, 1>,
        /// Source row of each rectified pixel.
        map_y: Image<f32, 1>,
        /// The original camera.
        camera: CameraModel,
        /// The rectifying rotation.
        rotation: Mat33,
        /// The rectified projection matrix.
        projection: [[f64; 4]; 3],
    },
    /// A homography from source to rectified pixel coordinates.
    Homography(Mat33),
}

impl RectifyingTransform {
    /// Build the remap tables of one camera of a calibrated rectification.
    pub fn from_calibrated(
        camera: &CameraModel,
        rotation: &Mat33,
        projection: &[[f64; 4]; 3],
        size: ImageSize,
    ) -> Result<Self, ImageError> {
        let (map_x, map_y) = init_rectify_map(camera, rotation, projection, size)?;
        Ok(Self::Remap {
            map_x,
            map_y,
            camera: *camera,
            rotation: *rotation,
            projection: *projection,
        })
    }

    /// Map a source pixel into the rectified frame.
    pub fn map_point(&self, p: &[f64; 2]) -> [f64; 2] {
        match self {
            Self::Remap {
                camera,
                rotation,
                projection,
                ..
            } => camera.rectify_point(rotation, &projection_block(projection), p),
            Self::Homography(h) => transform_point2(h, p),
        }
    }

    /// Warp a source image into the rectified frame with bicubic interpolation.
    ///
    /// Rectified pixels whose source falls outside the image are zero.
    pub fn warp_image<T, const C: usize>(
        &self,
        src: &Image<T, C>,
        size: ImageSize,
    ) -> Result<Image<T, C>, ImageError>
    where
        T: ImageDtype + Into<f32>,
    {
        let mut dst = Image::from_size_val(size, T::default())?;
        match self {
            Self::Remap { map_x, map_y, .. } => {
                remap(src, &mut dst, map_x, map_y, InterpolationMode::Bicubic)?
            }
            Self::Homography(h) => {
                warp_perspective(src, &mut dst, &flatten_mat33(h), InterpolationMode::Bicubic)?
            }
        }
        Ok(dst)
    }
}

/// A pair of rectifying transforms.
#[derive(Clone, Debug)]
pub struct RectificationResult {
    /// Transform of the first image.
    pub left: RectifyingTransform,
    /// Transform of the second image.
    pub right: RectifyingTransform,
    /// Disparity-to-depth matrix, known only for calibrated pairs.
    pub q: Option<Mat44>,
    /// Size of the rectified images.
    pub size: ImageSize,
    /// The full calibrated solution, when there is one.
    pub calibrated: Option<StereoRectification>,
}

impl RectificationResult {
    /// Build the dense remap tables of a calibrated rectification.
    pub fn calibrated(
        left: &CameraModel,
        right: &CameraModel,
        rectification: StereoRectification,
    ) -> Result<Self, RectifyError> {
        let size = rectification.size;
        Ok(Self {
            left: RectifyingTransform::from_calibrated(
                left,
                &rectification.r1,
                &rectification.p1,
                size,
            )?,
            right: RectifyingTransform::from_calibrated(
                right,
                &rectification.r2,
                &rectification.p2,
                size,
            )?,
            q: Some(rectification.q),
            size,
            calibrated: Some(rectification),
        })
    }

    /// Wrap the homographies of an uncalibrated rectification.
    pub fn uncalibrated(rectification: &HartleyRectification, size: ImageSize) -> Self {
        Self {
            left: RectifyingTransform::Homography(rectification.h1),
            right: RectifyingTransform::Homography(rectification.h2),
            q: None,
            size,
            calibrated: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::IDENTITY33;
    use crate::pose::RelativePose;
    use stereo_imgproc::calibration::distortion::PolynomialDistortion;

    #[test]
    fn identity_rectification_keeps_the_image() -> Result<(), RectifyError> {
        let size = ImageSize {
            width: 1280,
            height: 960,
        };
        let camera = CameraModel::new(
            &[
                [1000.0, 0.0, 640.0],
                [0.0, 1000.0, 480.0],
                [0.0, 0.0, 1.0],
            ],
            PolynomialDistortion::default(),
        );
        let pose = RelativePose {
            rotation: IDENTITY33,
            translation: [-100.0, 0.0, 0.0],
        };
        let rect = stereo_rectify(&camera, &camera, size, &pose, &Default::default())?;
        let result = RectificationResult::calibrated(&camera, &camera, rect)?;

        let image = Image::<u8, 3>::from_fn(size, |row, col| {
            [(row % 251) as u8, (col % 253) as u8, ((row + col) % 7) as u8]
        })?;
        let warped = result.left.warp_image(&image, result.size)?;
        assert_eq!(warped.as_slice(), image.as_slice());

        let p = result.right.map_point(&[321.0, 17.5]);
        approx::assert_abs_diff_eq!(p[0], 321.0, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(p[1], 17.5, epsilon = 1e-9);
        assert!(result.q.is_some());
        Ok(())
    }

    #[test]
    fn homography_warp_fills_border_with_zero() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 8,
            height: 6,
        };
        let image = Image::<u8, 1>::from_size_val(size, 200)?;
        let shift = RectifyingTransform::Homography([
            [1.0, 0.0, 3.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ]);
        let warped = shift.warp_image(&image, size)?;
        for row in 0..6 {
            for col in 0..8 {
                let expected = if col >= 3 { 200 } else { 0 };
                assert_eq!(warped.get([row, col, 0]), Some(&expected));
            }
        }
        assert_eq!(shift.map_point(&[1.0, 2.0]), [4.0, 2.0]);
        Ok(())
    }
}
