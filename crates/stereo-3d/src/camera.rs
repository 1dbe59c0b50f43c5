use stereo_imgproc::calibration::{
    distortion::{undistort_point_polynomial, PolynomialDistortion},
    CameraIntrinsic,
};

use crate::linalg::{mul_mat33_vec3, Mat33};

/// A pinhole camera with polynomial lens distortion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraModel {
    /// The focal lengths and principal point.
    pub intrinsic: CameraIntrinsic,
    /// The lens distortion coefficients.
    pub distortion: PolynomialDistortion,
}

impl CameraModel {
    /// Creates a new camera from a 3x3 camera matrix and the distortion model.
    pub fn new(camera_matrix: &Mat33, distortion: PolynomialDistortion) -> Self {
        Self {
            intrinsic: CameraIntrinsic::from_matrix(camera_matrix),
            distortion,
        }
    }

    /// Returns the camera matrix as a 3x3 array.
    pub fn camera_matrix(&self) -> Mat33 {
        self.intrinsic.matrix()
    }

    /// Map an observed pixel into a rectified image.
    ///
    /// The pixel is undistorted into the ideal normalized frame, rotated by `rotation` and
    /// projected with `projection` (the left 3x3 block of the new projection matrix).
    pub fn rectify_point(&self, rotation: &Mat33, projection: &Mat33, p: &[f64; 2]) -> [f64; 2] {
        let (x, y) = undistort_point_polynomial(p[0], p[1], &self.intrinsic, &self.distortion);
        let ray = mul_mat33_vec3(rotation, &[x, y, 1.0]);
        let q = mul_mat33_vec3(projection, &ray);
        [q[0] / q[2], q[1] / q[2]]
    }
}
