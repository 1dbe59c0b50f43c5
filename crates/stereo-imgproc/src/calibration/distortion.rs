use super::CameraIntrinsic;
use crate::interpolation::grid::meshgrid_from_fn;
use crate::warp::invert_perspective_matrix;
use stereo_image::{Image, ImageError, ImageSize};

/// Iterations of the fixed point undistortion.
const UNDISTORT_MAX_ITERATIONS: usize = 100;

/// Represents the polynomial distortion parameters of a camera
///
/// # Fields
///
/// * `k1` - The first radial distortion coefficient
/// * `k2` - The second radial distortion coefficient
/// * `k3` - The third radial distortion coefficient
/// * `k4` - The fourth radial distortion coefficient
/// * `k5` - The fifth radial distortion coefficient
/// * `k6` - The sixth radial distortion coefficient
/// * `p1` - The first tangential distortion coefficient
/// * `p2` - The second tangential distortion coefficient
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PolynomialDistortion {
    /// The first radial distortion coefficient
    pub k1: f64,
    /// The second radial distortion coefficient
    pub k2: f64,
    /// The third radial distortion coefficient
    pub k3: f64,
    /// The fourth radial distortion coefficient
    pub k4: f64,
    /// The fifth radial distortion coefficient
    pub k5: f64,
    /// The sixth radial distortion coefficient
    pub k6: f64,
    /// The first tangential distortion coefficient
    pub p1: f64,
    /// The second tangential distortion coefficient
    pub p2: f64,
}

impl PolynomialDistortion {
    /// Build the model from a coefficient vector in the usual order
    /// `(k1, k2, p1, p2, k3, k4, k5, k6)`; missing trailing coefficients are zero.
    ///
    /// Returns `None` when more than eight coefficients are given.
    pub fn from_coefficients(coefficients: &[f64]) -> Option<Self> {
        if coefficients.len() > 8 {
            return None;
        }
        let c = |i: usize| coefficients.get(i).copied().unwrap_or(0.0);
        Some(Self {
            k1: c(0),
            k2: c(1),
            p1: c(2),
            p2: c(3),
            k3: c(4),
            k4: c(5),
            k5: c(6),
            k6: c(7),
        })
    }

    /// Whether every coefficient is zero, i.e. the images are already undistorted.
    pub fn is_zero(&self) -> bool {
        [
            self.k1, self.k2, self.k3, self.k4, self.k5, self.k6, self.p1, self.p2,
        ]
        .iter()
        .all(|&k| k == 0.0)
    }

    /// Apply the distortion to a normalized image coordinate.
    pub fn distort_normalized(&self, x: f64, y: f64) -> (f64, f64) {
        let r2 = x * x + y * y;

        // radial distortion
        let kr = (1.0 + self.k1 * r2 + self.k2 * r2 * r2 + self.k3 * r2 * r2 * r2)
            / (1.0 + self.k4 * r2 + self.k5 * r2 * r2 + self.k6 * r2 * r2 * r2);

        // tangential distortion
        let xd = x * kr + 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let yd = y * kr + self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;

        (xd, yd)
    }

    /// Remove the distortion from a normalized image coordinate.
    ///
    /// The model has no closed form inverse; the ideal point is found by fixed point
    /// iteration starting from the distorted point.
    pub fn undistort_normalized(&self, xd: f64, yd: f64) -> (f64, f64) {
        if self.is_zero() {
            return (xd, yd);
        }

        let (mut x, mut y) = (xd, yd);
        for _ in 0..UNDISTORT_MAX_ITERATIONS {
            let r2 = x * x + y * y;
            let icdist = (1.0 + self.k4 * r2 + self.k5 * r2 * r2 + self.k6 * r2 * r2 * r2)
                / (1.0 + self.k1 * r2 + self.k2 * r2 * r2 + self.k3 * r2 * r2 * r2);
            if !icdist.is_finite() || icdist < 0.0 {
                // diverged: fall back to the distorted coordinate
                return (xd, yd);
            }
            let delta_x = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
            let delta_y = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
            let (nx, ny) = ((xd - delta_x) * icdist, (yd - delta_y) * icdist);
            let converged = (nx - x).abs() < 1e-12 && (ny - y).abs() < 1e-12;
            x = nx;
            y = ny;
            if converged {
                break;
            }
        }

        (x, y)
    }
}

/// Undistort a pixel coordinate and return the ideal normalized image coordinate.
pub fn undistort_point_polynomial(
    x: f64,
    y: f64,
    intrinsic: &CameraIntrinsic,
    distortion: &PolynomialDistortion,
) -> (f64, f64) {
    let (xd, yd) = intrinsic.unproject(x, y);
    distortion.undistort_normalized(xd, yd)
}

/// Generate the undistort and rectify map for a polynomial distortion model
///
/// Every destination pixel is pulled back through `(projection * rotation)^-1` into the ideal
/// normalized camera frame, distorted and projected with the original intrinsics. Pixels behind
/// the camera get a NaN coordinate, which the remap treats as out of bounds.
///
/// # Arguments
///
/// * `intrinsic` - The intrinsic parameters of the camera
/// * `rotation` - The rectifying rotation of the camera
/// * `projection` - The left 3x3 block of the new projection matrix
/// * `distortion` - The distortion parameters of the camera
/// * `size` - The size of the destination image
///
/// # Returns
///
/// * `map_x` - The x map for undistorting and rectifying the image
/// * `map_y` - The y map for undistorting and rectifying the image
pub fn generate_correction_map_polynomial(
    intrinsic: &CameraIntrinsic,
    rotation: &[[f64; 3]; 3],
    projection: &[[f64; 3]; 3],
    distortion: &PolynomialDistortion,
    size: &ImageSize,
) -> Result<(Image<f32, 1>, Image<f32, 1>), ImageError> {
    // new projection times rotation, flattened row-major
    let mut pr = [0.0; 9];
    for i in 0..3 {
        for j in 0..3 {
            pr[i * 3 + j] = (0..3).map(|k| projection[i][k] * rotation[k][j]).sum();
        }
    }
    let ir = invert_perspective_matrix(&pr)?;

    let (dst_rows, dst_cols) = (size.height, size.width);
    meshgrid_from_fn(dst_cols, dst_rows, |u, v| {
        let (u, v) = (u as f64, v as f64);
        let x = ir[0] * u + ir[1] * v + ir[2];
        let y = ir[3] * u + ir[4] * v + ir[5];
        let w = ir[6] * u + ir[7] * v + ir[8];
        if w <= f64::EPSILON {
            return Ok((f32::NAN, f32::NAN));
        }
        let (xd, yd) = distortion.distort_normalized(x / w, y / w);
        let (xs, ys) = intrinsic.project(xd, yd);
        Ok((xs as f32, ys as f32))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stereo_image::ImageSize;

    const IDENTITY: [[f64; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    fn intrinsic() -> CameraIntrinsic {
        CameraIntrinsic {
            fx: 577.48583984375,
            fy: 652.8748779296875,
            cx: 577.48583984375,
            cy: 386.1428833007813,
        }
    }

    #[test]
    fn test_from_coefficients() {
        let d = PolynomialDistortion::from_coefficients(&[0.1, 0.2, 0.3, 0.4, 0.5]);
        assert_eq!(
            d,
            Some(PolynomialDistortion {
                k1: 0.1,
                k2: 0.2,
                p1: 0.3,
                p2: 0.4,
                k3: 0.5,
                ..Default::default()
            })
        );
        assert!(PolynomialDistortion::from_coefficients(&[0.0; 9]).is_none());
        assert!(PolynomialDistortion::from_coefficients(&[0.0; 4]).is_some_and(|d| d.is_zero()));
    }

    fn distort_pixel(
        u: f64,
        v: f64,
        intrinsic: &CameraIntrinsic,
        distortion: &PolynomialDistortion,
    ) -> (f64, f64) {
        let (x, y) = intrinsic.unproject(u, v);
        let (xd, yd) = distortion.distort_normalized(x, y);
        intrinsic.project(xd, yd)
    }

    #[test]
    fn test_distort_normalized() {
        let distortion = PolynomialDistortion {
            k1: 1.7547749280929563,
            k2: 0.0097926277667284,
            k3: -0.027250492945313457,
            k4: 2.1092164516448975,
            k5: 0.462927520275116,
            k6: -0.08215277642011642,
            p1: -0.00005457743463921361,
            p2: 0.00003006766564794816,
        };

        // the principal point is a fixed point of the model
        let (x, y) = distort_pixel(
            577.48583984375,
            386.1428833007813,
            &intrinsic(),
            &distortion,
        );
        approx::assert_abs_diff_eq!(x, 577.48583984375, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(y, 386.1428833007813, epsilon = 1e-9);

        let (x, _) = distort_pixel(100.0, 20.0, &intrinsic(), &distortion);
        assert_ne!(x, 100.0);
    }

    #[test]
    fn test_undistort_inverts_distort() {
        let distortion = PolynomialDistortion::from_coefficients(&[-0.21, 0.07, 0.001, -0.0005])
            .unwrap_or_default();
        let intrinsic = intrinsic();

        for (u, v) in [(300.0, 200.0), (800.0, 600.0), (600.0, 400.0)] {
            let (x, y) = undistort_point_polynomial(u, v, &intrinsic, &distortion);
            let (xd, yd) = distortion.distort_normalized(x, y);
            let (ud, vd) = intrinsic.project(xd, yd);
            approx::assert_abs_diff_eq!(ud, u, epsilon = 1e-6);
            approx::assert_abs_diff_eq!(vd, v, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_correction_map_identity() -> Result<(), ImageError> {
        let intrinsic = intrinsic();
        let size = ImageSize {
            width: 8,
            height: 4,
        };

        let (map_x, map_y) = generate_correction_map_polynomial(
            &intrinsic,
            &IDENTITY,
            &intrinsic.matrix(),
            &PolynomialDistortion::default(),
            &size,
        )?;

        assert_eq!(map_x.size(), size);
        assert_eq!(map_y.size(), size);
        for row in 0..4 {
            for col in 0..8 {
                let mx = map_x.get([row, col, 0]).copied().unwrap_or(f32::NAN);
                let my = map_y.get([row, col, 0]).copied().unwrap_or(f32::NAN);
                approx::assert_abs_diff_eq!(mx, col as f32, epsilon = 1e-3);
                approx::assert_abs_diff_eq!(my, row as f32, epsilon = 1e-3);
            }
        }

        Ok(())
    }

    #[test]
    fn test_correction_map_applies_distortion() -> Result<(), ImageError> {
        let intrinsic = CameraIntrinsic {
            fx: 100.0,
            fy: 100.0,
            cx: 10.0,
            cy: 10.0,
        };
        let distortion = PolynomialDistortion {
            k1: 0.1,
            ..Default::default()
        };
        let size = ImageSize {
            width: 21,
            height: 21,
        };

        let (map_x, map_y) = generate_correction_map_polynomial(
            &intrinsic,
            &IDENTITY,
            &intrinsic.matrix(),
            &distortion,
            &size,
        )?;

        let expected = distort_pixel(20.0, 20.0, &intrinsic, &distortion);
        let mx = map_x.get([20, 20, 0]).copied().unwrap_or(f32::NAN);
        let my = map_y.get([20, 20, 0]).copied().unwrap_or(f32::NAN);
        approx::assert_abs_diff_eq!(mx as f64, expected.0, epsilon = 1e-3);
        approx::assert_abs_diff_eq!(my as f64, expected.1, epsilon = 1e-3);
        assert!(mx > 20.0);

        Ok(())
    }
}
