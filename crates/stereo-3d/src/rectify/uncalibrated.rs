use stereo_image::ImageSize;

use crate::correspondence::FeatureMatch;
use crate::error::RectifyError;
use crate::fundamental::{enforce_rank2, epipolar_distances};
use crate::linalg::{mul_mat33, mul_mat33_vec3, skew_mat33, transform_point2, Mat33};
use crate::utils::svd_mat33;

/// Minimum number of correspondences kept by the epipolar filter.
pub const MIN_INLIERS: usize = 8;

/// Singular value ratio under which the affine correction solve is rejected.
const CONDITION_LIMIT: f64 = 1e-10;

/// The homographies of an uncalibrated rectification.
#[derive(Clone, Debug, PartialEq)]
pub struct HartleyRectification {
    /// Homography mapping the first image into the rectified frame.
    pub h1: Mat33,
    /// Homography mapping the second image into the rectified frame.
    pub h2: Mat33,
    /// Root mean square of the vertical disagreement of the rectified inliers, in pixels.
    pub residual_y_rms: f64,
    /// Number of correspondences that passed the epipolar filter.
    pub inlier_count: usize,
}

/// Compute rectifying homographies from point correspondences and the fundamental matrix.
///
/// The second homography sends the epipole of the second image to infinity along the x axis
/// around the image centre. The first one is the projective map compatible with it, corrected by
/// the affine transform that best aligns the columns of the two rectified point sets.
///
/// # Arguments
///
/// * `matches` - The correspondences between the two images.
/// * `f` - The fundamental matrix, `x2^T * F * x1 = 0`.
/// * `size` - The size of the images.
/// * `threshold` - Maximum distance in pixels of a point to its epipolar line, `<= 0` keeps all.
pub fn hartley_rectify(
    matches: &[FeatureMatch],
    f: &Mat33,
    size: ImageSize,
    threshold: f64,
) -> Result<HartleyRectification, RectifyError> {
    let inliers: Vec<&FeatureMatch> = matches
        .iter()
        .filter(|m| {
            if threshold <= 0.0 {
                return true;
            }
            let (d1, d2) = epipolar_distances(f, &m.left, &m.right);
            d1 <= threshold && d2 <= threshold
        })
        .collect();

    if inliers.len() < MIN_INLIERS {
        return Err(RectifyError::NotEnoughInliers {
            found: inliers.len(),
            required: MIN_INLIERS,
        });
    }
    log::debug!("{} of {} matches within the epipolar threshold", inliers.len(), matches.len());

    let f = enforce_rank2(f);
    let (u, _, _) = svd_mat33(&f);
    let e2 = [u[0][2], u[1][2], u[2][2]];

    let cx = ((size.width as f64 - 1.0) * 0.5).round();
    let cy = ((size.height as f64 - 1.0) * 0.5).round();

    // move the image centre to the origin and rotate the epipole onto the x axis
    let t: Mat33 = [[1.0, 0.0, -cx], [0.0, 1.0, -cy], [0.0, 0.0, 1.0]];
    let e2t = mul_mat33_vec3(&t, &e2);
    let mirror = e2t[0] < 0.0;

    let d = (e2t[0] * e2t[0] + e2t[1] * e2t[1]).sqrt().max(f64::EPSILON);
    let (alpha, beta) = (e2t[0] / d, e2t[1] / d);
    let r: Mat33 = [[alpha, beta, 0.0], [-beta, alpha, 0.0], [0.0, 0.0, 1.0]];
    let t = mul_mat33(&r, &t);
    let e2t = mul_mat33_vec3(&r, &e2t);

    // send the epipole to infinity
    let invf = if e2t[2].abs() < 1e-6 * e2t[0].abs() {
        0.0
    } else {
        -e2t[2] / e2t[0]
    };
    let k: Mat33 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [invf, 0.0, 1.0]];
    let t_inv: Mat33 = [[1.0, 0.0, cx], [0.0, 1.0, cy], [0.0, 0.0, 1.0]];
    let h2 = mul_mat33(&t_inv, &mul_mat33(&k, &t));

    // a homography of the first image compatible with h2
    let mut m = mul_mat33(&skew_mat33(&e2), &f);
    for (row, e) in m.iter_mut().zip(e2.iter()) {
        for v in row.iter_mut() {
            *v += e;
        }
    }
    let h0 = mul_mat33(&h2, &m);

    let abc = solve_affine_correction(&inliers, &h0, &h2)?;
    let ha: Mat33 = [[abc[0], abc[1], abc[2]], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    let mut h1 = mul_mat33(&ha, &h0);
    let mut h2 = h2;

    if mirror {
        let mm: Mat33 = [[-1.0, 0.0, 2.0 * cx], [0.0, -1.0, 2.0 * cy], [0.0, 0.0, 1.0]];
        h1 = mul_mat33(&mm, &h1);
        h2 = mul_mat33(&mm, &h2);
    }

    let sum_sq: f64 = inliers
        .iter()
        .map(|m| {
            let y1 = transform_point2(&h1, &m.left)[1];
            let y2 = transform_point2(&h2, &m.right)[1];
            (y1 - y2).powi(2)
        })
        .sum();
    let residual_y_rms = (sum_sq / inliers.len() as f64).sqrt();

    if residual_y_rms > 1.0 {
        log::warn!("rectified rows disagree by {residual_y_rms:.3} px rms");
    } else {
        log::debug!("rectified rows disagree by {residual_y_rms:.3e} px rms");
    }

    Ok(HartleyRectification {
        h1,
        h2,
        residual_y_rms,
        inlier_count: inliers.len(),
    })
}

// Least squares `x2' = a * x1' + b * y1' + c` over the inliers mapped by h0 and h2.
fn solve_affine_correction(
    inliers: &[&FeatureMatch],
    h0: &Mat33,
    h2: &Mat33,
) -> Result<[f64; 3], RectifyError> {
    let n = inliers.len();
    let mut a = faer::Mat::<f64>::zeros(n, 3);
    let mut b = vec![0.0; n];
    for (i, m) in inliers.iter().enumerate() {
        let p1 = transform_point2(h0, &m.left);
        let p2 = transform_point2(h2, &m.right);
        if !(p1[0].is_finite() && p1[1].is_finite() && p2[0].is_finite()) {
            return Err(RectifyError::IllConditioned(
                "a correspondence maps to infinity".to_string(),
            ));
        }
        a.write(i, 0, p1[0]);
        a.write(i, 1, p1[1]);
        a.write(i, 2, 1.0);
        b[i] = p2[0];
    }

    let svd = a.thin_svd();
    let s = svd.s_diagonal();
    let (s_max, s_min) = (s.read(0), s.read(2));
    if !(s_max > 0.0) || s_min / s_max < CONDITION_LIMIT {
        return Err(RectifyError::IllConditioned(format!(
            "affine correction singular values {s_max:e} / {s_min:e}"
        )));
    }

    // x = V * diag(1/s) * U^T * b
    let (u, v) = (svd.u(), svd.v());
    let mut x = [0.0; 3];
    for k in 0..3 {
        let utb: f64 = (0..n).map(|i| u.read(i, k) * b[i]).sum();
        let coeff = utb / s.read(k);
        for (j, xj) in x.iter_mut().enumerate() {
            *xj += v.read(j, k) * coeff;
        }
    }
    Ok(x)
}
