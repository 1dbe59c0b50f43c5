use crate::correspondence::FeatureMatch;
use crate::error::FundamentalError;
use crate::linalg::{
    inverse_mat33, mul_mat33, mul_mat33_vec3, skew_mat33, transpose_mat33, Mat33,
};
use crate::pose::RelativePose;
use crate::utils::svd_mat33;

/// Estimate the fundamental matrix using the normalized 8-point algorithm.
///
/// - `x1`: points in image 1 as `&[[f64; 2]]` (length >= 8)
/// - `x2`: corresponding points in image 2 as `&[[f64; 2]]` (same length)
///
/// The result satisfies `x2^T * F * x1 = 0`, has rank two and unit Frobenius norm.
pub fn fundamental_8point(x1: &[[f64; 2]], x2: &[[f64; 2]]) -> Result<Mat33, FundamentalError> {
    if x1.len() != x2.len() {
        return Err(FundamentalError::MismatchedPoints(x1.len(), x2.len()));
    }
    if x1.len() < 8 {
        return Err(FundamentalError::NotEnoughPoints(x1.len(), 8));
    }

    // Normalize points with similarity transforms T1, T2 to have zero mean and avg sqrt(2) distance
    let (x1n, t1) = normalize_points_2d(x1);
    let (x2n, t2) = normalize_points_2d(x2);

    // Build design matrix A (N x 9) for x2' * F * x1 = 0, padded so the null vector is kept
    let n = x1n.len();
    let mut a = faer::Mat::<f64>::zeros(n.max(9), 9);
    for i in 0..n {
        let (x, y) = (x1n[i][0], x1n[i][1]);
        let (xp, yp) = (x2n[i][0], x2n[i][1]);
        let row = [xp * x, xp * y, xp, yp * x, yp * y, yp, x, y, 1.0];
        for (j, v) in row.iter().enumerate() {
            a.write(i, j, *v);
        }
    }

    // Solve Af = 0 via SVD: take last column of V
    let svd = a.thin_svd();
    let fvec = svd.v().col(8);
    let f = [
        [fvec.read(0), fvec.read(1), fvec.read(2)],
        [fvec.read(3), fvec.read(4), fvec.read(5)],
        [fvec.read(6), fvec.read(7), fvec.read(8)],
    ];

    // Enforce rank-2 and denormalize: F = T2^T * F * T1
    let f = enforce_rank2(&f);
    let f = mul_mat33(&mul_mat33(&transpose_mat33(&t2), &f), &t1);

    Ok(normalize_frobenius(&f))
}

/// Zero the smallest singular value of a 3x3 matrix.
pub fn enforce_rank2(f: &Mat33) -> Mat33 {
    let (u, s, v) = svd_mat33(f);
    let us = [
        [u[0][0] * s[0], u[0][1] * s[1], 0.0],
        [u[1][0] * s[0], u[1][1] * s[1], 0.0],
        [u[2][0] * s[0], u[2][1] * s[1], 0.0],
    ];
    mul_mat33(&us, &transpose_mat33(&v))
}

fn normalize_frobenius(f: &Mat33) -> Mat33 {
    let norm = f.iter().flatten().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        f.map(|row| row.map(|v| v / norm))
    } else {
        *f
    }
}

fn normalize_points_2d(x: &[[f64; 2]]) -> (Vec<[f64; 2]>, Mat33) {
    let n = x.len() as f64;
    let (mut mx, mut my) = (0.0, 0.0);
    for p in x {
        mx += p[0];
        my += p[1];
    }
    mx /= n;
    my /= n;
    let mean_dist = x
        .iter()
        .map(|p| ((p[0] - mx).powi(2) + (p[1] - my).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    let scale = if mean_dist > 0.0 {
        (2.0f64).sqrt() / mean_dist
    } else {
        1.0
    };

    let xn = x
        .iter()
        .map(|p| [(p[0] - mx) * scale, (p[1] - my) * scale])
        .collect();

    // Similarity transform matrix T = [[s,0,-s*mx],[0,s,-s*my],[0,0,1]]
    let t = [
        [scale, 0.0, -scale * mx],
        [0.0, scale, -scale * my],
        [0.0, 0.0, 1.0],
    ];
    (xn, t)
}

/// Compute the fundamental matrix of a calibrated pair from the camera matrix and relative pose.
///
/// `F = K^-T * [t]x * R * K^-1`, both views sharing the camera matrix `k`.
pub fn fundamental_from_pose(k: &Mat33, pose: &RelativePose) -> Result<Mat33, FundamentalError> {
    let k_inv = inverse_mat33(k).ok_or(FundamentalError::SingularCamera)?;
    let essential = mul_mat33(&skew_mat33(&pose.translation), &pose.rotation);
    let f = mul_mat33(&mul_mat33(&transpose_mat33(&k_inv), &essential), &k_inv);
    Ok(normalize_frobenius(&f))
}

/// Compute the Sampson distance of a correspondence to the epipolar geometry.
pub fn sampson_distance(f: &Mat33, x1: &[f64; 2], x2: &[f64; 2]) -> f64 {
    let p1 = [x1[0], x1[1], 1.0];
    let p2 = [x2[0], x2[1], 1.0];
    let fx1 = mul_mat33_vec3(f, &p1);
    let ftx2 = mul_mat33_vec3(&transpose_mat33(f), &p2);
    let num = p2[0] * fx1[0] + p2[1] * fx1[1] + fx1[2];
    let den = fx1[0] * fx1[0] + fx1[1] * fx1[1] + ftx2[0] * ftx2[0] + ftx2[1] * ftx2[1];
    if den <= 0.0 {
        return f64::INFINITY;
    }
    num * num / den
}

/// Distances in pixels of each point to the epipolar line of its partner.
///
/// Returns `(d1, d2)`: `d1` is the distance of `x1` to `F^T * x2`, `d2` the distance of `x2`
/// to `F * x1`.
pub fn epipolar_distances(f: &Mat33, x1: &[f64; 2], x2: &[f64; 2]) -> (f64, f64) {
    let line_distance = |l: [f64; 3], p: &[f64; 2]| {
        let norm = (l[0] * l[0] + l[1] * l[1]).sqrt();
        if norm > 0.0 {
            (l[0] * p[0] + l[1] * p[1] + l[2]).abs() / norm
        } else {
            f64::INFINITY
        }
    };
    let l2 = mul_mat33_vec3(f, &[x1[0], x1[1], 1.0]);
    let l1 = mul_mat33_vec3(&transpose_mat33(f), &[x2[0], x2[1], 1.0]);
    (line_distance(l1, x1), line_distance(l2, x2))
}

/// Mean and standard deviation of the Sampson distance over a set of matches.
pub fn sampson_error_stats(f: &Mat33, matches: &[FeatureMatch]) -> (f64, f64) {
    if matches.is_empty() {
        return (0.0, 0.0);
    }
    let errors: Vec<f64> = matches
        .iter()
        .map(|m| sampson_distance(f, &m.left, &m.right))
        .collect();
    let n = errors.len() as f64;
    let mean = errors.iter().sum::<f64>() / n;
    let var = errors.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
