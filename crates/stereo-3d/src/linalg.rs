//! Small fixed size linear algebra on row-major arrays.

/// A row-major 3x3 matrix.
pub type Mat33 = [[f64; 3]; 3];

/// A row-major 4x4 matrix.
pub type Mat44 = [[f64; 4]; 4];

/// The 3x3 identity matrix.
pub const IDENTITY33: Mat33 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Multiply two 3x3 matrices.
pub fn mul_mat33(a: &Mat33, b: &Mat33) -> Mat33 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, val) in row.iter_mut().enumerate() {
            *val = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    out
}

/// Multiply a 3x3 matrix with a column vector.
pub fn mul_mat33_vec3(a: &Mat33, v: &[f64; 3]) -> [f64; 3] {
    [
        a[0][0] * v[0] + a[0][1] * v[1] + a[0][2] * v[2],
        a[1][0] * v[0] + a[1][1] * v[1] + a[1][2] * v[2],
        a[2][0] * v[0] + a[2][1] * v[1] + a[2][2] * v[2],
    ]
}

/// Transpose a 3x3 matrix.
pub fn transpose_mat33(a: &Mat33) -> Mat33 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in a.iter().enumerate() {
        for (j, val) in row.iter().enumerate() {
            out[j][i] = *val;
        }
    }
    out
}

/// Determinant of a 3x3 matrix.
#[rustfmt::skip]
pub fn det_mat33(m: &Mat33) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1]) -
    m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0]) +
    m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Inverse of a 3x3 matrix, or `None` when it is singular.
pub fn inverse_mat33(m: &Mat33) -> Option<Mat33> {
    let det = det_mat33(m);
    if det == 0.0 || !det.is_finite() {
        return None;
    }
    let inv_det = 1.0 / det;
    Some([
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
        ],
    ])
}

/// Flatten a 3x3 matrix into row-major order.
pub fn flatten_mat33(m: &Mat33) -> [f64; 9] {
    [
        m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2], m[2][0], m[2][1], m[2][2],
    ]
}

/// Cross product of two 3d vectors.
pub fn cross_vec3(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Dot product of two 3d vectors.
pub fn dot_product3(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Euclidean norm of a 3d vector.
pub fn norm_vec3(a: &[f64; 3]) -> f64 {
    dot_product3(a, a).sqrt()
}

/// The cross product matrix `[v]x` such that `[v]x * w = v x w`.
pub fn skew_mat33(v: &[f64; 3]) -> Mat33 {
    [[0.0, -v[2], v[1]], [v[2], 0.0, -v[0]], [-v[1], v[0], 0.0]]
}

/// Apply a homography to a 2d point.
pub fn transform_point2(h: &Mat33, p: &[f64; 2]) -> [f64; 2] {
    let [x, y, w] = mul_mat33_vec3(h, &[p[0], p[1], 1.0]);
    [x / w, y / w]
}

/// Multiply two 4x4 matrices.
pub fn mul_mat44(a: &Mat44, b: &Mat44) -> Mat44 {
    let mut out = [[0.0; 4]; 4];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, val) in row.iter_mut().enumerate() {
            *val = (0..4).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

/// Inverse of a rigid 4x4 transform `[R t; 0 1]`, i.e. `[R^T -R^T t; 0 1]`.
pub fn inverse_rigid_mat44(m: &Mat44) -> Mat44 {
    let mut out = [[0.0; 4]; 4];
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = m[j][i];
        }
        out[i][3] = -(0..3).map(|k| m[k][i] * m[k][3]).sum::<f64>();
    }
    out[3][3] = 1.0;
    out
}

/// Split a 4x4 transform into its rotation block and translation column.
pub fn split_mat44(m: &Mat44) -> (Mat33, [f64; 3]) {
    let mut r = [[0.0; 3]; 3];
    let mut t = [0.0; 3];
    for i in 0..3 {
        r[i] = [m[i][0], m[i][1], m[i][2]];
        t[i] = m[i][3];
    }
    (r, t)
}

/// Convert an axis-angle (Rodrigues) vector into a rotation matrix.
pub fn rotation_from_rodrigues(r: &[f64; 3]) -> Mat33 {
    let theta = norm_vec3(r);
    if theta < f64::EPSILON {
        return IDENTITY33;
    }

    let k = [r[0] / theta, r[1] / theta, r[2] / theta];
    let (s, c) = theta.sin_cos();
    let kx = skew_mat33(&k);

    let mut out = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            let identity = if i == j { c } else { 0.0 };
            out[i][j] = identity + (1.0 - c) * k[i] * k[j] + s * kx[i][j];
        }
    }
    out
}

/// Convert a rotation matrix into an axis-angle (Rodrigues) vector.
pub fn rodrigues_from_rotation(m: &Mat33) -> [f64; 3] {
    let rx = m[2][1] - m[1][2];
    let ry = m[0][2] - m[2][0];
    let rz = m[1][0] - m[0][1];

    let s = (rx * rx + ry * ry + rz * rz).sqrt() * 0.5;
    let c = ((m[0][0] + m[1][1] + m[2][2] - 1.0) * 0.5).clamp(-1.0, 1.0);
    let theta = c.acos();

    if s < 1e-5 {
        if c > 0.0 {
            return [0.0; 3];
        }

        // rotation by pi: the axis comes from the symmetric part
        let t = |i: usize| ((m[i][i] + 1.0) * 0.5).max(0.0).sqrt();
        let mut axis = [
            t(0),
            t(1) * if m[0][1] < 0.0 { -1.0 } else { 1.0 },
            t(2) * if m[0][2] < 0.0 { -1.0 } else { 1.0 },
        ];
        if axis[0].abs() < axis[1].abs()
            && axis[0].abs() < axis[2].abs()
            && (m[1][2] > 0.0) != (axis[1] * axis[2] > 0.0)
        {
            axis[2] = -axis[2];
        }
        let norm = norm_vec3(&axis);
        return axis.map(|v| v * theta / norm);
    }

    let vth = theta / (2.0 * s);
    [rx * vth, ry * vth, rz * vth]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_mat33_eq(a: &Mat33, b: &Mat33, epsilon: f64) {
        for i in 0..3 {
            for j in 0..3 {
                approx::assert_abs_diff_eq!(a[i][j], b[i][j], epsilon = epsilon);
            }
        }
    }

    #[test]
    fn test_inverse_mat33() {
        let m = [[2.0, 0.0, 1.0], [1.0, 3.0, 0.0], [0.0, 1.0, 4.0]];
        let inv = inverse_mat33(&m);
        assert!(inv.is_some());
        let inv = inv.unwrap_or(IDENTITY33);
        assert_mat33_eq(&mul_mat33(&m, &inv), &IDENTITY33, 1e-12);

        let singular = [[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [0.0, 0.0, 0.0]];
        assert!(inverse_mat33(&singular).is_none());
    }

    #[test]
    fn test_cross_and_skew() {
        let a = [1.0, 2.0, 3.0];
        let b = [-2.0, 0.5, 4.0];
        assert_eq!(cross_vec3(&a, &b), mul_mat33_vec3(&skew_mat33(&a), &b));
        assert_relative_eq!(dot_product3(&a, &cross_vec3(&a, &b)), 0.0);
    }

    #[test]
    fn test_inverse_rigid_mat44() {
        let r = rotation_from_rodrigues(&[0.1, -0.4, 0.3]);
        let m = [
            [r[0][0], r[0][1], r[0][2], 1.0],
            [r[1][0], r[1][1], r[1][2], -2.0],
            [r[2][0], r[2][1], r[2][2], 3.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let product = mul_mat44(&m, &inverse_rigid_mat44(&m));
        for (i, row) in product.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                approx::assert_abs_diff_eq!(*v, expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_rodrigues_roundtrip() {
        for r in [[0.0, 0.0, 0.0], [0.3, -0.2, 0.1], [0.0, 3.0, 0.0], [1.2, 0.4, -2.0]] {
            let m = rotation_from_rodrigues(&r);
            assert_relative_eq!(det_mat33(&m), 1.0, epsilon = 1e-12);
            let back = rodrigues_from_rotation(&m);
            for k in 0..3 {
                approx::assert_abs_diff_eq!(back[k], r[k], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_rodrigues_half_turn() {
        let m = rotation_from_rodrigues(&[0.0, 0.0, std::f64::consts::PI]);
        let back = rotation_from_rodrigues(&rodrigues_from_rotation(&m));
        assert_mat33_eq(&back, &m, 1e-9);
    }

    #[test]
    fn test_rotation_about_z() {
        let m = rotation_from_rodrigues(&[0.0, 0.0, std::f64::consts::FRAC_PI_2]);
        let expected = [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        assert_mat33_eq(&m, &expected, 1e-12);
    }
}
