use crate::linalg::Mat33;

/// Utility function to convert a 3x3 array to a faer matrix 3x3.
///
/// # Arguments
///
/// * `array` - A row-major 3x3 array.
///
/// # Returns
///
/// A faer matrix 3x3.
pub fn array33_to_faer_mat33(array: &Mat33) -> faer::Mat<f64> {
    faer::Mat::from_fn(3, 3, |i, j| array[i][j])
}

/// Utility function to convert a faer matrix into a 3x3 array.
///
/// Only the top-left 3x3 block of `mat` is read.
pub fn faer_mat33_to_array33(mat: faer::MatRef<'_, f64>) -> Mat33 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, val) in row.iter_mut().enumerate() {
            *val = mat.read(i, j);
        }
    }
    out
}

/// Singular value decomposition `m = U * diag(s) * V^T` of a 3x3 matrix.
///
/// The singular values are sorted in decreasing order.
pub fn svd_mat33(m: &Mat33) -> (Mat33, [f64; 3], Mat33) {
    let svd = array33_to_faer_mat33(m).svd();
    let s = svd.s_diagonal();
    (
        faer_mat33_to_array33(svd.u()),
        [s.read(0), s.read(1), s.read(2)],
        faer_mat33_to_array33(svd.v()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{mul_mat33, transpose_mat33};

    #[test]
    fn test_array33_to_mat33() {
        let array = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        let mat = array33_to_faer_mat33(&array);
        assert_eq!(mat.read(0, 0), 1.0);
        assert_eq!(mat.read(0, 1), 2.0);
        assert_eq!(mat.read(1, 2), 6.0);
        assert_eq!(mat.read(2, 0), 7.0);
        assert_eq!(faer_mat33_to_array33(mat.as_ref()), array);
    }

    #[test]
    fn test_svd_mat33_reconstructs() {
        let m = [[4.0, 1.0, -2.0], [0.5, 3.0, 1.0], [2.0, -1.0, 5.0]];
        let (u, s, v) = svd_mat33(&m);
        assert!(s[0] >= s[1] && s[1] >= s[2]);
        let us = [
            [u[0][0] * s[0], u[0][1] * s[1], u[0][2] * s[2]],
            [u[1][0] * s[0], u[1][1] * s[1], u[1][2] * s[2]],
            [u[2][0] * s[0], u[2][1] * s[1], u[2][2] * s[2]],
        ];
        let back = mul_mat33(&us, &transpose_mat33(&v));
        for i in 0..3 {
            for j in 0..3 {
                approx::assert_abs_diff_eq!(back[i][j], m[i][j], epsilon = 1e-10);
            }
        }
    }
}
