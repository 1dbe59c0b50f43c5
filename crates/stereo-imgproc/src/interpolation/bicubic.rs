use stereo_image::Image;

/// Free parameter of the cubic convolution kernel.
const A: f32 = -0.75;

#[inline]
fn cubic_weight(t: f32) -> f32 {
    let t = t.abs();
    if t <= 1.0 {
        ((A + 2.0) * t - (A + 3.0)) * t * t + 1.0
    } else if t < 2.0 {
        ((A * t - 5.0 * A) * t + 8.0 * A) * t - 4.0 * A
    } else {
        0.0
    }
}

/// Kernel for bicubic interpolation
///
/// Cubic convolution over the 4x4 neighbourhood of the sample; neighbours outside the image are
/// replicated from the border.
pub(crate) fn bicubic_interpolation<T, const C: usize>(
    image: &Image<T, C>,
    u: f32,
    v: f32,
) -> [f32; C]
where
    T: Copy + Into<f32>,
{
    let (rows, cols) = (image.rows() as isize, image.cols() as isize);

    let u0 = u.floor();
    let v0 = v.floor();
    let fu = u - u0;
    let fv = v - v0;
    let (iu, iv) = (u0 as isize, v0 as isize);

    let wu = [
        cubic_weight(1.0 + fu),
        cubic_weight(fu),
        cubic_weight(1.0 - fu),
        cubic_weight(2.0 - fu),
    ];
    let wv = [
        cubic_weight(1.0 + fv),
        cubic_weight(fv),
        cubic_weight(1.0 - fv),
        cubic_weight(2.0 - fv),
    ];

    let data = image.as_slice();
    let mut pixel = [0.0; C];

    for (j, wy) in wv.iter().enumerate() {
        let y = (iv + j as isize - 1).clamp(0, rows - 1) as usize;
        for (i, wx) in wu.iter().enumerate() {
            let x = (iu + i as isize - 1).clamp(0, cols - 1) as usize;
            let base = (y * cols as usize + x) * C;
            let w = wx * wy;
            for (k, out) in pixel.iter_mut().enumerate() {
                *out += data[base + k].into() * w;
            }
        }
    }

    pixel
}

#[cfg(test)]
mod tests {
    #[test]
    fn weights_partition_unity() {
        for f in [0.0f32, 0.1, 0.5, 0.9] {
            let sum = super::cubic_weight(1.0 + f)
                + super::cubic_weight(f)
                + super::cubic_weight(1.0 - f)
                + super::cubic_weight(2.0 - f);
            approx::assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-6);
        }
        assert_eq!(super::cubic_weight(0.0), 1.0);
        assert_eq!(super::cubic_weight(1.0), 0.0);
        assert_eq!(super::cubic_weight(2.0), 0.0);
    }
}
