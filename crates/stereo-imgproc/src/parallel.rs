use rayon::prelude::*;

use stereo_image::Image;

/// Apply a function to each pixel in the image in parallel.
pub fn par_iter_rows<T1, const C1: usize, T2, const C2: usize>(
    src: &Image<T1, C1>,
    dst: &mut Image<T2, C2>,
    f: impl Fn(&[T1], &mut [T2]) + Send + Sync,
) where
    T1: Clone + Send + Sync,
    T2: Clone + Send + Sync,
{
    src.as_slice()
        .par_chunks_exact(C1 * src.cols())
        .zip(dst.as_slice_mut().par_chunks_exact_mut(C2 * src.cols()))
        .for_each(|(src_chunk, dst_chunk)| {
            src_chunk
                .chunks_exact(C1)
                .zip(dst_chunk.chunks_exact_mut(C2))
                .for_each(|(src_pixel, dst_pixel)| {
                    f(src_pixel, dst_pixel);
                });
        });
}

/// Apply a function to each pixel for grid sampling in parallel.
///
/// `map_x` and `map_y` hold the source coordinates of every destination pixel and must have the
/// size of `dst`.
pub fn par_iter_rows_resample<T, const C: usize>(
    dst: &mut Image<T, C>,
    map_x: &Image<f32, 1>,
    map_y: &Image<f32, 1>,
    f: impl Fn(&f32, &f32, &mut [T]) + Send + Sync,
) where
    T: Send + Sync,
{
    let cols = dst.cols();
    let map_x_slice = map_x.as_slice();
    let map_y_slice = map_y.as_slice();

    dst.as_slice_mut()
        .par_chunks_exact_mut(C * cols)
        .zip(map_x_slice.par_chunks_exact(cols))
        .zip(map_y_slice.par_chunks_exact(cols))
        .for_each(|((dst_chunk, map_x_chunk), map_y_chunk)| {
            dst_chunk
                .chunks_exact_mut(C)
                .zip(map_x_chunk.iter().zip(map_y_chunk.iter()))
                .for_each(|(dst_pixel, (x, y))| {
                    f(x, y, dst_pixel);
                });
        });
}

#[cfg(test)]
mod tests {
    use stereo_image::{Image, ImageError, ImageSize};

    #[test]
    fn test_par_iter_rows() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 3,
            height: 2,
        };
        let src = Image::<u8, 2>::new(size, (0..12).collect())?;
        let mut dst = Image::<u16, 1>::from_size_val(size, 0)?;

        super::par_iter_rows(&src, &mut dst, |s, d| d[0] = s[0] as u16 + s[1] as u16);

        assert_eq!(dst.as_slice(), &[1, 5, 9, 13, 17, 21]);
        Ok(())
    }

    #[test]
    fn test_par_iter_rows_resample() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 2,
            height: 2,
        };
        let map_x = Image::<f32, 1>::new(size, vec![0.0, 1.0, 2.0, 3.0])?;
        let map_y = Image::<f32, 1>::new(size, vec![10.0, 10.0, 20.0, 20.0])?;
        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0)?;

        super::par_iter_rows_resample(&mut dst, &map_x, &map_y, |x, y, p| p[0] = x + y);

        assert_eq!(dst.as_slice(), &[10.0, 11.0, 22.0, 23.0]);
        Ok(())
    }
}
