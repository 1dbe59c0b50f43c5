use crate::{Image, ImageError};

/// Quantize a floating point image into a fixed point integer image.
///
/// Every value is multiplied by `scale` and rounded to nearest. Non-finite values are written
/// as `invalid`.
pub fn quantize<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<i16, C>,
    scale: f32,
    invalid: i16,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.width(),
            src.height(),
            dst.width(),
            dst.height(),
        ));
    }

    dst.as_slice_mut()
        .iter_mut()
        .zip(src.as_slice().iter())
        .for_each(|(out, &inp)| {
            *out = if inp.is_finite() {
                (inp * scale)
                    .round()
                    .clamp(i16::MIN as f32, i16::MAX as f32) as i16
            } else {
                invalid
            };
        });

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{Image, ImageError, ImageSize};

    #[test]
    fn test_quantize() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 4,
            height: 1,
        };
        let src = Image::<f32, 1>::new(size, vec![0.5, -1.25, f32::NAN, 3.0])?;
        let mut dst = Image::<i16, 1>::from_size_val(size, 0)?;

        super::quantize(&src, &mut dst, 16.0, -16)?;

        assert_eq!(dst.as_slice(), &[8, -20, -16, 48]);

        Ok(())
    }

    #[test]
    fn test_quantize_size_mismatch() -> Result<(), ImageError> {
        let src = Image::<f32, 1>::from_size_val([2, 2].into(), 0.0)?;
        let mut dst = Image::<i16, 1>::from_size_val([3, 2].into(), 0)?;
        assert!(super::quantize(&src, &mut dst, 16.0, -16).is_err());
        Ok(())
    }
}
