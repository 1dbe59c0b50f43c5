use std::path::Path;

use stereo_image::{Image, ImageSize};

use crate::error::IoError;

/// Reads a colour image from the given file path.
///
/// The method reads from any image format supported by the image crate and converts the
/// decoded pixels to 8-bit RGB, whatever their original layout.
///
/// # Arguments
///
/// * `file_path` - The path to a valid image file.
///
/// # Returns
///
/// A RGB image with three channels (rgb8).
pub fn read_image_any_rgb8(file_path: impl AsRef<Path>) -> Result<Image<u8, 3>, IoError> {
    let file_path = file_path.as_ref();

    // verify the file exists
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    let img = image::ImageReader::open(file_path)?
        .with_guessed_format()?
        .decode()?;

    let size = ImageSize {
        width: img.width() as usize,
        height: img.height() as usize,
    };

    let rgb = match img {
        image::DynamicImage::ImageRgb8(buf) => buf,
        other => other.to_rgb8(),
    };

    Ok(Image::new(size, rgb.into_raw())?)
}

/// Reads a colour image, or returns `None` when the file does not exist.
///
/// A file that exists but cannot be decoded is still an error.
pub fn read_image_rgb8_if_exists(
    file_path: impl AsRef<Path>,
) -> Result<Option<Image<u8, 3>>, IoError> {
    match read_image_any_rgb8(file_path) {
        Ok(image) => Ok(Some(image)),
        Err(IoError::FileDoesNotExist(path)) => {
            log::debug!("no image at {}", path.display());
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::png::write_image_png_rgb8;

    #[test]
    fn read_any_png() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("image_0003.png");

        let size = ImageSize {
            width: 7,
            height: 4,
        };
        let image = Image::<u8, 3>::from_fn(size, |r, c| [(r * 7 + c) as u8, 10, 200])?;
        write_image_png_rgb8(&file_path, &image)?;

        let image_back = read_image_any_rgb8(&file_path)?;
        assert_eq!(image_back.size(), size);
        assert_eq!(image_back.as_slice(), image.as_slice());
        Ok(())
    }

    #[test]
    fn read_gray_as_rgb() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("gray.png");

        let gray = image::GrayImage::from_raw(3, 2, vec![0, 50, 100, 150, 200, 250])
            .ok_or(IoError::UnsupportedImageFormat)?;
        gray.save(&file_path)?;

        let rgb = read_image_any_rgb8(&file_path)?;
        assert_eq!(rgb.size().width, 3);
        assert_eq!(rgb.size().height, 2);
        assert_eq!(&rgb.as_slice()[3..6], &[50, 50, 50]);
        Ok(())
    }

    #[test]
    fn missing_image_is_none() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        assert!(read_image_rgb8_if_exists(tmp_dir.path().join("image_0000.jpg"))?.is_none());
        Ok(())
    }

    #[test]
    fn corrupt_image_is_an_error() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("image_0000.png");
        std::fs::write(&file_path, b"definitely not a png")?;
        assert!(read_image_rgb8_if_exists(&file_path).is_err());
        Ok(())
    }
}
