use stereo_image::{ImageError, ImageSize};

/// An error type for the disparity module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum DisparityError {
    /// The disparity range is empty, inverted or not finite.
    #[error("Invalid disparity range [{0}, {1}]")]
    InvalidRange(f64, f64),

    /// The search window violates the multiple of 16 constraint.
    #[error("Search window min {0} and count {1} must be multiples of 16, count positive")]
    InvalidSearchWindow(i32, i32),

    /// The search window does not fit the 16 bit fixed-point encoding.
    #[error("Search window [{0}, {1}) overflows the fixed-point range")]
    WindowOverflow(i32, i32),

    /// The block size is even or zero.
    #[error("Block size must be odd and positive, got {0}")]
    InvalidBlockSize(usize),

    /// The two images do not have the same size.
    #[error("Left image is {0}, right image is {1}")]
    SizeMismatch(ImageSize, ImageSize),

    /// The rectifying homography cannot be inverted.
    #[error("The rectifying homography is singular")]
    SingularHomography,

    /// Error from the image operations.
    #[error(transparent)]
    Image(#[from] ImageError),
}
