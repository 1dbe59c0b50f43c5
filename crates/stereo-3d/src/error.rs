use stereo_image::ImageError;

/// An error type for the fundamental matrix estimation.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FundamentalError {
    /// Not enough correspondences to estimate the model.
    #[error("Need at least {1} correspondences, got {0}")]
    NotEnoughPoints(usize, usize),

    /// The two point sets have different lengths.
    #[error("Mismatched correspondences: {0} points in the first view, {1} in the second")]
    MismatchedPoints(usize, usize),

    /// The camera matrix cannot be inverted.
    #[error("The camera matrix is singular")]
    SingularCamera,
}

/// An error type for the rectification module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RectifyError {
    /// Fewer correspondences than required survived the epipolar filter.
    #[error("Only {found} correspondences within the epipolar threshold, need {required}")]
    NotEnoughInliers {
        /// Number of correspondences that survived.
        found: usize,
        /// Minimum number of correspondences.
        required: usize,
    },

    /// A linear solve is numerically ill conditioned.
    #[error("Ill conditioned rectification: {0}")]
    IllConditioned(String),

    /// The stereo baseline is zero.
    #[error("The baseline between the two cameras is zero")]
    ZeroBaseline,

    /// The search range estimation was called without correspondences.
    #[error("No correspondences to estimate the disparity range from")]
    EmptyMatches,

    /// The estimated disparity range is empty or inverted.
    #[error("Invalid disparity range [{0}, {1}]")]
    InvalidRange(f64, f64),

    /// Error from the fundamental matrix estimation.
    #[error(transparent)]
    Fundamental(#[from] FundamentalError),

    /// Error from the image processing operations.
    #[error(transparent)]
    Image(#[from] ImageError),
}
