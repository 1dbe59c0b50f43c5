#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Pinhole camera with lens distortion.
pub mod camera;

/// Point correspondences between two images.
pub mod correspondence;

/// Error types for the 3d module.
pub mod error;

/// Fundamental matrix estimation and epipolar distances.
pub mod fundamental;

/// Linear algebra utilities.
pub mod linalg;

/// Rigid poses and relative pose between frames.
pub mod pose;

/// Disparity search range estimation.
pub mod range;

/// Calibrated and uncalibrated stereo rectification.
pub mod rectify;

/// Conversions between arrays and faer matrices.
pub mod utils;
