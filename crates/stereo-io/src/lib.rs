#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for I/O operations.
///
/// Defines [`error::IoError`] variants for file access, encoding/decoding failures,
/// and malformed records.
pub mod error;

/// High-level image reading functions.
///
/// See [`functional::read_image_any_rgb8`] for automatic format detection.
pub mod functional;

/// File naming of indexed frames and outputs.
pub mod naming;

/// PNG image encoding and decoding.
pub mod png;

/// JSON records for calibration, poses and correspondences.
pub mod records;

/// TIFF image encoding and decoding.
pub mod tiff;

/// Internal utility functions for image bit depth conversion.
mod conv_utils;

pub use crate::error::IoError;
