//! Pixel interpolation methods for image transformations.
//!
//! This module provides the interpolation kernels used when resampling images during
//! geometric transformations like resizing, warping, or remapping.
//!
//! # Interpolation Modes
//!
//! - **Nearest**: uses the nearest pixel value, never blends samples (disparity maps)
//! - **Bilinear**: linear interpolation between the four adjacent pixels
//! - **Bicubic**: cubic convolution over a 4x4 neighbourhood (rectified images)

mod bicubic;
mod bilinear;

/// Grid generation and coordinate mapping utilities.
///
/// Functions for generating coordinate meshgrids used in image warping
/// and transformation operations.
pub mod grid;

pub(crate) mod interpolate;
mod nearest;
mod remap;

pub use interpolate::{interpolate_pixel, InterpolationMode};
pub use remap::{remap, sample_in_bounds};
