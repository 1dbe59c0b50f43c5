#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// lens distortion and rectification map module.
pub mod calibration;

/// color transformations module.
pub mod color;

/// utilities for interpolation.
pub mod interpolation;

/// module containing parallization utilities.
pub mod parallel;

/// utility functions for resizing images.
pub mod resize;

/// image geometric transformations module.
pub mod warp;
