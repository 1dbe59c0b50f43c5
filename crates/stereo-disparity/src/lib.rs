#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Fixed-point disparity decoding and the real-valued disparity map.
pub mod decode;

/// Error types for the disparity module.
pub mod error;

/// The dense matcher interface.
pub mod matcher;

/// Semi-global block matching.
pub mod sgbm;

/// Mapping disparity maps back to the source image frame.
pub mod unwarp;

/// Disparity search windows.
pub mod window;

pub use crate::decode::{decode_fixed_point, encode_fixed_point, DisparityMap, FixedPointDisparity};
pub use crate::error::DisparityError;
pub use crate::matcher::StereoMatcher;
pub use crate::sgbm::{SemiGlobalMatcher, SgbmParams};
pub use crate::window::{SearchWindow, DISPARITY_SCALE};
