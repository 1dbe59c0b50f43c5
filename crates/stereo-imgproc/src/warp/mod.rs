//! Geometric image transformations using perspective warps.
//!
//! Rectifying homographies are applied with [`warp_perspective`]; [`invert_perspective_matrix`]
//! and [`transform_point`] are shared with the code that maps feature points through the same
//! homographies.

mod perspective;

pub use perspective::{invert_perspective_matrix, transform_point, warp_perspective};
