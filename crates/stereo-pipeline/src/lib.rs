#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Running the pipeline over a range of frame indices.
pub mod batch;

/// Camera calibration shared by both frames.
pub mod calibration;

/// Pipeline configuration.
pub mod config;

/// Error types for the pipeline.
pub mod error;

/// Posed colour frames.
pub mod frame;

/// Rectification of an image pair from correspondences alone.
pub mod hartley;

/// Writing the results of a run to disk.
pub mod output;

/// The stage sequence of one pipeline run.
pub mod pipeline;

pub use crate::batch::{run_batch, BatchOptions, BatchSummary};
pub use crate::calibration::Calibration;
pub use crate::config::{PipelineConfig, RectificationStrategy};
pub use crate::error::PipelineError;
pub use crate::frame::Frame;
pub use crate::hartley::{rectify_image_pair, HartleyOptions, HartleyOutput};
pub use crate::pipeline::{PipelineOutput, PipelineStage, QualityWarning, StereoPipeline};
