use std::path::PathBuf;

use stereo_3d::error::{FundamentalError, RectifyError};
use stereo_disparity::DisparityError;
use stereo_image::ImageError;
use stereo_io::IoError;

use crate::pipeline::PipelineStage;

/// An error type for the pipeline.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// A calibration, image or pose file is missing.
    #[error("Input not found: {0}")]
    InputNotFound(PathBuf),

    /// An input has the wrong shape or an impossible value.
    #[error("Malformed data: {0}")]
    MalformedData(String),

    /// The geometry of the pair cannot be rectified or searched.
    #[error("Geometric degeneracy: {0}")]
    GeometricDegeneracy(String),

    /// A stage of a run failed.
    #[error("Stage {stage} failed. {source}")]
    StageFailed {
        /// The stage that failed.
        stage: PipelineStage,
        /// The error of the stage.
        source: Box<PipelineError>,
    },

    /// Error from the file operations.
    #[error(transparent)]
    Io(IoError),

    /// Error from the image operations.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Error from the fundamental matrix estimation.
    #[error(transparent)]
    Fundamental(#[from] FundamentalError),

    /// Error from the dense matcher.
    #[error(transparent)]
    Disparity(DisparityError),

    /// The worker pool could not be created.
    #[error("Failed to build the worker pool. {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl PipelineError {
    /// The underlying error, looking through the stage that failed.
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::StageFailed { source, .. } => source.root(),
            other => other,
        }
    }

    /// The stage that failed, if the error comes from a run.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            PipelineError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether the error is a geometric degeneracy, which a batch may skip.
    pub fn is_degenerate(&self) -> bool {
        matches!(self.root(), PipelineError::GeometricDegeneracy(_))
    }
}

impl From<IoError> for PipelineError {
    fn from(e: IoError) -> Self {
        match e {
            IoError::FileDoesNotExist(path) => PipelineError::InputNotFound(path),
            IoError::MalformedRecord(path, msg) => {
                PipelineError::MalformedData(format!("{}: {msg}", path.display()))
            }
            IoError::JsonError(e) => PipelineError::MalformedData(e.to_string()),
            other => PipelineError::Io(other),
        }
    }
}

impl From<RectifyError> for PipelineError {
    fn from(e: RectifyError) -> Self {
        match e {
            RectifyError::Fundamental(e) => PipelineError::Fundamental(e),
            RectifyError::Image(e) => PipelineError::Image(e),
            degenerate => PipelineError::GeometricDegeneracy(degenerate.to_string()),
        }
    }
}

impl From<DisparityError> for PipelineError {
    fn from(e: DisparityError) -> Self {
        match e {
            DisparityError::InvalidRange(..) | DisparityError::WindowOverflow(..) => {
                PipelineError::GeometricDegeneracy(e.to_string())
            }
            DisparityError::Image(e) => PipelineError::Image(e),
            other => PipelineError::Disparity(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_of_lower_level_errors() {
        let e: PipelineError = IoError::FileDoesNotExist("pose_0001.json".into()).into();
        assert!(matches!(e, PipelineError::InputNotFound(_)));

        let e: PipelineError = RectifyError::ZeroBaseline.into();
        assert!(e.is_degenerate());

        let e: PipelineError = RectifyError::NotEnoughInliers {
            found: 3,
            required: 8,
        }
        .into();
        assert!(e.is_degenerate());

        let e: PipelineError = RectifyError::IllConditioned("collinear".to_string()).into();
        assert!(e.is_degenerate());

        let e: PipelineError = DisparityError::InvalidRange(5.0, -1.0).into();
        assert!(e.is_degenerate());

        let e: PipelineError = DisparityError::InvalidBlockSize(4).into();
        assert!(matches!(e, PipelineError::Disparity(_)));
        assert!(!e.is_degenerate());
    }

    #[test]
    fn stage_failure_keeps_the_root() {
        let e = PipelineError::StageFailed {
            stage: PipelineStage::Rectify,
            source: Box::new(PipelineError::GeometricDegeneracy("collinear".to_string())),
        };
        assert_eq!(e.stage(), Some(PipelineStage::Rectify));
        assert!(e.is_degenerate());
        assert!(e.to_string().contains("Rectify"));
    }
}
