use std::path::Path;

use serde::{Deserialize, Serialize};
use stereo_3d::pose::PoseConvention;
use stereo_3d::range::DisparityRange;
use stereo_3d::rectify::StereoRectifyParams;
use stereo_disparity::SgbmParams;

use crate::error::PipelineError;

/// How the rectifying transforms are computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RectificationStrategy {
    /// From the calibration and the relative pose, as dense remap tables.
    #[default]
    Calibrated,
    /// From point correspondences and the fundamental matrix, as homographies.
    Uncalibrated,
}

/// The parameters of one pipeline run.
///
/// Every field has a default, so an empty JSON object is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Calibrated or uncalibrated rectification.
    pub strategy: RectificationStrategy,
    /// How the pose files are to be read.
    pub pose_convention: PoseConvention,
    /// Options of the calibrated rectification.
    pub rectify: StereoRectifyParams,
    /// Parameters of the dense matcher.
    pub sgbm: SgbmParams,
    /// Disparity range searched when no correspondences are given.
    pub disparity_range: DisparityRange,
    /// Maximum distance in pixels of a correspondence to its epipolar line.
    pub hartley_threshold: f64,
    /// Use the fundamental matrix of the calibration and relative pose instead of estimating it
    /// from the correspondences.
    pub fundamental_from_pose: bool,
    /// Also map the disparity back onto the first source image.
    pub unwarp: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategy: RectificationStrategy::Calibrated,
            pose_convention: PoseConvention::CameraToWorld,
            rectify: StereoRectifyParams::default(),
            sgbm: SgbmParams::default(),
            disparity_range: DisparityRange {
                min: 0.0,
                max: 63.0,
            },
            hartley_threshold: 1.0,
            fundamental_from_pose: false,
            unwarp: false,
        }
    }
}

impl PipelineConfig {
    /// Read a configuration from a JSON file.
    pub fn from_file(file_path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        Ok(stereo_io::records::read_json(file_path)?)
    }

    /// Read a configuration from a JSON file, or the defaults when there is no file.
    pub fn from_file_or_default(file_path: Option<&Path>) -> Result<Self, PipelineError> {
        match file_path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() -> Result<(), serde_json::Error> {
        let config: PipelineConfig = serde_json::from_str("{}")?;
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.sgbm.block_size, 3);
        assert_eq!(config.disparity_range.max, 63.0);
        Ok(())
    }

    #[test]
    fn partial_config() -> Result<(), serde_json::Error> {
        let config: PipelineConfig = serde_json::from_str(
            r#"{
                "strategy": "uncalibrated",
                "pose_convention": "world_to_camera",
                "sgbm": { "block_size": 5 },
                "unwarp": true
            }"#,
        )?;
        assert_eq!(config.strategy, RectificationStrategy::Uncalibrated);
        assert_eq!(config.pose_convention, PoseConvention::WorldToCamera);
        assert_eq!(config.sgbm.block_size, 5);
        assert_eq!(config.sgbm.p2, 2400);
        assert!(config.unwarp);
        assert_eq!(config.hartley_threshold, 1.0);
        Ok(())
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            PipelineConfig::from_file("/nonexistent/config.json"),
            Err(PipelineError::InputNotFound(_))
        ));
        assert_eq!(
            PipelineConfig::from_file_or_default(None).ok(),
            Some(PipelineConfig::default())
        );
    }
}
