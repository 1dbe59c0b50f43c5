use std::fmt;

use serde::{Deserialize, Serialize};
use stereo_3d::correspondence::{split_matches, FeatureMatch};
use stereo_3d::fundamental::{fundamental_8point, fundamental_from_pose, sampson_error_stats};
use stereo_3d::linalg::Mat33;
use stereo_3d::pose::{relative_pose, RelativePose};
use stereo_3d::range::{estimate_search_range, DisparityRange};
use stereo_3d::rectify::{hartley_rectify, stereo_rectify, RectificationResult, MIN_INLIERS};
use stereo_disparity::unwarp::unwarp_disparity;
use stereo_disparity::{
    decode_fixed_point, DisparityMap, FixedPointDisparity, SearchWindow, SemiGlobalMatcher,
    StereoMatcher,
};
use stereo_image::Image;
use stereo_imgproc::color::gray_from_rgb_u8;

use crate::calibration::Calibration;
use crate::config::{PipelineConfig, RectificationStrategy};
use crate::error::PipelineError;
use crate::frame::Frame;

/// Vertical disagreement in pixels above which a rectification is flagged.
const RESIDUAL_WARNING_PX: f64 = 1.0;

/// The stages of a run, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    /// Check the calibration and both frames.
    LoadInputs,
    /// Express the first camera in the frame of the second.
    ComputeRelativePose,
    /// Compute the rectifying transforms and the disparity search window.
    Rectify,
    /// Resample both images into the rectified frame.
    Warp,
    /// Run the dense matcher.
    Match,
    /// Decode the matcher output and map it back to the source frame.
    PostProcess,
    /// The run completed.
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A problem with the result that does not stop the run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityWarning {
    /// Every pixel of the disparity map is a no-match.
    MatcherProducesNoData,
    /// The rectified correspondences disagree vertically by this many pixels (rms).
    RectificationResidual(f64),
}

/// Everything a run produces.
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    /// Id of the first frame.
    pub index_1: usize,
    /// Id of the second frame.
    pub index_2: usize,
    /// The strategy used.
    pub strategy: RectificationStrategy,
    /// The pose of the first camera in the frame of the second.
    pub relative_pose: RelativePose,
    /// The fundamental matrix used by an uncalibrated rectification.
    pub fundamental: Option<Mat33>,
    /// The rectifying transforms.
    pub rectification: RectificationResult,
    /// The disparity range measured on the correspondences, if any were given.
    pub search_range: Option<DisparityRange>,
    /// The window given to the matcher.
    pub window: SearchWindow,
    /// The first image in the rectified frame.
    pub rectified_left: Image<u8, 3>,
    /// The second image in the rectified frame.
    pub rectified_right: Image<u8, 3>,
    /// The raw matcher output.
    pub raw_disparity: FixedPointDisparity,
    /// The disparity in pixels, in the rectified frame of the first image.
    pub disparity: DisparityMap,
    /// The disparity mapped back onto the first source image.
    pub unwarped: Option<DisparityMap>,
    /// Quality problems found along the way.
    pub warnings: Vec<QualityWarning>,
}

/// Rectification and dense matching of a posed frame pair.
///
/// A pipeline holds only its configuration, so one instance can serve any number of runs,
/// from several threads.
#[derive(Clone, Debug)]
pub struct StereoPipeline {
    config: PipelineConfig,
    matcher: SemiGlobalMatcher,
}

impl StereoPipeline {
    /// Create a pipeline, checking the matcher parameters.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let matcher = SemiGlobalMatcher::new(config.sgbm)?;
        Ok(Self { config, matcher })
    }

    /// The configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one frame pair.
    ///
    /// # Arguments
    ///
    /// * `calibration` - The camera of both frames.
    /// * `frame1` - The first (left) frame.
    /// * `frame2` - The second (right) frame.
    /// * `matches` - Optional correspondences, `left` in the first frame. Required by the
    ///   uncalibrated strategy; with the calibrated strategy they bound the disparity search.
    ///
    /// # Errors
    ///
    /// The first failing stage aborts the run, and the error records the stage.
    pub fn run(
        &self,
        calibration: &Calibration,
        frame1: &Frame,
        frame2: &Frame,
        matches: Option<&[FeatureMatch]>,
    ) -> Result<PipelineOutput, PipelineError> {
        let mut warnings = Vec::new();

        run_stage(PipelineStage::LoadInputs, || {
            check_frame(calibration, frame1)?;
            check_frame(calibration, frame2)
        })?;

        let relative = run_stage(PipelineStage::ComputeRelativePose, || {
            let relative = relative_pose(&frame1.pose, &frame2.pose, self.config.pose_convention);
            log::debug!(
                "relative pose: baseline {:.4}, translation {:?}",
                relative.baseline(),
                relative.translation
            );
            Ok(relative)
        })?;

        let (rectification, fundamental, search_range, window) =
            run_stage(PipelineStage::Rectify, || {
                let (rectification, fundamental) =
                    self.rectify(calibration, &relative, matches, &mut warnings)?;
                let (search_range, window) = self.search_window(&rectification, matches)?;
                Ok((rectification, fundamental, search_range, window))
            })?;

        let (rectified_left, rectified_right) = run_stage(PipelineStage::Warp, || {
            let size = rectification.size;
            let left = rectification.left.warp_image(&frame1.image, size)?;
            let right = rectification.right.warp_image(&frame2.image, size)?;
            Ok((left, right))
        })?;

        let raw_disparity = run_stage(PipelineStage::Match, || {
            let size = rectification.size;
            let mut gray_left = Image::from_size_val(size, 0u8)?;
            let mut gray_right = Image::from_size_val(size, 0u8)?;
            gray_from_rgb_u8(&rectified_left, &mut gray_left)?;
            gray_from_rgb_u8(&rectified_right, &mut gray_right)?;
            Ok(self.matcher.compute(&gray_left, &gray_right, &window)?)
        })?;

        let (disparity, unwarped) = run_stage(PipelineStage::PostProcess, || {
            let disparity = decode_fixed_point(&raw_disparity, &window)?;
            if disparity.valid_count() == 0 {
                log::warn!(
                    "frames {} and {}: the matcher found no disparity",
                    frame1.id,
                    frame2.id
                );
                warnings.push(QualityWarning::MatcherProducesNoData);
            }

            let unwarped = if self.config.unwarp {
                Some(unwarp_disparity(
                    &disparity,
                    &rectification.left,
                    calibration.image_size(),
                )?)
            } else {
                None
            };
            Ok((disparity, unwarped))
        })?;

        log::info!(
            "{}: frames {} and {}, {} of {} pixels matched",
            PipelineStage::Done,
            frame1.id,
            frame2.id,
            disparity.valid_count(),
            disparity.size().area()
        );

        Ok(PipelineOutput {
            index_1: frame1.id,
            index_2: frame2.id,
            strategy: self.config.strategy,
            relative_pose: relative,
            fundamental,
            rectification,
            search_range,
            window,
            rectified_left,
            rectified_right,
            raw_disparity,
            disparity,
            unwarped,
            warnings,
        })
    }

    fn rectify(
        &self,
        calibration: &Calibration,
        relative: &RelativePose,
        matches: Option<&[FeatureMatch]>,
        warnings: &mut Vec<QualityWarning>,
    ) -> Result<(RectificationResult, Option<Mat33>), PipelineError> {
        let size = calibration.image_size();
        match self.config.strategy {
            RectificationStrategy::Calibrated => {
                let camera = calibration.camera_model();
                let rectification =
                    stereo_rectify(&camera, &camera, size, relative, &self.config.rectify)?;
                log::debug!(
                    "calibrated rectification: valid regions {:?} and {:?}",
                    rectification.roi1,
                    rectification.roi2
                );
                Ok((
                    RectificationResult::calibrated(&camera, &camera, rectification)?,
                    None,
                ))
            }
            RectificationStrategy::Uncalibrated => {
                let matches = matches.unwrap_or_default();
                if matches.len() < MIN_INLIERS {
                    return Err(PipelineError::GeometricDegeneracy(format!(
                        "{} correspondences, the uncalibrated rectification needs {MIN_INLIERS}",
                        matches.len()
                    )));
                }

                let f = if self.config.fundamental_from_pose {
                    fundamental_from_pose(calibration.camera(), relative)?
                } else {
                    let (x1, x2) = split_matches(matches);
                    fundamental_8point(&x1, &x2)?
                };
                let (mean, std) = sampson_error_stats(&f, matches);
                log::debug!("sampson error {mean:.3e} +- {std:.3e} px");

                let hartley = hartley_rectify(matches, &f, size, self.config.hartley_threshold)?;
                if hartley.residual_y_rms > RESIDUAL_WARNING_PX {
                    warnings.push(QualityWarning::RectificationResidual(
                        hartley.residual_y_rms,
                    ));
                }
                Ok((RectificationResult::uncalibrated(&hartley, size), Some(f)))
            }
        }
    }

    fn search_window(
        &self,
        rectification: &RectificationResult,
        matches: Option<&[FeatureMatch]>,
    ) -> Result<(Option<DisparityRange>, SearchWindow), PipelineError> {
        let measured = match matches {
            Some(matches) if !matches.is_empty() => Some(estimate_search_range(
                matches,
                &rectification.left,
                &rectification.right,
            )?),
            _ => None,
        };
        let range = measured.unwrap_or(self.config.disparity_range);
        let window = SearchWindow::from_range(range.min, range.max)?;
        log::info!(
            "disparity range [{:.2}, {:.2}], searching [{}, {}]",
            range.min,
            range.max,
            window.min_disparity,
            window.max_disparity()
        );
        Ok((measured, window))
    }
}

fn run_stage<T>(
    stage: PipelineStage,
    f: impl FnOnce() -> Result<T, PipelineError>,
) -> Result<T, PipelineError> {
    log::info!("{stage}");
    f().map_err(|e| {
        log::debug!("{stage} failed: {e}");
        PipelineError::StageFailed {
            stage,
            source: Box::new(e),
        }
    })
}

fn check_frame(calibration: &Calibration, frame: &Frame) -> Result<(), PipelineError> {
    if frame.image.size() != calibration.image_size() {
        return Err(PipelineError::MalformedData(format!(
            "frame {} is {}, the calibration is for {}",
            frame.id,
            frame.image.size(),
            calibration.image_size()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stereo_image::ImageSize;

    fn calibration(size: ImageSize) -> Result<Calibration, PipelineError> {
        Calibration::new(
            [
                [100.0, 0.0, (size.width as f64 - 1.0) / 2.0],
                [0.0, 100.0, (size.height as f64 - 1.0) / 2.0],
                [0.0, 0.0, 1.0],
            ],
            vec![0.0; 4],
            size,
        )
    }

    fn frame(id: usize, size: ImageSize, x: f64) -> Result<Frame, PipelineError> {
        let image = Image::from_fn(size, |r, c| {
            let v = ((r * 37 + c * 91) % 251) as u8;
            [v, v, v]
        })?;
        let pose = [
            [1.0, 0.0, 0.0, x],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        Frame::new(id, image, pose)
    }

    #[test]
    fn frame_size_must_match_calibration() -> Result<(), PipelineError> {
        let size = ImageSize {
            width: 48,
            height: 32,
        };
        let calibration = calibration(size)?;
        let small = ImageSize {
            width: 40,
            height: 32,
        };
        let pipeline = StereoPipeline::new(PipelineConfig::default())?;
        let err = pipeline
            .run(&calibration, &frame(0, size, 0.0)?, &frame(1, small, 1.0)?, None)
            .err();
        assert!(matches!(
            err.as_ref().map(|e| (e.stage(), e.root())),
            Some((Some(PipelineStage::LoadInputs), PipelineError::MalformedData(_)))
        ));
        Ok(())
    }

    #[test]
    fn zero_baseline_is_degenerate() -> Result<(), PipelineError> {
        let size = ImageSize {
            width: 48,
            height: 32,
        };
        let calibration = calibration(size)?;
        let pipeline = StereoPipeline::new(PipelineConfig::default())?;
        let err = pipeline
            .run(&calibration, &frame(0, size, 0.0)?, &frame(1, size, 0.0)?, None)
            .err();
        assert!(err
            .as_ref()
            .is_some_and(|e| e.is_degenerate() && e.stage() == Some(PipelineStage::Rectify)));
        Ok(())
    }

    #[test]
    fn uncalibrated_needs_matches() -> Result<(), PipelineError> {
        let size = ImageSize {
            width: 48,
            height: 32,
        };
        let calibration = calibration(size)?;
        let config = PipelineConfig {
            strategy: RectificationStrategy::Uncalibrated,
            ..Default::default()
        };
        let pipeline = StereoPipeline::new(config)?;
        let matches = [FeatureMatch::new([1.0, 1.0], [0.0, 1.0]); 3];
        let err = pipeline
            .run(
                &calibration,
                &frame(0, size, 0.0)?,
                &frame(1, size, 1.0)?,
                Some(&matches),
            )
            .err();
        assert!(err.as_ref().is_some_and(PipelineError::is_degenerate));
        Ok(())
    }

    #[test]
    fn window_wider_than_image_gives_no_data() -> Result<(), PipelineError> {
        let size = ImageSize {
            width: 48,
            height: 32,
        };
        let calibration = calibration(size)?;
        let config = PipelineConfig {
            disparity_range: DisparityRange {
                min: 0.0,
                max: 60.0,
            },
            unwarp: true,
            ..Default::default()
        };
        let pipeline = StereoPipeline::new(config)?;
        let out = pipeline.run(
            &calibration,
            &frame(3, size, 0.0)?,
            &frame(4, size, 1.0)?,
            None,
        )?;

        assert_eq!(out.window, SearchWindow::new(0, 64)?);
        assert_eq!(out.disparity.valid_count(), 0);
        assert_eq!(out.warnings, vec![QualityWarning::MatcherProducesNoData]);
        assert!(out
            .unwarped
            .as_ref()
            .is_some_and(|m| m.valid_count() == 0 && m.size() == size));
        assert_eq!((out.index_1, out.index_2), (3, 4));
        Ok(())
    }

    #[test]
    fn stage_names() {
        assert_eq!(PipelineStage::ComputeRelativePose.to_string(), "ComputeRelativePose");
        assert_eq!(PipelineStage::Done.to_string(), "Done");
    }
}
