use std::path::Path;

use serde::{Deserialize, Serialize};
use stereo_3d::linalg::{Mat33, Mat44};
use stereo_3d::range::DisparityRange;
use stereo_3d::rectify::{RectifyingTransform, Roi};
use stereo_disparity::SearchWindow;
use stereo_io::{naming, png, records, tiff};

use crate::config::RectificationStrategy;
use crate::error::PipelineError;
use crate::pipeline::{PipelineOutput, QualityWarning};

/// One rectifying transform, without its remap tables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformReport {
    /// Rotation and projection of a calibrated camera.
    Remap {
        /// The rectifying rotation.
        rotation: Mat33,
        /// The rectified projection matrix.
        projection: [[f64; 4]; 3],
    },
    /// A homography from source to rectified pixels.
    Homography {
        /// The homography, row-major.
        matrix: Mat33,
    },
}

impl From<&RectifyingTransform> for TransformReport {
    fn from(transform: &RectifyingTransform) -> Self {
        match transform {
            RectifyingTransform::Remap {
                rotation,
                projection,
                ..
            } => TransformReport::Remap {
                rotation: *rotation,
                projection: *projection,
            },
            RectifyingTransform::Homography(h) => TransformReport::Homography { matrix: *h },
        }
    }
}

/// The `rectification_<NNNN>.json` written next to the images of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RectificationReport {
    /// Id of the first frame.
    pub index_1: usize,
    /// Id of the second frame.
    pub index_2: usize,
    /// The strategy used.
    pub strategy: RectificationStrategy,
    /// Size `[width, height]` of the rectified images.
    pub size: [usize; 2],
    /// Transform of the first image.
    pub left: TransformReport,
    /// Transform of the second image.
    pub right: TransformReport,
    /// Disparity-to-depth matrix of a calibrated pair.
    pub q: Option<Mat44>,
    /// Valid regions of the rectified images of a calibrated pair.
    pub valid_regions: Option<[Roi; 2]>,
    /// Fundamental matrix of an uncalibrated pair.
    pub fundamental: Option<Mat33>,
    /// Range measured on the correspondences.
    pub search_range: Option<DisparityRange>,
    /// Window searched by the matcher.
    pub search_window: SearchWindow,
    /// Number of pixels with a disparity.
    pub valid_pixels: usize,
    /// Quality problems of the run.
    pub warnings: Vec<QualityWarning>,
}

impl From<&PipelineOutput> for RectificationReport {
    fn from(output: &PipelineOutput) -> Self {
        let rectification = &output.rectification;
        Self {
            index_1: output.index_1,
            index_2: output.index_2,
            strategy: output.strategy,
            size: [rectification.size.width, rectification.size.height],
            left: (&rectification.left).into(),
            right: (&rectification.right).into(),
            q: rectification.q,
            valid_regions: rectification.calibrated.as_ref().map(|c| [c.roi1, c.roi2]),
            fundamental: output.fundamental,
            search_range: output.search_range,
            search_window: output.window,
            valid_pixels: output.disparity.valid_count(),
            warnings: output.warnings.clone(),
        }
    }
}

/// Write the results of a run into a folder, named after the first frame.
///
/// Writes `rectified_left_<NNNN>.png`, `rectified_right_<NNNN>.png`, `disparity_<NNNN>.tiff`,
/// the 16-bit preview `disparity_<NNNN>.png`, `rectification_<NNNN>.json` and, when the
/// disparity was mapped back onto the source image, `disparity_unwarped_<NNNN>.tiff`.
pub fn write_outputs(
    folder: impl AsRef<Path>,
    output: &PipelineOutput,
) -> Result<(), PipelineError> {
    let folder = folder.as_ref();
    std::fs::create_dir_all(folder).map_err(stereo_io::IoError::from)?;
    let index = output.index_1;

    png::write_image_png_rgb8(
        naming::indexed_path(folder, "rectified_left", index, "png"),
        &output.rectified_left,
    )?;
    png::write_image_png_rgb8(
        naming::indexed_path(folder, "rectified_right", index, "png"),
        &output.rectified_right,
    )?;

    tiff::write_image_tiff_mono32f(
        naming::indexed_path(folder, "disparity", index, "tiff"),
        &output.disparity.data,
    )?;
    png::write_image_png_gray16(
        naming::indexed_path(folder, "disparity", index, "png"),
        &output.disparity.to_preview(&output.window)?,
    )?;

    if let Some(unwarped) = &output.unwarped {
        tiff::write_image_tiff_mono32f(
            naming::indexed_path(folder, "disparity_unwarped", index, "tiff"),
            &unwarped.data,
        )?;
    }

    records::write_json(
        naming::indexed_path(folder, "rectification", index, "json"),
        &RectificationReport::from(output),
    )?;

    log::debug!("wrote the outputs of frame {index} to {}", folder.display());
    Ok(())
}
