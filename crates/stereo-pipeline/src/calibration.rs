use std::path::Path;

use stereo_3d::camera::CameraModel;
use stereo_3d::linalg::Mat33;
use stereo_image::ImageSize;
use stereo_imgproc::calibration::distortion::PolynomialDistortion;
use stereo_io::records::{self, CalibrationRecord};

use crate::error::PipelineError;

/// Intrinsics, lens distortion and image size of the camera that took both frames.
#[derive(Clone, Debug, PartialEq)]
pub struct Calibration {
    camera: Mat33,
    distortion: Vec<f64>,
    image_size: ImageSize,
}

impl Calibration {
    /// Create a calibration, checking the camera matrix, the coefficients and the image size.
    ///
    /// # Arguments
    ///
    /// * `camera` - The 3x3 camera matrix; `camera[2][2]` must be 1 and both focal lengths
    ///   positive.
    /// * `distortion` - Between 1 and 8 coefficients `(k1, k2, p1, p2, k3, k4, k5, k6)`. Images
    ///   that are already undistorted state all zeros.
    /// * `image_size` - The size of the images, both sides positive.
    pub fn new(
        camera: Mat33,
        distortion: Vec<f64>,
        image_size: ImageSize,
    ) -> Result<Self, PipelineError> {
        if camera[2][2] != 1.0 {
            return Err(PipelineError::MalformedData(format!(
                "camera[2][2] is {}, expected 1",
                camera[2][2]
            )));
        }
        if !(camera[0][0] > 0.0 && camera[1][1] > 0.0) {
            return Err(PipelineError::MalformedData(format!(
                "focal lengths must be positive, got fx={} fy={}",
                camera[0][0], camera[1][1]
            )));
        }
        if image_size.width == 0 || image_size.height == 0 {
            return Err(PipelineError::MalformedData(format!(
                "image size must be positive, got {image_size}"
            )));
        }
        if distortion.is_empty() || distortion.len() > 8 {
            return Err(PipelineError::MalformedData(format!(
                "expected 1 to 8 distortion coefficients, got {}",
                distortion.len()
            )));
        }
        Ok(Self {
            camera,
            distortion,
            image_size,
        })
    }

    /// Load `calibration.json` from a folder.
    pub fn load(folder: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let record = records::read_calibration(stereo_io::naming::calibration_path(folder))?;
        Self::from_record(&record)
    }

    /// Save as `calibration.json` in a folder.
    pub fn save(&self, folder: impl AsRef<Path>) -> Result<(), PipelineError> {
        records::write_calibration(
            stereo_io::naming::calibration_path(folder),
            &self.to_record(),
        )?;
        Ok(())
    }

    /// Build from the on-disk record.
    pub fn from_record(record: &CalibrationRecord) -> Result<Self, PipelineError> {
        let camera = record.camera_matrix().ok_or_else(|| {
            PipelineError::MalformedData(format!(
                "camera has {} values, expected 9",
                record.camera.len()
            ))
        })?;
        Self::new(
            camera,
            record.distortion.clone(),
            record.image_size.into(),
        )
    }

    /// The on-disk record.
    pub fn to_record(&self) -> CalibrationRecord {
        CalibrationRecord {
            camera: self.camera.iter().flatten().copied().collect(),
            distortion: self.distortion.clone(),
            image_size: [self.image_size.width, self.image_size.height],
        }
    }

    /// The camera matrix.
    pub fn camera(&self) -> &Mat33 {
        &self.camera
    }

    /// The distortion coefficients.
    pub fn distortion(&self) -> &[f64] {
        &self.distortion
    }

    /// The image size.
    pub fn image_size(&self) -> ImageSize {
        self.image_size
    }

    /// The camera model used by the rectification.
    pub fn camera_model(&self) -> CameraModel {
        // length was checked on construction
        let distortion =
            PolynomialDistortion::from_coefficients(&self.distortion).unwrap_or_default();
        CameraModel::new(&self.camera, distortion)
    }

    /// A copy for images resized by `scale`, with the focal lengths and principal point scaled.
    pub fn scaled(&self, scale: f64, image_size: ImageSize) -> Result<Self, PipelineError> {
        let mut camera = self.camera;
        for row in camera.iter_mut().take(2) {
            for v in row.iter_mut() {
                *v *= scale;
            }
        }
        Self::new(camera, self.distortion.clone(), image_size)
    }
}
