use std::path::Path;

use stereo_3d::pose::{is_homogeneous, Pose};
use stereo_image::Image;
use stereo_io::{functional::read_image_rgb8_if_exists, naming, records};

use crate::error::PipelineError;

/// A colour image with the pose of the camera that took it.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Index of the frame in its folder.
    pub id: usize,
    /// The colour image.
    pub image: Image<u8, 3>,
    /// The 4x4 rigid pose of the camera.
    pub pose: Pose,
}

impl Frame {
    /// Create a frame, checking that the pose is a homogeneous transform.
    pub fn new(id: usize, image: Image<u8, 3>, pose: Pose) -> Result<Self, PipelineError> {
        if !is_homogeneous(&pose) {
            return Err(PipelineError::MalformedData(format!(
                "pose of frame {id} has bottom row {:?}",
                pose[3]
            )));
        }
        Ok(Self { id, image, pose })
    }

    /// Load `image_<NNNN>.{jpg,jpeg,png}` and `pose_<NNNN>.json` from a folder.
    ///
    /// Returns `None` when either file is missing; files that exist but cannot be read are
    /// errors.
    pub fn load(folder: impl AsRef<Path>, id: usize) -> Result<Option<Self>, PipelineError> {
        let folder = folder.as_ref();

        let Some(image_path) = naming::find_frame_image(folder, id) else {
            log::debug!("frame {id}: no image in {}", folder.display());
            return Ok(None);
        };
        let Some(pose) = records::read_pose(naming::pose_path(folder, id))? else {
            log::debug!("frame {id}: no pose in {}", folder.display());
            return Ok(None);
        };
        let Some(image) = read_image_rgb8_if_exists(image_path)? else {
            return Ok(None);
        };

        Ok(Some(Self::new(id, image, pose)?))
    }

    /// Load a frame that must exist.
    pub fn load_required(folder: impl AsRef<Path>, id: usize) -> Result<Self, PipelineError> {
        let folder = folder.as_ref();
        Self::load(folder, id)?.ok_or_else(|| {
            let missing = match naming::find_frame_image(folder, id) {
                Some(_) => naming::pose_path(folder, id),
                None => naming::indexed_path(folder, "image", id, "jpg"),
            };
            PipelineError::InputNotFound(missing)
        })
    }
}
