use std::path::{Path, PathBuf};

/// Extensions tried, in order, when looking up an indexed colour frame.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// File name of an indexed item: `<prefix>_<NNNN>.<ext>`.
///
/// # Example
///
/// ```
/// use stereo_io::naming::indexed_file_name;
///
/// assert_eq!(indexed_file_name("pose", 7, "json"), "pose_0007.json");
/// assert_eq!(indexed_file_name("image", 12345, "png"), "image_12345.png");
/// ```
pub fn indexed_file_name(prefix: &str, index: usize, ext: &str) -> String {
    format!("{prefix}_{index:04}.{ext}")
}

/// Path of an indexed item inside a folder.
pub fn indexed_path(folder: impl AsRef<Path>, prefix: &str, index: usize, ext: &str) -> PathBuf {
    folder.as_ref().join(indexed_file_name(prefix, index, ext))
}

/// Path of the correspondence file between two frames: `matches_<NNNN>_<MMMM>.json`.
pub fn matches_path(folder: impl AsRef<Path>, index_1: usize, index_2: usize) -> PathBuf {
    folder
        .as_ref()
        .join(format!("matches_{index_1:04}_{index_2:04}.json"))
}

/// Path of the pose file of a frame: `pose_<NNNN>.json`.
pub fn pose_path(folder: impl AsRef<Path>, index: usize) -> PathBuf {
    indexed_path(folder, "pose", index, "json")
}

/// Path of the calibration file in a folder.
pub fn calibration_path(folder: impl AsRef<Path>) -> PathBuf {
    folder.as_ref().join("calibration.json")
}

/// First existing `image_<NNNN>.<ext>` for the known extensions.
pub fn find_frame_image(folder: impl AsRef<Path>, index: usize) -> Option<PathBuf> {
    IMAGE_EXTENSIONS
        .iter()
        .map(|ext| indexed_path(folder.as_ref(), "image", index, ext))
        .find(|p| p.exists())
}
