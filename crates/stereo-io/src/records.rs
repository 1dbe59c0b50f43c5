use std::{fs, path::Path};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::IoError;

/// Intrinsics, distortion and image size of a camera as stored on disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    /// The 3x3 camera matrix, row-major.
    pub camera: Vec<f64>,
    /// The distortion coefficients `(k1, k2, p1, p2[, k3[, k4, k5, k6]])`.
    pub distortion: Vec<f64>,
    /// The image size as `[width, height]`.
    pub image_size: [usize; 2],
}

impl CalibrationRecord {
    /// The camera matrix as rows, `None` unless `camera` holds exactly 9 values.
    pub fn camera_matrix(&self) -> Option<[[f64; 3]; 3]> {
        match self.camera.as_slice() {
            &[a, b, c, d, e, f, g, h, i] => Some([[a, b, c], [d, e, f], [g, h, i]]),
            _ => None,
        }
    }

    fn validate(&self, path: &Path) -> Result<(), IoError> {
        if self.camera.len() != 9 {
            return Err(IoError::MalformedRecord(
                path.to_path_buf(),
                format!("camera has {} values, expected 9", self.camera.len()),
            ));
        }
        Ok(())
    }
}

/// A 4x4 rigid transform as stored on disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseRecord {
    /// The transform, row-major.
    pub pose: Vec<f64>,
}

/// Point correspondences between two images as stored on disk.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchesRecord {
    /// One `[x1, y1, x2, y2]` entry per correspondence.
    pub matches: Vec<[f64; 4]>,
}

/// Serialize a value as pretty JSON.
pub fn write_json<T: Serialize>(file_path: impl AsRef<Path>, value: &T) -> Result<(), IoError> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(file_path, json)?;
    Ok(())
}

/// Deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(file_path: impl AsRef<Path>) -> Result<T, IoError> {
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }
    let text = fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&text)?)
}

fn read_json_if_exists<T: DeserializeOwned>(
    file_path: impl AsRef<Path>,
) -> Result<Option<T>, IoError> {
    match read_json(file_path) {
        Ok(value) => Ok(Some(value)),
        Err(IoError::FileDoesNotExist(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Read a calibration file. A missing file is an error.
pub fn read_calibration(file_path: impl AsRef<Path>) -> Result<CalibrationRecord, IoError> {
    let file_path = file_path.as_ref();
    let record: CalibrationRecord = read_json(file_path)?;
    record.validate(file_path)?;
    Ok(record)
}

/// Write a calibration file.
pub fn write_calibration(
    file_path: impl AsRef<Path>,
    record: &CalibrationRecord,
) -> Result<(), IoError> {
    record.validate(file_path.as_ref())?;
    write_json(file_path, record)
}

/// Read a pose file, `None` when the file does not exist.
pub fn read_pose(file_path: impl AsRef<Path>) -> Result<Option<[[f64; 4]; 4]>, IoError> {
    let file_path = file_path.as_ref();
    let Some(record) = read_json_if_exists::<PoseRecord>(file_path)? else {
        return Ok(None);
    };

    if record.pose.len() != 16 {
        return Err(IoError::MalformedRecord(
            file_path.to_path_buf(),
            format!("pose has {} values, expected 16", record.pose.len()),
        ));
    }

    let mut pose = [[0.0; 4]; 4];
    for (i, v) in record.pose.iter().enumerate() {
        pose[i / 4][i % 4] = *v;
    }
    Ok(Some(pose))
}

/// Write a pose file.
pub fn write_pose(file_path: impl AsRef<Path>, pose: &[[f64; 4]; 4]) -> Result<(), IoError> {
    let record = PoseRecord {
        pose: pose.iter().flatten().copied().collect(),
    };
    write_json(file_path, &record)
}

/// Read a correspondence file, `None` when the file does not exist.
pub fn read_matches(file_path: impl AsRef<Path>) -> Result<Option<Vec<[f64; 4]>>, IoError> {
    Ok(read_json_if_exists::<MatchesRecord>(file_path)?.map(|r| r.matches))
}

/// Write a correspondence file.
pub fn write_matches(file_path: impl AsRef<Path>, matches: &[[f64; 4]]) -> Result<(), IoError> {
    let record = MatchesRecord {
        matches: matches.to_vec(),
    };
    write_json(file_path, &record)
}
