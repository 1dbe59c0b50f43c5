//! Rigid camera poses and the relative pose between two frames.

use serde::{Deserialize, Serialize};

use crate::linalg::{inverse_rigid_mat44, mul_mat44, split_mat44, Mat33, Mat44};

/// A 4x4 rigid transform `[R t; 0 0 0 1]`, row-major.
pub type Pose = Mat44;

/// How the pose matrices of the frames are to be read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseConvention {
    /// The pose maps camera coordinates into the world frame.
    #[default]
    CameraToWorld,
    /// The pose maps world coordinates into the camera frame (extrinsics).
    WorldToCamera,
}

/// The transform taking camera-1 coordinates into camera-2 coordinates: `X2 = R * X1 + t`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelativePose {
    /// The rotation block.
    pub rotation: Mat33,
    /// The translation column.
    pub translation: [f64; 3],
}

impl RelativePose {
    /// Baseline length, the norm of the translation.
    pub fn baseline(&self) -> f64 {
        crate::linalg::norm_vec3(&self.translation)
    }
}

/// Check that the bottom row of a pose is `[0, 0, 0, 1]`.
pub fn is_homogeneous(pose: &Pose) -> bool {
    pose[3] == [0.0, 0.0, 0.0, 1.0]
}

/// Compute the pose of frame 1 as seen from frame 2.
///
/// With [`PoseConvention::CameraToWorld`] this is `pose2^-1 * pose1`; with
/// [`PoseConvention::WorldToCamera`] it is `pose2 * pose1^-1`. Both give the transform from the
/// camera-1 frame into the camera-2 frame.
///
/// # Example
///
/// ```
/// use stereo_3d::pose::{relative_pose, PoseConvention};
///
/// let pose1 = [
///     [1.0, 0.0, 0.0, 0.0],
///     [0.0, 1.0, 0.0, 0.0],
///     [0.0, 0.0, 1.0, 0.0],
///     [0.0, 0.0, 0.0, 1.0],
/// ];
/// let mut pose2 = pose1;
/// pose2[0][3] = 100.0;
///
/// let rel = relative_pose(&pose1, &pose2, PoseConvention::CameraToWorld);
/// assert_eq!(rel.translation, [-100.0, 0.0, 0.0]);
/// ```
pub fn relative_pose(pose1: &Pose, pose2: &Pose, convention: PoseConvention) -> RelativePose {
    let m = match convention {
        PoseConvention::CameraToWorld => mul_mat44(&inverse_rigid_mat44(pose2), pose1),
        PoseConvention::WorldToCamera => mul_mat44(pose2, &inverse_rigid_mat44(pose1)),
    };
    let (rotation, translation) = split_mat44(&m);
    RelativePose {
        rotation,
        translation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{det_mat33, rotation_from_rodrigues};

    fn pose_from(r: &Mat33, t: [f64; 3]) -> Pose {
        [
            [r[0][0], r[0][1], r[0][2], t[0]],
            [r[1][0], r[1][1], r[1][2], t[1]],
            [r[2][0], r[2][1], r[2][2], t[2]],
            [0.0, 0.0, 0.0, 1.0],
        ]
    }

    #[test]
    fn relative_pose_with_itself_is_identity() {
        let pose = pose_from(&rotation_from_rodrigues(&[0.2, -0.5, 0.9]), [3.0, -1.0, 7.5]);
        for convention in [PoseConvention::CameraToWorld, PoseConvention::WorldToCamera] {
            let rel = relative_pose(&pose, &pose, convention);
            for i in 0..3 {
                for j in 0..3 {
                    let expected = if i == j { 1.0 } else { 0.0 };
                    approx::assert_abs_diff_eq!(rel.rotation[i][j], expected, epsilon = 1e-12);
                }
                approx::assert_abs_diff_eq!(rel.translation[i], 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn relative_pose_maps_camera1_into_camera2() {
        let pose1 = pose_from(&rotation_from_rodrigues(&[0.1, 0.2, -0.3]), [1.0, 2.0, 3.0]);
        let pose2 = pose_from(&rotation_from_rodrigues(&[-0.2, 0.4, 0.1]), [4.0, -2.0, 0.5]);
        let rel = relative_pose(&pose1, &pose2, PoseConvention::CameraToWorld);
        assert!((det_mat33(&rel.rotation) - 1.0).abs() < 1e-12);

        // a point in camera 1, through the world, into camera 2
        let x1 = [0.3, -0.7, 5.0, 1.0];
        let world: Vec<f64> = (0..4)
            .map(|i| (0..4).map(|k| pose1[i][k] * x1[k]).sum())
            .collect();
        let inv2 = inverse_rigid_mat44(&pose2);
        let x2: Vec<f64> = (0..3)
            .map(|i| (0..4).map(|k| inv2[i][k] * world[k]).sum())
            .collect();

        for i in 0..3 {
            let expected: f64 = (0..3).map(|k| rel.rotation[i][k] * x1[k]).sum::<f64>()
                + rel.translation[i];
            approx::assert_abs_diff_eq!(x2[i], expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn world_to_camera_convention() {
        // extrinsics of a camera placed at +100 along x
        let identity = pose_from(&crate::linalg::IDENTITY33, [0.0; 3]);
        let extrinsic2 = pose_from(&crate::linalg::IDENTITY33, [-100.0, 0.0, 0.0]);
        let rel = relative_pose(&identity, &extrinsic2, PoseConvention::WorldToCamera);
        assert_eq!(rel.translation, [-100.0, 0.0, 0.0]);
        approx::assert_relative_eq!(rel.baseline(), 100.0);
    }

    #[test]
    fn bottom_row_check() {
        let mut pose = pose_from(&crate::linalg::IDENTITY33, [0.0; 3]);
        assert!(is_homogeneous(&pose));
        pose[3][0] = 0.5;
        assert!(!is_homogeneous(&pose));
    }
}
