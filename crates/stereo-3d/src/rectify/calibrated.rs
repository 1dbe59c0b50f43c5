use serde::{Deserialize, Serialize};
use stereo_image::{Image, ImageError, ImageSize};
use stereo_imgproc::calibration::distortion::generate_correction_map_polynomial;

use crate::camera::CameraModel;
use crate::error::RectifyError;
use crate::linalg::{
    cross_vec3, mul_mat33, mul_mat33_vec3, norm_vec3, rodrigues_from_rotation,
    rotation_from_rodrigues, transpose_mat33, Mat33, Mat44,
};
use crate::pose::RelativePose;

/// Side of the sampling grid used to find the valid rectangles.
const RECT_GRID: usize = 9;

/// Options of the calibrated rectification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StereoRectifyParams {
    /// Give both rectified cameras the same principal point, so points at infinity have zero
    /// disparity.
    pub zero_disparity: bool,
    /// Free scaling in `[0, 1]`: `0` keeps only valid pixels, `1` keeps every source pixel.
    /// `None` keeps the focal length.
    pub alpha: Option<f64>,
    /// Size `[width, height]` of the rectified images, the input size when `None`.
    pub new_size: Option<[usize; 2]>,
}

/// A rectangle of pixels in a rectified image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    /// Left column.
    pub x: i32,
    /// Top row.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl Roi {
    fn intersect(&self, other: &Roi) -> Roi {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = (self.x + self.width).min(other.x + other.width);
        let y1 = (self.y + self.height).min(other.y + other.height);
        if x1 <= x0 || y1 <= y0 {
            return Roi::default();
        }
        Roi {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        }
    }
}

/// Floating point rectangle.
#[derive(Clone, Copy, Debug)]
struct Rect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

/// The rotations and projections bringing a calibrated pair into row (or column) alignment.
#[derive(Clone, Debug, PartialEq)]
pub struct StereoRectification {
    /// Rectifying rotation of the first camera.
    pub r1: Mat33,
    /// Rectifying rotation of the second camera.
    pub r2: Mat33,
    /// 3x4 projection matrix of the first rectified camera.
    pub p1: [[f64; 4]; 3],
    /// 3x4 projection matrix of the second rectified camera.
    pub p2: [[f64; 4]; 3],
    /// Disparity-to-depth reprojection matrix.
    pub q: Mat44,
    /// Valid pixels of the first rectified image.
    pub roi1: Roi,
    /// Valid pixels of the second rectified image.
    pub roi2: Roi,
    /// Size of the rectified images.
    pub size: ImageSize,
    /// Whether the baseline is horizontal (epipolar lines are rows) or vertical.
    pub horizontal: bool,
}

/// The left 3x3 block of a 3x4 projection matrix.
pub fn projection_block(p: &[[f64; 4]; 3]) -> Mat33 {
    [
        [p[0][0], p[0][1], p[0][2]],
        [p[1][0], p[1][1], p[1][2]],
        [p[2][0], p[2][1], p[2][2]],
    ]
}

// Undistorted, rotated and reprojected positions of a 9x9 grid over the source image give the
// largest rectangle inside the valid area and the smallest one containing all of it.
fn valid_rectangles(
    camera: &CameraModel,
    rotation: &Mat33,
    projection: &Mat33,
    size: ImageSize,
) -> (Rect, Rect) {
    let n = RECT_GRID;
    let (mut ix0, mut ix1, mut iy0, mut iy1) = (f64::MIN, f64::MAX, f64::MIN, f64::MAX);
    let (mut ox0, mut ox1, mut oy0, mut oy1) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);

    for y in 0..n {
        for x in 0..n {
            let src = [
                x as f64 * size.width as f64 / (n - 1) as f64,
                y as f64 * size.height as f64 / (n - 1) as f64,
            ];
            let p = camera.rectify_point(rotation, projection, &src);

            ox0 = ox0.min(p[0]);
            ox1 = ox1.max(p[0]);
            oy0 = oy0.min(p[1]);
            oy1 = oy1.max(p[1]);

            if x == 0 {
                ix0 = ix0.max(p[0]);
            }
            if x == n - 1 {
                ix1 = ix1.min(p[0]);
            }
            if y == 0 {
                iy0 = iy0.max(p[1]);
            }
            if y == n - 1 {
                iy1 = iy1.min(p[1]);
            }
        }
    }

    (
        Rect {
            x: ix0,
            y: iy0,
            width: ix1 - ix0,
            height: iy1 - iy0,
        },
        Rect {
            x: ox0,
            y: oy0,
            width: ox1 - ox0,
            height: oy1 - oy0,
        },
    )
}

/// Compute the rectifying rotations and projections of a calibrated stereo pair.
///
/// The construction splits the relative rotation in two halves so that both cameras turn by the
/// same amount, then rotates the common frame so the baseline lies on the image x axis (or the
/// y axis for a mostly vertical baseline). Both cameras share the new focal length; the
/// principal points center the undistorted image corners.
///
/// # Arguments
///
/// * `left` - The first camera.
/// * `right` - The second camera.
/// * `image_size` - The size of the input images.
/// * `pose` - The transform from the first camera frame into the second one.
/// * `params` - The rectification options.
///
/// # Errors
///
/// Fails when the baseline is zero or the scaling of the valid area is degenerate.
pub fn stereo_rectify(
    left: &CameraModel,
    right: &CameraModel,
    image_size: ImageSize,
    pose: &RelativePose,
    params: &StereoRectifyParams,
) -> Result<StereoRectification, RectifyError> {
    let (nx, ny) = (image_size.width as f64, image_size.height as f64);

    if pose.baseline() <= f64::EPSILON {
        return Err(RectifyError::ZeroBaseline);
    }

    // half of the inverse relative rotation
    let om = rodrigues_from_rotation(&pose.rotation).map(|v| v * -0.5);
    let r_r = rotation_from_rodrigues(&om);
    let t = mul_mat33_vec3(&r_r, &pose.translation);

    let idx = if t[0].abs() > t[1].abs() { 0 } else { 1 };
    let c = t[idx];
    let nt = norm_vec3(&t);
    let mut uu = [0.0; 3];
    uu[idx] = if c > 0.0 { 1.0 } else { -1.0 };

    // rotation aligning the baseline with the chosen image axis
    let mut ww = cross_vec3(&t, &uu);
    let nw = norm_vec3(&ww);
    if nw > 0.0 {
        let angle = (c.abs() / nt).clamp(-1.0, 1.0).acos() / nw;
        ww = ww.map(|v| v * angle);
    }
    let w_r = rotation_from_rodrigues(&ww);

    let r1 = mul_mat33(&w_r, &transpose_mat33(&r_r));
    let r2 = mul_mat33(&w_r, &r_r);
    let t_new = mul_mat33_vec3(&r2, &pose.translation);

    // common focal length, shortened for barrel distortion
    let mut fc_new = f64::MAX;
    for camera in [left, right] {
        let k = camera.camera_matrix();
        let dk1 = camera.distortion.k1;
        let mut fc = k[idx ^ 1][idx ^ 1];
        if dk1 < 0.0 {
            fc *= 1.0 + dk1 * (nx * nx + ny * ny) / (4.0 * fc * fc);
        }
        fc_new = fc_new.min(fc);
    }

    // principal points centering the rectified image corners
    let corners = [
        [0.0, 0.0],
        [nx - 1.0, 0.0],
        [0.0, ny - 1.0],
        [nx - 1.0, ny - 1.0],
    ];
    let focal_only = [[fc_new, 0.0, 0.0], [0.0, fc_new, 0.0], [0.0, 0.0, 1.0]];
    let mut cc_new = [[0.0; 2]; 2];
    for (k, (camera, rotation)) in [(left, &r1), (right, &r2)].into_iter().enumerate() {
        let (mut sx, mut sy) = (0.0, 0.0);
        for corner in corners.iter() {
            let p = camera.rectify_point(rotation, &focal_only, corner);
            sx += p[0];
            sy += p[1];
        }
        cc_new[k] = [(nx - 1.0) / 2.0 - sx / 4.0, (ny - 1.0) / 2.0 - sy / 4.0];
    }

    if params.zero_disparity {
        let mean = [
            (cc_new[0][0] + cc_new[1][0]) * 0.5,
            (cc_new[0][1] + cc_new[1][1]) * 0.5,
        ];
        cc_new = [mean, mean];
    } else {
        // the coordinate across the baseline must agree to keep the epipolar lines aligned
        let other = idx ^ 1;
        let mean = (cc_new[0][other] + cc_new[1][other]) * 0.5;
        cc_new[0][other] = mean;
        cc_new[1][other] = mean;
    }

    let projection_of = |cc: &[f64; 2]| [[fc_new, 0.0, cc[0]], [0.0, fc_new, cc[1]], [0.0, 0.0, 1.0]];
    let (inner1, outer1) = valid_rectangles(left, &r1, &projection_of(&cc_new[0]), image_size);
    let (inner2, outer2) = valid_rectangles(right, &r2, &projection_of(&cc_new[1]), image_size);

    let new_size = params
        .new_size
        .map(ImageSize::from)
        .unwrap_or(image_size);
    let (nw_f, nh_f) = (new_size.width as f64, new_size.height as f64);

    let [cx1_0, cy1_0] = cc_new[0];
    let [cx2_0, cy2_0] = cc_new[1];
    let cx1 = nw_f * cx1_0 / nx;
    let cy1 = nh_f * cy1_0 / ny;
    let cx2 = nw_f * cx2_0 / nx;
    let cy2 = nh_f * cy2_0 / ny;

    let mut s = 1.0;
    if let Some(alpha) = params.alpha.map(|a| a.min(1.0)).filter(|a| *a >= 0.0) {
        let ratios = |r: &Rect, cx: f64, cy: f64, cx0: f64, cy0: f64| {
            [
                cx / (cx0 - r.x),
                cy / (cy0 - r.y),
                (nw_f - 1.0 - cx) / (r.x + r.width - cx0),
                (nh_f - 1.0 - cy) / (r.y + r.height - cy0),
            ]
        };
        let s0 = ratios(&inner1, cx1, cy1, cx1_0, cy1_0)
            .into_iter()
            .chain(ratios(&inner2, cx2, cy2, cx2_0, cy2_0))
            .fold(f64::MIN, f64::max);
        let s1 = ratios(&outer1, cx1, cy1, cx1_0, cy1_0)
            .into_iter()
            .chain(ratios(&outer2, cx2, cy2, cx2_0, cy2_0))
            .fold(f64::MAX, f64::min);
        s = s0 * (1.0 - alpha) + s1 * alpha;
        if !s.is_finite() || s <= 0.0 {
            return Err(RectifyError::IllConditioned(format!(
                "invalid rectified image scale {s}"
            )));
        }
        log::debug!("rectification scale s0={s0:.4} s1={s1:.4} alpha={alpha} -> {s:.4}");
    }

    fc_new *= s;

    let p1 = [
        [fc_new, 0.0, cx1, 0.0],
        [0.0, fc_new, cy1, 0.0],
        [0.0, 0.0, 1.0, 0.0],
    ];
    let mut p2 = [
        [fc_new, 0.0, cx2, 0.0],
        [0.0, fc_new, cy2, 0.0],
        [0.0, 0.0, 1.0, 0.0],
    ];
    p2[idx][3] = t_new[idx] * fc_new;

    let image_rect = Roi {
        x: 0,
        y: 0,
        width: new_size.width as i32,
        height: new_size.height as i32,
    };
    let roi = |inner: &Rect, cx0: f64, cy0: f64, cx: f64, cy: f64| {
        Roi {
            x: ((inner.x - cx0) * s + cx).ceil() as i32,
            y: ((inner.y - cy0) * s + cy).ceil() as i32,
            width: (inner.width * s).floor() as i32,
            height: (inner.height * s).floor() as i32,
        }
        .intersect(&image_rect)
    };
    let roi1 = roi(&inner1, cx1_0, cy1_0, cx1, cy1);
    let roi2 = roi(&inner2, cx2_0, cy2_0, cx2, cy2);

    let shift = if idx == 0 { cx1 - cx2 } else { cy1 - cy2 };
    let q = [
        [1.0, 0.0, 0.0, -cx1],
        [0.0, 1.0, 0.0, -cy1],
        [0.0, 0.0, 0.0, fc_new],
        [0.0, 0.0, -1.0 / t_new[idx], shift / t_new[idx]],
    ];

    log::debug!(
        "rectified f={fc_new:.3} c1=({cx1:.2}, {cy1:.2}) c2=({cx2:.2}, {cy2:.2}) baseline={:.4}",
        t_new[idx]
    );

    Ok(StereoRectification {
        r1,
        r2,
        p1,
        p2,
        q,
        roi1,
        roi2,
        size: new_size,
        horizontal: idx == 0,
    })
}

/// Compute the undistort and rectify maps of one camera of a rectified pair.
pub fn init_rectify_map(
    camera: &CameraModel,
    rotation: &Mat33,
    projection: &[[f64; 4]; 3],
    size: ImageSize,
) -> Result<(Image<f32, 1>, Image<f32, 1>), ImageError> {
    generate_correction_map_polynomial(
        &camera.intrinsic,
        rotation,
        &projection_block(projection),
        &camera.distortion,
        &size,
    )
}
