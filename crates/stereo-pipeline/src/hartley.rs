use stereo_3d::correspondence::{split_matches, FeatureMatch};
use stereo_3d::fundamental::{fundamental_8point, sampson_error_stats};
use stereo_3d::linalg::Mat33;
use stereo_3d::range::{estimate_search_range, DisparityRange};
use stereo_3d::rectify::{hartley_rectify, RectificationResult, MIN_INLIERS};
use stereo_disparity::unwarp::unwarp_disparity;
use stereo_disparity::{
    decode_fixed_point, DisparityMap, SearchWindow, SemiGlobalMatcher, SgbmParams, StereoMatcher,
};
use stereo_image::{Image, ImageSize};
use stereo_imgproc::color::gray_from_rgb_u8;
use stereo_imgproc::interpolation::InterpolationMode;
use stereo_imgproc::resize::{fit_size, resize_native};

use crate::error::PipelineError;
use crate::pipeline::QualityWarning;

/// Options of the image pair rectification.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HartleyOptions {
    /// Longest image side after downsizing; `0` keeps the input size.
    pub max_dimension: usize,
    /// Maximum distance in pixels of a correspondence to its epipolar line.
    pub threshold: f64,
    /// Parameters of the dense matcher.
    pub sgbm: SgbmParams,
}

impl Default for HartleyOptions {
    fn default() -> Self {
        Self {
            max_dimension: 1000,
            threshold: 1.0,
            sgbm: SgbmParams::default(),
        }
    }
}

/// The results of [`rectify_image_pair`], all at the working size.
#[derive(Clone, Debug)]
pub struct HartleyOutput {
    /// The size the images were processed at.
    pub size: ImageSize,
    /// The factor applied to the input images and correspondences.
    pub scale: f64,
    /// The fundamental matrix estimated from the correspondences.
    pub fundamental: Mat33,
    /// The rectifying homographies.
    pub rectification: RectificationResult,
    /// The disparity range measured on the correspondences.
    pub search_range: DisparityRange,
    /// The window given to the matcher.
    pub window: SearchWindow,
    /// The first image in the rectified frame.
    pub rectified_left: Image<u8, 3>,
    /// The second image in the rectified frame.
    pub rectified_right: Image<u8, 3>,
    /// The disparity in the rectified frame of the first image.
    pub disparity: DisparityMap,
    /// The disparity registered to the first (downsized) input image.
    pub unwarped: DisparityMap,
    /// Quality problems found along the way.
    pub warnings: Vec<QualityWarning>,
}

fn resize_rgb(image: &Image<u8, 3>, size: ImageSize) -> Result<Image<u8, 3>, PipelineError> {
    if image.size() == size {
        return Ok(image.clone());
    }
    let mut resized = Image::from_size_val(size, 0u8)?;
    resize_native(image, &mut resized, InterpolationMode::Bilinear)?;
    Ok(resized)
}

fn gray(image: &Image<u8, 3>) -> Result<Image<u8, 1>, PipelineError> {
    let mut dst = Image::from_size_val(image.size(), 0u8)?;
    gray_from_rgb_u8(image, &mut dst)?;
    Ok(dst)
}

/// Rectify two images without calibration and compute their disparity.
///
/// Both images are downsized so that their longest side is at most `max_dimension`, with the
/// correspondences scaled alike. The fundamental matrix comes from the correspondences, and the
/// disparity is also mapped back onto the first image with nearest neighbour sampling.
///
/// # Arguments
///
/// * `left` - The first image.
/// * `right` - The second image, of the same size.
/// * `matches` - At least 8 correspondences in input pixel coordinates.
/// * `options` - Working size, epipolar threshold and matcher parameters.
pub fn rectify_image_pair(
    left: &Image<u8, 3>,
    right: &Image<u8, 3>,
    matches: &[FeatureMatch],
    options: &HartleyOptions,
) -> Result<HartleyOutput, PipelineError> {
    if left.size() != right.size() {
        return Err(PipelineError::MalformedData(format!(
            "image sizes differ: {} and {}",
            left.size(),
            right.size()
        )));
    }
    if matches.len() < MIN_INLIERS {
        return Err(PipelineError::GeometricDegeneracy(format!(
            "{} correspondences, the rectification needs {MIN_INLIERS}",
            matches.len()
        )));
    }

    let (size, scale) = fit_size(left.size(), options.max_dimension);
    let left = resize_rgb(left, size)?;
    let right = resize_rgb(right, size)?;
    log::info!("working at {size} (scale {scale:.4})");

    let matches: Vec<FeatureMatch> = matches.iter().map(|m| m.scaled(scale)).collect();
    let (x1, x2) = split_matches(&matches);
    let f = fundamental_8point(&x1, &x2)?;
    let (mean, std) = sampson_error_stats(&f, &matches);
    log::info!(
        "{} correspondences, sampson error {mean:.4} +- {std:.4}",
        matches.len()
    );

    let mut warnings = Vec::new();
    let hartley = hartley_rectify(&matches, &f, size, options.threshold)?;
    if hartley.residual_y_rms > 1.0 {
        warnings.push(QualityWarning::RectificationResidual(hartley.residual_y_rms));
    }
    let rectification = RectificationResult::uncalibrated(&hartley, size);

    let search_range = estimate_search_range(&matches, &rectification.left, &rectification.right)?;
    let window = SearchWindow::from_range(search_range.min, search_range.max)?;
    log::info!(
        "disparity range [{:.2}, {:.2}], searching [{}, {}]",
        search_range.min,
        search_range.max,
        window.min_disparity,
        window.max_disparity()
    );

    let rectified_left = rectification.left.warp_image(&left, size)?;
    let rectified_right = rectification.right.warp_image(&right, size)?;

    let matcher = SemiGlobalMatcher::new(options.sgbm)?;
    let raw = matcher.compute(&gray(&rectified_left)?, &gray(&rectified_right)?, &window)?;
    let disparity = decode_fixed_point(&raw, &window)?;
    if disparity.valid_count() == 0 {
        log::warn!("the matcher found no disparity");
        warnings.push(QualityWarning::MatcherProducesNoData);
    }
    let unwarped = unwarp_disparity(&disparity, &rectification.left, size)?;

    Ok(HartleyOutput {
        size,
        scale,
        fundamental: f,
        rectification,
        search_range,
        window,
        rectified_left,
        rectified_right,
        disparity,
        unwarped,
        warnings,
    })
}
