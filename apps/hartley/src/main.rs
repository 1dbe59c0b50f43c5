use argh::FromArgs;
use std::path::{Path, PathBuf};

use stereo::io::{functional as F, png, records, tiff};
use stereo::k3d::correspondence::FeatureMatch;
use stereo::pipeline::{rectify_image_pair, HartleyOptions};

#[derive(FromArgs)]
/// Rectify two uncalibrated images from their correspondences and compute the disparity
struct Args {
    /// path to the left image
    #[argh(positional)]
    left: PathBuf,

    /// path to the right image
    #[argh(positional)]
    right: PathBuf,

    /// correspondence file: { "matches": [[x1, y1, x2, y2], ...] }
    #[argh(option, short = 'm')]
    matches: PathBuf,

    /// folder where the results are written
    #[argh(option, short = 'o', default = "PathBuf::from(\".\")")]
    output: PathBuf,

    /// prefix of the output files, the left image name by default
    #[argh(option, short = 'n')]
    name: Option<String>,

    /// longest image side after downsizing
    #[argh(option, default = "1000")]
    max_dimension: usize,

    /// maximum distance in pixels of a correspondence to its epipolar line
    #[argh(option, default = "1.0")]
    threshold: f64,

    /// write the disparity in the rectified frame instead of the left image frame
    #[argh(switch)]
    rectified: bool,
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "hartley".to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();
    let name = args.name.clone().unwrap_or_else(|| file_stem(&args.left));

    let left = F::read_image_any_rgb8(&args.left)?;
    let right = F::read_image_any_rgb8(&args.right)?;

    let matches: Vec<FeatureMatch> = records::read_matches(&args.matches)?
        .ok_or_else(|| format!("no correspondence file at {}", args.matches.display()))?
        .into_iter()
        .map(FeatureMatch::from)
        .collect();

    let options = HartleyOptions {
        max_dimension: args.max_dimension,
        threshold: args.threshold,
        ..Default::default()
    };
    let out = rectify_image_pair(&left, &right, &matches, &options)?;
    for warning in &out.warnings {
        log::warn!("quality warning: {warning:?}");
    }

    std::fs::create_dir_all(&args.output)?;
    png::write_image_png_rgb8(
        args.output.join(format!("{name}_LEFT_rectified.png")),
        &out.rectified_left,
    )?;
    png::write_image_png_rgb8(
        args.output.join(format!("{name}_RIGHT_rectified.png")),
        &out.rectified_right,
    )?;

    let disparity = if args.rectified {
        &out.disparity
    } else {
        &out.unwarped
    };
    tiff::write_image_tiff_mono32f(
        args.output.join(format!("{name}_disparity.tiff")),
        &disparity.data,
    )?;

    println!(
        "{name}: {} of {} pixels matched",
        out.disparity.valid_count(),
        out.size.area()
    );

    Ok(())
}
