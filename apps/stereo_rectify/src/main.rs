use argh::FromArgs;
use std::path::PathBuf;

use stereo::io::{naming, records};
use stereo::k3d::correspondence::FeatureMatch;
use stereo::pipeline::{
    output::write_outputs, Calibration, Frame, PipelineConfig, RectificationStrategy,
    StereoPipeline,
};

#[derive(FromArgs)]
/// Rectify a posed frame pair and compute its disparity map
struct Args {
    /// folder with calibration.json and the image_NNNN / pose_NNNN files
    #[argh(option, short = 'i')]
    input: PathBuf,

    /// folder where the results are written
    #[argh(option, short = 'o')]
    output: PathBuf,

    /// index of the first frame
    #[argh(positional)]
    index_1: usize,

    /// index of the second frame
    #[argh(positional)]
    index_2: usize,

    /// pipeline configuration file (JSON)
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// rectify from the correspondences instead of the calibration
    #[argh(switch)]
    uncalibrated: bool,

    /// also map the disparity back onto the first image
    #[argh(switch)]
    unwarp: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let base = PipelineConfig::from_file_or_default(args.config.as_deref())?;
    let config = PipelineConfig {
        strategy: if args.uncalibrated {
            RectificationStrategy::Uncalibrated
        } else {
            base.strategy
        },
        unwarp: args.unwarp || base.unwarp,
        ..base
    };

    let calibration = Calibration::load(&args.input)?;
    let frame1 = Frame::load_required(&args.input, args.index_1)?;
    let frame2 = Frame::load_required(&args.input, args.index_2)?;

    let matches: Option<Vec<FeatureMatch>> =
        records::read_matches(naming::matches_path(&args.input, args.index_1, args.index_2))?
            .map(|rows| rows.into_iter().map(FeatureMatch::from).collect());

    let pipeline = StereoPipeline::new(config)?;
    let output = pipeline.run(&calibration, &frame1, &frame2, matches.as_deref())?;
    write_outputs(&args.output, &output)?;

    for warning in &output.warnings {
        log::warn!("quality warning: {warning:?}");
    }

    println!(
        "frames {} and {}: {} of {} pixels matched, disparities [{}, {}]",
        output.index_1,
        output.index_2,
        output.disparity.valid_count(),
        output.disparity.size().area(),
        output.window.min_disparity,
        output.window.max_disparity()
    );

    Ok(())
}
