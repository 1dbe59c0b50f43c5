use argh::FromArgs;
use std::path::PathBuf;

use stereo::pipeline::{run_batch, BatchOptions, PipelineConfig};

#[derive(FromArgs)]
/// Rectify and match the frame pairs (i, i + step) of a folder
struct Args {
    /// folder with calibration.json and the image_NNNN / pose_NNNN files
    #[argh(option, short = 'i')]
    input: PathBuf,

    /// folder where the results are written
    #[argh(option, short = 'o')]
    output: PathBuf,

    /// index of the first frame of the first pair
    #[argh(option, short = 's', default = "0")]
    start: usize,

    /// number of pairs
    #[argh(option, short = 'n', default = "1")]
    count: usize,

    /// index distance between the two frames of a pair
    #[argh(option, default = "1")]
    step: usize,

    /// number of worker threads
    #[argh(option, short = 'j', default = "1")]
    jobs: usize,

    /// pipeline configuration file (JSON)
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let config = PipelineConfig::from_file_or_default(args.config.as_deref())?;
    let options = BatchOptions {
        start: args.start,
        count: args.count,
        step: args.step,
        jobs: args.jobs,
    };

    let summary = run_batch(&args.input, &args.output, &options, &config)?;

    println!(
        "processed {} pairs, skipped {} with missing frames and {} with degenerate geometry",
        summary.processed.len(),
        summary.missing.len(),
        summary.degenerate.len()
    );

    Ok(())
}
