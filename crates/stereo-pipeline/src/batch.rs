use std::path::Path;

use rayon::prelude::*;
use stereo_3d::correspondence::FeatureMatch;
use stereo_io::{naming, records};

use crate::calibration::Calibration;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::frame::Frame;
use crate::output::write_outputs;
use crate::pipeline::StereoPipeline;

/// The frame pairs of a batch: `(i, i + step)` for `i` in `start .. start + count`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchOptions {
    /// First index of the first frame.
    pub start: usize,
    /// Number of pairs.
    pub count: usize,
    /// Index distance between the two frames of a pair.
    pub step: usize,
    /// Worker threads, `1` runs the pairs in order on the calling thread.
    pub jobs: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            start: 0,
            count: 1,
            step: 1,
            jobs: 1,
        }
    }
}

/// Which pairs of a batch were processed or skipped, by first frame index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Pairs whose outputs were written.
    pub processed: Vec<usize>,
    /// Pairs skipped because a frame is missing.
    pub missing: Vec<usize>,
    /// Pairs skipped because their geometry is degenerate.
    pub degenerate: Vec<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PairOutcome {
    Processed,
    Missing,
    Degenerate,
}

/// Run the pipeline over a range of frame pairs of a folder.
///
/// The calibration is read once from `input/calibration.json` and shared, read-only, by every
/// pair. A pair with a missing image or pose file is skipped with a warning, and so is a pair
/// whose geometry is degenerate. Any other error stops the batch.
///
/// When `matches_<NNNN>_<MMMM>.json` exists for a pair its correspondences are passed to the
/// run.
pub fn run_batch(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &BatchOptions,
    config: &PipelineConfig,
) -> Result<BatchSummary, PipelineError> {
    let (input, output) = (input.as_ref(), output.as_ref());
    if options.step == 0 {
        return Err(PipelineError::MalformedData(
            "the frame step must be positive".to_string(),
        ));
    }

    let calibration = Calibration::load(input)?;
    let pipeline = StereoPipeline::new(config.clone())?;
    std::fs::create_dir_all(output).map_err(stereo_io::IoError::from)?;

    let indices: Vec<usize> = (options.start..options.start + options.count).collect();
    log::info!(
        "processing {} pairs from {} with {} worker(s)",
        indices.len(),
        input.display(),
        options.jobs.max(1)
    );

    let run_pair = |i: usize| {
        process_pair(&pipeline, &calibration, input, output, i, i + options.step)
            .map(|outcome| (i, outcome))
    };

    let outcomes = if options.jobs > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.jobs)
            .build()?;
        pool.install(|| {
            indices
                .par_iter()
                .map(|&i| run_pair(i))
                .collect::<Result<Vec<_>, _>>()
        })?
    } else {
        indices
            .iter()
            .map(|&i| run_pair(i))
            .collect::<Result<Vec<_>, _>>()?
    };

    let mut summary = BatchSummary::default();
    for (i, outcome) in outcomes {
        match outcome {
            PairOutcome::Processed => summary.processed.push(i),
            PairOutcome::Missing => summary.missing.push(i),
            PairOutcome::Degenerate => summary.degenerate.push(i),
        }
    }
    log::info!(
        "batch done: {} processed, {} missing, {} degenerate",
        summary.processed.len(),
        summary.missing.len(),
        summary.degenerate.len()
    );
    Ok(summary)
}

fn process_pair(
    pipeline: &StereoPipeline,
    calibration: &Calibration,
    input: &Path,
    output: &Path,
    index_1: usize,
    index_2: usize,
) -> Result<PairOutcome, PipelineError> {
    let (Some(frame1), Some(frame2)) = (Frame::load(input, index_1)?, Frame::load(input, index_2)?)
    else {
        log::warn!("missing input: skipping frames {index_1:04} and {index_2:04}");
        return Ok(PairOutcome::Missing);
    };

    let matches: Option<Vec<FeatureMatch>> =
        records::read_matches(naming::matches_path(input, index_1, index_2))?
            .map(|rows| rows.into_iter().map(FeatureMatch::from).collect());

    match pipeline.run(calibration, &frame1, &frame2, matches.as_deref()) {
        Ok(result) => {
            write_outputs(output, &result)?;
            Ok(PairOutcome::Processed)
        }
        Err(e) if e.is_degenerate() => {
            log::warn!("degenerate geometry: skipping frames {index_1:04} and {index_2:04}. {e}");
            Ok(PairOutcome::Degenerate)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_step_is_rejected() -> Result<(), PipelineError> {
        let tmp_dir = tempfile::tempdir().map_err(stereo_io::IoError::from)?;
        let options = BatchOptions {
            step: 0,
            ..Default::default()
        };
        let res = run_batch(
            tmp_dir.path(),
            tmp_dir.path(),
            &options,
            &PipelineConfig::default(),
        );
        assert!(matches!(res, Err(PipelineError::MalformedData(_))));
        Ok(())
    }

    #[test]
    fn missing_calibration_aborts() -> Result<(), PipelineError> {
        let tmp_dir = tempfile::tempdir().map_err(stereo_io::IoError::from)?;
        let res = run_batch(
            tmp_dir.path(),
            tmp_dir.path().join("out"),
            &BatchOptions::default(),
            &PipelineConfig::default(),
        );
        assert!(matches!(res, Err(PipelineError::InputNotFound(_))));
        Ok(())
    }
}
