use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use indicatif::{MultiProgress, ProgressDrawTarget};
use rayon::prelude::*;
use tracing::{info, warn};

use keydev_core::config::KeydevConfig;
use keydev_core::experiment::run_experiment;
use keydev_core::progress::IndicatifReporter;

use super::{EngineArgs, load_dataset};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Change-set datasets (JSON) to replay
    #[arg(required = true)]
    pub datasets: Vec<PathBuf>,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Directory for the report files
    #[arg(long, default_value = "results")]
    pub out: PathBuf,

    /// Number of datasets replayed at once (default: one per core)
    #[arg(long, short = 'j')]
    pub jobs: Option<usize>,
}

pub fn run(args: RunArgs, quiet: bool) -> anyhow::Result<()> {
    let config = args.engine.load_config()?;
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("Cannot create output directory: {}", args.out.display()))?;

    let progress = if quiet {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    } else {
        MultiProgress::new()
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.jobs.unwrap_or(0))
        .build()
        .context("Failed to start worker pool")?;

    let outcomes: Vec<(PathBuf, anyhow::Result<PathBuf>)> = pool.install(|| {
        args.datasets
            .par_iter()
            .map(|dataset| {
                let outcome = replay(dataset, &config, &args.out, &progress);
                (dataset.clone(), outcome)
            })
            .collect()
    });

    let mut first_error = None;
    for (dataset, outcome) in outcomes {
        match outcome {
            Ok(written) => {
                if !quiet {
                    println!("{} -> {}", dataset.display(), written.display());
                }
            }
            Err(e) => {
                warn!(dataset = %dataset.display(), "Replay failed: {e:#}");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Replay one dataset and write its report; returns the report path.
fn replay(
    dataset: &Path,
    config: &KeydevConfig,
    out: &Path,
    progress: &MultiProgress,
) -> anyhow::Result<PathBuf> {
    let data = load_dataset(dataset)?;
    let reporter = IndicatifReporter::in_group(progress);
    let report = run_experiment(data, config.clone(), &reporter)
        .with_context(|| format!("Replay failed for {}", dataset.display()))?;

    let path = out.join(report_file_name(dataset, config.window.size_days));
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    std::fs::write(&path, json)
        .with_context(|| format!("Cannot write report: {}", path.display()))?;

    info!(
        dataset = %dataset.display(),
        report = %path.display(),
        days = report.days.len(),
        "Wrote report"
    );
    Ok(path)
}

/// `<stem>_sws<N>.json`
fn report_file_name(dataset: &Path, window_size_days: u32) -> String {
    let stem = dataset
        .file_stem()
        .map_or_else(|| "dataset".into(), |s| s.to_string_lossy());
    format!("{stem}_sws{window_size_days}.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_name_uses_stem_and_window() {
        assert_eq!(
            report_file_name(Path::new("data/hadoop.json"), 365),
            "hadoop_sws365.json"
        );
        assert_eq!(report_file_name(Path::new("/"), 7), "dataset_sws7.json");
    }
}
