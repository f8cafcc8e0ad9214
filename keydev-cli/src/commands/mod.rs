pub mod inspect;
pub mod replace;
pub mod run;

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Subcommand};

use keydev_core::config::KeydevConfig;
use keydev_core::dataset::Dataset;
use keydev_core::engine::KnowledgeEngine;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay datasets day by day and write one report file per dataset
    Run(run::RunArgs),
    /// Show key developers of one window
    Inspect(inspect::InspectArgs),
    /// Recommend replacements for a developer
    Replace(replace::ReplaceArgs),
}

pub fn run(cmd: Command, quiet: bool) -> anyhow::Result<()> {
    match cmd {
        Command::Run(args) => run::run(args, quiet),
        Command::Inspect(args) => inspect::run(args),
        Command::Replace(args) => replace::run(args),
    }
}

/// Options shared by every command that builds an engine.
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// Sliding window size in days (overrides the config file)
    #[arg(long, short = 'w')]
    pub window: Option<u32>,

    /// Path to a keydev.toml configuration file
    #[arg(long, env = "KEYDEV_CONFIG")]
    pub config: Option<PathBuf>,
}

impl EngineArgs {
    pub fn load_config(&self) -> anyhow::Result<KeydevConfig> {
        let mut config = match &self.config {
            Some(path) => KeydevConfig::load(path)
                .with_context(|| format!("Cannot load config: {}", path.display()))?,
            None => KeydevConfig::default(),
        };
        if let Some(window) = self.window {
            config.window.size_days = window;
        }
        config.validate().context("Invalid config")?;
        Ok(config)
    }
}

/// Output format for single-window commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

impl Format {
    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("Unknown format '{other}' (expected text or json)"),
        }
    }
}

pub fn load_dataset(path: &Path) -> anyhow::Result<Dataset> {
    Dataset::from_json_path(path).with_context(|| format!("Cannot read dataset: {}", path.display()))
}

pub fn parse_date(value: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{value}' (expected YYYY-MM-DD)"))
}

/// Build an engine and slide it to `date` (or leave it on the initial window).
pub fn open_engine(
    dataset: &Path,
    engine_args: &EngineArgs,
    date: Option<NaiveDate>,
) -> anyhow::Result<KnowledgeEngine> {
    let config = engine_args.load_config()?;
    let dataset = load_dataset(dataset)?;
    let mut engine = KnowledgeEngine::new(dataset, config).context("Cannot build initial window")?;

    if let Some(date) = date {
        if date < engine.last_included_date() {
            anyhow::bail!(
                "Date {date} is before the end of the first window ({})",
                engine.last_included_date()
            );
        }
        if !engine.forward_until(date)? {
            anyhow::bail!(
                "Date {date} is after the last day of the dataset ({})",
                engine.last_included_date()
            );
        }
    }
    Ok(engine)
}
