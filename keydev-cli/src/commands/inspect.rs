use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use keydev_core::engine::KnowledgeEngine;
use keydev_core::experiment::DailyReport;
use keydev_core::types::{Metric, Scores};

use super::{EngineArgs, Format, open_engine, parse_date};

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Change-set dataset (JSON)
    pub dataset: PathBuf,

    /// Last included day of the window to inspect, YYYY-MM-DD (default: first window)
    #[arg(long)]
    pub date: Option<String>,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Metric to show: top_committers, jacks, mavens, connectors (default: all)
    #[arg(long)]
    pub metric: Option<String>,

    /// Number of developers listed per metric
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Output format: text, json
    #[arg(long, default_value = "text")]
    pub format: String,
}

pub fn run(args: InspectArgs) -> anyhow::Result<()> {
    let format = Format::parse(&args.format)?;
    let metrics: Vec<Metric> = match &args.metric {
        Some(name) => vec![name.parse::<Metric>().map_err(anyhow::Error::msg)?],
        None => Metric::ALL.to_vec(),
    };
    let date = args.date.as_deref().map(parse_date).transpose()?;

    let engine = open_engine(&args.dataset, &args.engine, date)?;
    let report = DailyReport::capture(&engine, std::iter::empty())?;

    match format {
        Format::Json => {
            let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
            println!("{json}");
        }
        Format::Text => print!("{}", render_text(&engine, &report, &metrics, args.top)),
    }
    Ok(())
}

fn render_text(
    engine: &KnowledgeEngine,
    report: &DailyReport,
    metrics: &[Metric],
    top: usize,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Window {} .. {} ({} days)",
        engine.first_included_date(),
        report.date,
        engine.window_size_days()
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "  Developers:      {:>6}", report.developers.len());
    let _ = writeln!(out, "  Nodes:           {:>6}", engine.num_nodes());
    let _ = writeln!(out, "  Edges:           {:>6}", engine.num_edges());
    let _ = writeln!(out, "  Project files:   {:>6}", report.num_files);
    let _ = writeln!(out, "  Reachable files: {:>6}", report.num_reachable_files);
    let _ = writeln!(out, "  Rare files:      {:>6}", report.num_rare_files);
    let shape = report
        .balanced_or_hero
        .map_or_else(|| "undefined".to_string(), |s| s.to_string());
    let _ = writeln!(out, "  Team shape:      {shape:>6}");

    for &metric in metrics {
        let _ = writeln!(out);
        match metric.category().and_then(|c| report.last_significant(c)) {
            Some(last) => {
                let _ = writeln!(out, "  {metric} (last significant: {last})");
            }
            None => {
                let _ = writeln!(out, "  {metric}");
            }
        }
        write_scores(&mut out, report.metric(metric), top);
    }
    out
}

fn write_scores(out: &mut String, scores: Option<&Scores>, top: usize) {
    let Some(scores) = scores else {
        let _ = writeln!(out, "    (undefined)");
        return;
    };
    if scores.is_empty() {
        let _ = writeln!(out, "    (none)");
        return;
    }
    for entry in scores.top(top) {
        let _ = writeln!(out, "    {:<30} {:>10.6}", entry.developer, entry.score);
    }
    if scores.len() > top {
        let _ = writeln!(out, "    ... {} more", scores.len() - top);
    }
}
