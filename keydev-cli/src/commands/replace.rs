use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde_json::json;

use keydev_core::engine::KnowledgeEngine;
use keydev_core::types::Scores;

use super::{EngineArgs, Format, open_engine, parse_date};

#[derive(Args, Debug)]
pub struct ReplaceArgs {
    /// Change-set dataset (JSON)
    pub dataset: PathBuf,

    /// Developer to find replacements for
    #[arg(long)]
    pub developer: String,

    /// Last included day of the window, YYYY-MM-DD (default: first window)
    #[arg(long)]
    pub date: Option<String>,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Number of candidates listed
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Output format: text, json
    #[arg(long, default_value = "text")]
    pub format: String,
}

pub fn run(args: ReplaceArgs) -> anyhow::Result<()> {
    let format = Format::parse(&args.format)?;
    let date = args.date.as_deref().map(parse_date).transpose()?;
    let engine = open_engine(&args.dataset, &args.engine, date)?;

    let candidates = engine
        .find_replacement(&args.developer)
        .with_context(|| format!("No replacement for '{}'", args.developer))?;

    match format {
        Format::Json => {
            let value = json!({
                "date": engine.last_included_date(),
                "developer": args.developer,
                "candidates": candidates,
            });
            let text = serde_json::to_string_pretty(&value).context("Failed to serialize candidates")?;
            println!("{text}");
        }
        Format::Text => print_text(&engine, &args.developer, candidates.as_ref(), args.top),
    }
    Ok(())
}

fn print_text(engine: &KnowledgeEngine, developer: &str, candidates: Option<&Scores>, top: usize) {
    println!(
        "Replacements for {developer} on {}",
        engine.last_included_date()
    );
    let Some(candidates) = candidates else {
        println!("  No recommendation: {}", no_recommendation_reason(engine, developer));
        return;
    };
    if candidates.is_empty() {
        println!("  No other developer shares any of their files");
        return;
    }
    for entry in candidates.top(top) {
        println!("  {:<30} {:>6.1}%", entry.developer, entry.score * 100.0);
    }
}

fn no_recommendation_reason(engine: &KnowledgeEngine, developer: &str) -> String {
    let reaches_nothing = engine
        .reachable_files(developer)
        .is_ok_and(std::collections::BTreeSet::is_empty);
    if reaches_nothing {
        format!("{developer} reaches no file")
    } else {
        format!(
            "fewer than {} other developers in the window",
            engine.config().scoring.min_replacement_candidates
        )
    }
}
