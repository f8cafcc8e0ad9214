//! Window replays: per-day key-developer reports and leaving-developer detection.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::KeydevConfig;
use crate::dataset::Dataset;
use crate::engine::KnowledgeEngine;
use crate::error::Result;
use crate::progress::ProgressReporter;
use crate::types::{Category, Metric, Scores, TeamShape};

/// Everything reported for one window state, keyed by its last included day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub developers: Vec<String>,
    pub top_committers: Scores,
    pub jacks: Option<Scores>,
    pub mavens: Option<Scores>,
    pub connectors: Scores,
    pub last_jack: Option<String>,
    pub last_maven: Option<String>,
    pub last_connector: Option<String>,
    pub num_files: usize,
    pub num_reachable_files: usize,
    pub num_rare_files: usize,
    pub balanced_or_hero: Option<TeamShape>,
    /// Replacement candidates for developers whose leaving day is `date`.
    pub replacements: BTreeMap<String, Option<Scores>>,
}

impl DailyReport {
    /// Snapshot the engine's current window.
    pub fn capture<'a, I>(engine: &KnowledgeEngine, leaving: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let owned = |category| engine.last_significant(category).map(str::to_string);
        let mut replacements = BTreeMap::new();
        for dev in leaving {
            replacements.insert(dev.to_string(), engine.find_replacement(dev)?);
        }

        Ok(Self {
            date: engine.last_included_date(),
            developers: engine.developers().into_iter().map(str::to_string).collect(),
            top_committers: engine.top_committers().clone(),
            jacks: engine.jacks().cloned(),
            mavens: engine.mavens().cloned(),
            connectors: engine.connectors().clone(),
            last_jack: owned(Category::Jacks),
            last_maven: owned(Category::Mavens),
            last_connector: owned(Category::Connectors),
            num_files: engine.num_files_in_project(),
            num_reachable_files: engine.num_reachable_files(),
            num_rare_files: engine.num_rare_files(),
            balanced_or_hero: engine.balanced_or_hero(),
            replacements,
        })
    }

    /// Scores of one metric in this report.
    pub fn metric(&self, metric: Metric) -> Option<&Scores> {
        match metric {
            Metric::TopCommitters => Some(&self.top_committers),
            Metric::Jacks => self.jacks.as_ref(),
            Metric::Mavens => self.mavens.as_ref(),
            Metric::Connectors => Some(&self.connectors),
        }
    }

    pub fn last_significant(&self, category: Category) -> Option<&str> {
        match category {
            Category::Jacks => self.last_jack.as_deref(),
            Category::Mavens => self.last_maven.as_deref(),
            Category::Connectors => self.last_connector.as_deref(),
        }
    }
}

/// Reports for every window position of one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub window_size_days: u32,
    pub days: Vec<DailyReport>,
}

impl ExperimentReport {
    pub fn day(&self, date: NaiveDate) -> Option<&DailyReport> {
        self.days.iter().find(|d| d.date == date)
    }
}

/// Developers that drop out of the window, keyed by their last contribution day.
///
/// Replays a copy of `engine` to the end of the data; `engine` itself is left
/// where it is. A developer present in one window state and absent from the
/// next is recorded on `last_included - window_size_days` of the later state.
pub fn find_leaving_developers(
    engine: &KnowledgeEngine,
) -> Result<BTreeMap<NaiveDate, BTreeSet<String>>> {
    let mut replay = engine.clone();
    let absence = Days::new(u64::from(replay.window_size_days()));
    let mut leaving: BTreeMap<NaiveDate, BTreeSet<String>> = BTreeMap::new();
    let mut previous: BTreeSet<String> = BTreeSet::new();

    loop {
        let current: BTreeSet<String> =
            replay.developers().into_iter().map(str::to_string).collect();
        let gone: BTreeSet<String> = previous.difference(&current).cloned().collect();
        if !gone.is_empty() {
            let date = replay.last_included_date();
            if let Some(day) = date.checked_sub_days(absence) {
                debug!(%day, count = gone.len(), "Developers left");
                leaving.entry(day).or_default().extend(gone);
            }
        }
        previous = current;

        if !replay.forward_one_day()? {
            break;
        }
    }

    Ok(leaving)
}

/// Replay a dataset from its initial window to the last day, reporting every
/// window state.
pub fn run_experiment(
    dataset: Dataset,
    config: KeydevConfig,
    reporter: &dyn ProgressReporter,
) -> Result<ExperimentReport> {
    let mut engine = KnowledgeEngine::new(dataset, config)?;
    let leaving = find_leaving_developers(&engine)?;

    let iterations = engine.num_iterations();
    reporter.start("Sliding window", Some(iterations as u64));
    let mut days = Vec::with_capacity(iterations);
    loop {
        let date = engine.last_included_date();
        let leavers = leaving.get(&date).into_iter().flatten().map(String::as_str);
        days.push(DailyReport::capture(&engine, leavers)?);
        reporter.advance(1);

        if !engine.forward_one_day()? {
            break;
        }
    }
    reporter.finish();

    info!(
        days = days.len(),
        window_size_days = engine.window_size_days(),
        leaving_days = leaving.len(),
        "Experiment complete"
    );

    Ok(ExperimentReport {
        window_size_days: engine.window_size_days(),
        days,
    })
}
