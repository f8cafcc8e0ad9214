//! Knowledge engine: the sliding artifact graph plus every derived metric.
//!
//! [`KnowledgeEngine`] owns the change-set buffer, the artifact graph and a
//! set of lazily computed caches. The caches are stamped with the window
//! version they were computed for; advancing the window bumps the version and
//! drops them wholesale, so a stale value can never be observed.
#![allow(clippy::cast_precision_loss)]

use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::analyze::centrality::connector_scores;
use crate::analyze::developer_graph::DeveloperGraph;
use crate::analyze::team_shape;
use crate::config::KeydevConfig;
use crate::dataset::Dataset;
use crate::error::{GraphError, Result, WindowError};
use crate::graph::ArtifactGraph;
use crate::graph::reach::{self, DecayedDistance};
use crate::types::{Category, Metric, NodeKind, Scores, TeamShape};
use crate::window::{ChangeSetBuffer, WindowBounds};

type FileMap = BTreeMap<String, BTreeSet<String>>;

/// Values derived from one window state.
#[derive(Debug, Clone, Default)]
struct Derived {
    version: u64,
    reachable: OnceCell<FileMap>,
    file_to_devs: OnceCell<FileMap>,
    rare: OnceCell<FileMap>,
    developer_graph: OnceCell<DeveloperGraph>,
    top_committers: OnceCell<Scores>,
    jacks: OnceCell<Option<Scores>>,
    mavens: OnceCell<Option<Scores>>,
    connectors: OnceCell<Scores>,
}

impl Derived {
    fn for_version(version: u64) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct KnowledgeEngine {
    config: KeydevConfig,
    buffer: ChangeSetBuffer,
    artifacts: ArtifactGraph,
    bounds: WindowBounds,
    version: u64,
    derived: Derived,
}

impl KnowledgeEngine {
    /// Build the engine and position it on the initial window.
    pub fn new(dataset: Dataset, config: KeydevConfig) -> Result<Self> {
        config.validate()?;
        let mut buffer = ChangeSetBuffer::new(dataset, config.window.size_days)?;
        let mut artifacts = ArtifactGraph::new(config.graph.large_change_set_limit);

        let initial = buffer.initial_window()?;
        let num_change_sets = initial.len();
        artifacts.apply_added(initial);
        let bounds = buffer.bounds().ok_or(WindowError::NotInitialized)?;

        info!(
            first = %bounds.first,
            last = %bounds.last,
            change_sets = num_change_sets,
            nodes = artifacts.num_nodes(),
            edges = artifacts.num_edges(),
            "Built initial window"
        );

        Ok(Self {
            config,
            buffer,
            artifacts,
            bounds,
            version: 0,
            derived: Derived::for_version(0),
        })
    }

    // ── Window control ─────────────────────────────────────────────

    /// Slide the window by one day. `Ok(false)` once the data is exhausted;
    /// the engine is left unchanged in that case.
    pub fn forward_one_day(&mut self) -> Result<bool> {
        let delta = match self.buffer.forward_one_day() {
            Ok(delta) => delta,
            Err(WindowError::SlidingNotPossible { last_included }) => {
                debug!(%last_included, "Sliding window exhausted");
                return Ok(false);
            }
            Err(err) => return Err(err.into()),
        };

        let (added, removed) = (delta.added.len(), delta.removed.len());
        self.artifacts.apply_added(delta.added);
        self.artifacts.apply_removed(delta.removed);

        self.bounds = self.buffer.bounds().ok_or(WindowError::NotInitialized)?;
        self.version += 1;
        self.derived = Derived::for_version(self.version);

        debug!(
            date = %self.bounds.last,
            added,
            removed,
            nodes = self.artifacts.num_nodes(),
            edges = self.artifacts.num_edges(),
            "Advanced window"
        );
        Ok(true)
    }

    /// Slide until the last included day is `date` or later.
    /// `Ok(false)` if the data ran out first.
    pub fn forward_until(&mut self, date: NaiveDate) -> Result<bool> {
        while self.bounds.last < date {
            if !self.forward_one_day()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn config(&self) -> &KeydevConfig {
        &self.config
    }

    /// Incremented on every successful slide.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn window_size_days(&self) -> u32 {
        self.buffer.window_size_days()
    }

    pub fn first_included_date(&self) -> NaiveDate {
        self.bounds.first
    }

    pub fn last_included_date(&self) -> NaiveDate {
        self.bounds.last
    }

    /// Number of window positions the dataset allows, the initial one included.
    pub fn num_iterations(&self) -> usize {
        self.buffer.num_possible_iterations()
    }

    pub fn buffer(&self) -> &ChangeSetBuffer {
        &self.buffer
    }

    pub fn artifact_graph(&self) -> &ArtifactGraph {
        &self.artifacts
    }

    // ── Graph views ────────────────────────────────────────────────

    /// Developers in the window, sorted by name.
    pub fn developers(&self) -> Vec<&str> {
        self.artifacts.developers()
    }

    pub fn files(&self) -> Vec<&str> {
        self.artifacts.files()
    }

    pub fn num_nodes(&self) -> usize {
        self.artifacts.num_nodes()
    }

    pub fn num_edges(&self) -> usize {
        self.artifacts.num_edges()
    }

    pub fn num_files_in_project(&self) -> usize {
        self.artifacts.num_files_in_project()
    }

    // ── Reachability ───────────────────────────────────────────────

    fn derived(&self) -> &Derived {
        debug_assert_eq!(self.derived.version, self.version);
        &self.derived
    }

    /// Files every developer can reach, keyed by developer.
    pub fn dev_to_reachable_files(&self) -> &FileMap {
        self.derived().reachable.get_or_init(|| {
            let cost = DecayedDistance::new(self.bounds.first, self.window_size_days());
            let limit = self.config.graph.distance_limit;
            self.artifacts
                .developers()
                .into_iter()
                .filter_map(|dev| {
                    reach::reachable_files(&self.artifacts, dev, &cost, limit)
                        .map(|files| (dev.to_string(), files))
                })
                .collect()
        })
    }

    /// Files reachable by one developer.
    pub fn reachable_files(&self, developer: &str) -> Result<&BTreeSet<String>> {
        self.dev_to_reachable_files()
            .get(developer)
            .ok_or_else(|| GraphError::UnknownDeveloper(developer.to_string()).into())
    }

    /// Developers reaching each reachable file.
    pub fn file_to_devs(&self) -> &FileMap {
        self.derived().file_to_devs.get_or_init(|| {
            let mut out = FileMap::new();
            for (dev, files) in self.dev_to_reachable_files() {
                for file in files {
                    out.entry(file.clone()).or_default().insert(dev.clone());
                }
            }
            out
        })
    }

    /// Files reachable by exactly one developer, keyed by that developer.
    /// Developers without rare files are absent.
    pub fn dev_to_rare_files(&self) -> &FileMap {
        self.derived().rare.get_or_init(|| {
            let mut out = FileMap::new();
            for (file, devs) in self.file_to_devs() {
                if devs.len() != 1 {
                    continue;
                }
                if let Some(dev) = devs.first() {
                    out.entry(dev.clone()).or_default().insert(file.clone());
                }
            }
            out
        })
    }

    pub fn num_reachable_files(&self) -> usize {
        self.file_to_devs().len()
    }

    pub fn num_rare_files(&self) -> usize {
        self.dev_to_rare_files().values().map(BTreeSet::len).sum()
    }

    // ── Developer graph ────────────────────────────────────────────

    pub fn developer_graph(&self) -> &DeveloperGraph {
        self.derived()
            .developer_graph
            .get_or_init(|| DeveloperGraph::build(&self.artifacts))
    }

    /// Direct neighbors of every developer in the developer graph.
    pub fn dev_to_reachable_devs(&self) -> BTreeMap<&str, BTreeSet<&str>> {
        self.developer_graph().adjacency()
    }

    // ── Scores ─────────────────────────────────────────────────────

    /// Commits per developer in the window.
    pub fn top_committers(&self) -> &Scores {
        self.derived().top_committers.get_or_init(|| {
            Scores::ranked(
                self.artifacts
                    .developers()
                    .into_iter()
                    .map(|dev| (dev.to_string(), self.artifacts.commit_count(dev) as f64)),
                self.config.scoring.score_threshold,
            )
        })
    }

    /// Share of the project's files each developer reaches.
    /// `None` when the project file count is 0.
    pub fn jacks(&self) -> Option<&Scores> {
        self.derived()
            .jacks
            .get_or_init(|| {
                let total = self.num_files_in_project();
                (total > 0).then(|| {
                    Scores::ranked(
                        self.dev_to_reachable_files()
                            .iter()
                            .map(|(dev, files)| (dev.clone(), files.len() as f64 / total as f64)),
                        self.config.scoring.score_threshold,
                    )
                })
            })
            .as_ref()
    }

    /// Share of the rare files each developer holds. `None` without rare files.
    pub fn mavens(&self) -> Option<&Scores> {
        self.derived()
            .mavens
            .get_or_init(|| {
                let total = self.num_rare_files();
                (total > 0).then(|| {
                    Scores::ranked(
                        self.dev_to_rare_files()
                            .iter()
                            .map(|(dev, files)| (dev.clone(), files.len() as f64 / total as f64)),
                        self.config.scoring.score_threshold,
                    )
                })
            })
            .as_ref()
    }

    /// Normalized weighted betweenness in the developer graph.
    pub fn connectors(&self) -> &Scores {
        self.derived().connectors.get_or_init(|| {
            Scores::ranked(
                connector_scores(self.developer_graph()),
                self.config.scoring.score_threshold,
            )
        })
    }

    /// Scores of one category.
    pub fn scores(&self, category: Category) -> Option<&Scores> {
        match category {
            Category::Jacks => self.jacks(),
            Category::Mavens => self.mavens(),
            Category::Connectors => Some(self.connectors()),
        }
    }

    /// Scores of one metric.
    pub fn metric(&self, metric: Metric) -> Option<&Scores> {
        match metric {
            Metric::TopCommitters => Some(self.top_committers()),
            Metric::Jacks => self.jacks(),
            Metric::Mavens => self.mavens(),
            Metric::Connectors => Some(self.connectors()),
        }
    }

    // ── Pareto ─────────────────────────────────────────────────────

    /// The last developer of the shortest score-ordered prefix that covers
    /// `pareto_coverage` of the category's universe.
    ///
    /// Jacks cover reachable files, mavens cover rare files, connectors cover
    /// developers (themselves plus their developer-graph neighbors).
    pub fn last_significant(&self, category: Category) -> Option<&str> {
        let scores = self.scores(category)?;
        let coverage = self.config.scoring.pareto_coverage;

        let total = match category {
            Category::Jacks => self.num_reachable_files(),
            Category::Mavens => self.num_rare_files(),
            Category::Connectors => self.artifacts.count_of_kind(NodeKind::Developer),
        };
        if total == 0 {
            return None;
        }

        let devs = self.developer_graph();
        let mut covered: BTreeSet<&str> = BTreeSet::new();
        for entry in scores {
            match category {
                Category::Jacks => {
                    if let Some(files) = self.dev_to_reachable_files().get(&entry.developer) {
                        covered.extend(files.iter().map(String::as_str));
                    }
                }
                Category::Mavens => {
                    if let Some(files) = self.dev_to_rare_files().get(&entry.developer) {
                        covered.extend(files.iter().map(String::as_str));
                    }
                }
                Category::Connectors => {
                    covered.insert(entry.developer.as_str());
                    covered.extend(devs.neighbors(&entry.developer));
                }
            }
            if covered.len() as f64 / total as f64 >= coverage {
                return Some(entry.developer.as_str());
            }
        }
        None
    }

    // ── Replacement ────────────────────────────────────────────────

    /// Rank the other developers by how much of `developer`'s reachable files
    /// they also reach.
    ///
    /// `Err` if `developer` is not in the window. `None` if they reach no
    /// file or fewer than `min_replacement_candidates` others are present.
    pub fn find_replacement(&self, developer: &str) -> Result<Option<Scores>> {
        let own = self.reachable_files(developer)?;
        if own.is_empty() {
            return Ok(None);
        }

        let reach = self.dev_to_reachable_files();
        let others: Vec<(&String, &BTreeSet<String>)> =
            reach.iter().filter(|(dev, _)| *dev != developer).collect();
        if others.len() < self.config.scoring.min_replacement_candidates {
            return Ok(None);
        }

        let total = own.len() as f64;
        Ok(Some(Scores::ranked(
            others.into_iter().map(|(dev, files)| {
                (dev.clone(), own.intersection(files).count() as f64 / total)
            }),
            self.config.scoring.score_threshold,
        )))
    }

    // ── Team shape ─────────────────────────────────────────────────

    /// Jack score of every developer in the window, 0 for those filtered out.
    pub fn knowledge_distribution(&self) -> Vec<f64> {
        let jacks = self.jacks();
        self.developers()
            .into_iter()
            .map(|dev| jacks.and_then(|j| j.get(dev)).unwrap_or(0.0))
            .collect()
    }

    /// `None` with fewer than `min_developers` developers.
    pub fn balanced_or_hero(&self) -> Option<TeamShape> {
        team_shape::classify(&self.knowledge_distribution(), &self.config.team_shape)
    }
}
