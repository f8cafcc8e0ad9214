// Integration test utilities and fixture datasets for keydev.

use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use serde_json::{Value, json};

use keydev_core::config::KeydevConfig;
use keydev_core::dataset::Dataset;
use keydev_core::engine::KnowledgeEngine;
use keydev_core::types::{ChangeSet, CodeChange};

pub fn add(path: &str) -> CodeChange {
    CodeChange::Add { path: path.into() }
}

pub fn modify(path: &str) -> CodeChange {
    CodeChange::Modify { path: path.into() }
}

pub fn delete(path: &str) -> CodeChange {
    CodeChange::Delete { path: path.into() }
}

pub fn rename(old_path: &str, path: &str) -> CodeChange {
    CodeChange::Rename {
        old_path: old_path.into(),
        path: path.into(),
    }
}

/// Builds change-set histories day by day, relative to a start date.
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    start: NaiveDate,
    num_files: usize,
    change_sets: Vec<ChangeSet>,
}

impl DatasetBuilder {
    pub fn new(start: NaiveDate) -> Self {
        Self {
            start,
            num_files: 20,
            change_sets: Vec::new(),
        }
    }

    /// Project-wide file count carried by change sets added from now on.
    pub fn files_in_project(mut self, num_files: usize) -> Self {
        self.num_files = num_files;
        self
    }

    pub fn commit(mut self, hash: &str, author: &str, day: u64, changes: Vec<CodeChange>) -> Self {
        self.push(hash, author, day, changes, &[]);
        self
    }

    pub fn commit_with_issues(
        mut self,
        hash: &str,
        author: &str,
        day: u64,
        changes: Vec<CodeChange>,
        issues: &[&str],
    ) -> Self {
        self.push(hash, author, day, changes, issues);
        self
    }

    /// A commit that modifies every file in `files`.
    pub fn modify(self, hash: &str, author: &str, day: u64, files: &[&str]) -> Self {
        let changes = files.iter().map(|f| modify(f)).collect();
        self.commit(hash, author, day, changes)
    }

    fn push(&mut self, hash: &str, author: &str, day: u64, changes: Vec<CodeChange>, issues: &[&str]) {
        self.change_sets.push(ChangeSet {
            commit_hash: hash.into(),
            author: author.into(),
            date: self.date(day),
            issues: issues.iter().map(|i| (*i).to_string()).collect(),
            code_changes: changes,
            num_files_in_project: self.num_files,
        });
    }

    /// Calendar date of a day offset.
    pub fn date(&self, day: u64) -> NaiveDate {
        self.start
            .checked_add_days(Days::new(day))
            .expect("fixture date in range")
    }

    pub fn change_sets(&self) -> &[ChangeSet] {
        &self.change_sets
    }

    pub fn build(&self) -> Dataset {
        Dataset::new(self.change_sets.clone())
    }

    pub fn engine(&self, config: KeydevConfig) -> KnowledgeEngine {
        KnowledgeEngine::new(self.build(), config).expect("fixture engine")
    }

    /// The dataset in the on-disk JSON format.
    pub fn to_json(&self) -> Value {
        let change_sets: Vec<Value> = self
            .change_sets
            .iter()
            .map(|cs| {
                let changes: Vec<Value> = cs.code_changes.iter().map(change_json).collect();
                json!({
                    "commit_hash": cs.commit_hash,
                    "author": cs.author,
                    "date": cs.date.format("%Y-%m-%dT12:00:00Z").to_string(),
                    "issues": cs.issues,
                    "code_changes": changes,
                    "num_current_files": cs.num_files_in_project,
                })
            })
            .collect();
        json!({ "change_sets": change_sets })
    }

    /// Write the dataset as `<dir>/<name>.json` and return its path.
    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(format!("{name}.json"));
        let text = serde_json::to_string_pretty(&self.to_json()).expect("serialize fixture");
        std::fs::write(&path, text).expect("write fixture");
        path
    }
}

fn change_json(cc: &CodeChange) -> Value {
    match cc.old_path() {
        Some(old) => json!({
            "file_path": cc.path(),
            "change_type": cc.change_type().as_str(),
            "old_file_path": old,
        }),
        None => json!({
            "file_path": cc.path(),
            "change_type": cc.change_type().as_str(),
        }),
    }
}

/// A dataset written to a temporary directory.
#[derive(Debug)]
pub struct TestDataset {
    pub dir: tempfile::TempDir,
    pub path: PathBuf,
}

impl TestDataset {
    pub fn write(builder: &DatasetBuilder, name: &str) -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        let path = builder.write(dir.path(), name);
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Default configuration with another window size and a tighter distance
/// limit, so that short fixtures still have rare files.
pub fn config(window_size_days: u32) -> KeydevConfig {
    let mut config = KeydevConfig::with_window_size(window_size_days);
    config.graph.distance_limit = 5.0;
    config
}

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 3, 2).expect("valid date")
}

// ── Scenarios ────────────────────────────────────────────────────

/// Six developers over four days.
///
/// Everyone touches `core.rs` on day 0; alice, bob and carol also own
/// files of their own.
pub fn team() -> DatasetBuilder {
    DatasetBuilder::new(start_date())
        .files_in_project(10)
        .modify("a0", "alice", 0, &["core.rs", "a.rs", "a2.rs"])
        .modify("b0", "bob", 0, &["core.rs", "b.rs"])
        .modify("c0", "carol", 0, &["core.rs"])
        .modify("d0", "dave", 0, &["core.rs"])
        .modify("e0", "erin", 0, &["core.rs"])
        .modify("f0", "frank", 0, &["core.rs"])
        .modify("b1", "bob", 1, &["b.rs"])
        .modify("c1", "carol", 1, &["core.rs", "c.rs"])
        .modify("a3", "alice", 3, &["a3.rs"])
}

/// alice commits on days 0 and 3; bob and carol keep committing until day 7.
pub fn departure() -> DatasetBuilder {
    DatasetBuilder::new(start_date())
        .modify("a0", "alice", 0, &["a.rs", "core.rs"])
        .modify("b0", "bob", 0, &["core.rs"])
        .modify("c1", "carol", 1, &["core.rs", "c.rs"])
        .modify("b2", "bob", 2, &["b.rs"])
        .modify("a3", "alice", 3, &["a.rs"])
        .modify("c3", "carol", 3, &["c.rs"])
        .modify("b4", "bob", 4, &["core.rs"])
        .modify("c5", "carol", 5, &["core.rs"])
        .modify("b6", "bob", 6, &["b.rs"])
        .modify("c7", "carol", 7, &["c.rs"])
}

/// One developer reaching nine of ten project files, five reaching one.
///
/// Everything is committed on day 0 of a four-day window, so crossing any
/// dated edge costs 4 and nobody gets past the shared file.
pub fn hero() -> DatasetBuilder {
    let own: Vec<String> = (1..=7).map(|i| format!("h{i}.rs")).collect();
    let mut hank: Vec<&str> = own.iter().map(String::as_str).collect();
    hank.push("core.rs");

    DatasetBuilder::new(start_date())
        .files_in_project(10)
        .modify("h0", "hank", 0, &hank)
        .modify("a0", "ann", 0, &["core.rs"])
        .modify("b0", "ben", 0, &["core.rs"])
        .modify("c0", "cid", 0, &["core.rs"])
        .modify("d0", "dot", 0, &["core.rs"])
        .modify("e0", "eve", 0, &["core.rs"])
        .modify("h3", "hank", 3, &["h8.rs"])
}

/// A file added by alice, renamed by bob on day 1 and modified on day 2.
pub fn renamed_file() -> DatasetBuilder {
    DatasetBuilder::new(start_date())
        .commit("a0", "alice", 0, vec![add("old.rs")])
        .commit("b1", "bob", 1, vec![rename("old.rs", "new.rs")])
        .modify("b2", "bob", 2, &["new.rs"])
}

/// Six developers on one day, each with a file of their own next to a
/// shared one. In a one-day window everybody reaches every file.
pub fn balanced() -> DatasetBuilder {
    ["ann", "ben", "cid", "dot", "eve", "fay"]
        .iter()
        .enumerate()
        .fold(
            DatasetBuilder::new(start_date()).files_in_project(12),
            |builder, (i, dev)| {
                let own = format!("{dev}.rs");
                builder.modify(&format!("c{i}"), dev, 0, &["core.rs", &own])
            },
        )
}
