//! Shared domain types: change sets, graph kinds, scores and metric names.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ── Change sets ────────────────────────────────────────────────────

/// Kind of a single file-level change inside a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Add,
    Modify,
    Delete,
    Rename,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Modify => "MODIFY",
            Self::Delete => "DELETE",
            Self::Rename => "RENAME",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file-level change. A rename always carries both paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CodeChange {
    Add { path: String },
    Modify { path: String },
    Delete { path: String },
    Rename { old_path: String, path: String },
}

impl CodeChange {
    pub fn change_type(&self) -> ChangeType {
        match self {
            Self::Add { .. } => ChangeType::Add,
            Self::Modify { .. } => ChangeType::Modify,
            Self::Delete { .. } => ChangeType::Delete,
            Self::Rename { .. } => ChangeType::Rename,
        }
    }

    /// Current path of the file (the new path for renames).
    pub fn path(&self) -> &str {
        match self {
            Self::Add { path }
            | Self::Modify { path }
            | Self::Delete { path }
            | Self::Rename { path, .. } => path,
        }
    }

    pub fn old_path(&self) -> Option<&str> {
        match self {
            Self::Rename { old_path, .. } => Some(old_path),
            _ => None,
        }
    }
}

/// A commit as seen by the windowing layer. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub commit_hash: String,
    /// Normalized (lowercase) author name.
    pub author: String,
    /// Commit date truncated to the day.
    pub date: NaiveDate,
    pub issues: Vec<String>,
    pub code_changes: Vec<CodeChange>,
    /// Number of files the whole project contained after this commit.
    pub num_files_in_project: usize,
}

impl ChangeSet {
    /// Paths that are added or modified (the files the commit "includes").
    pub fn touched_files(&self) -> impl Iterator<Item = &str> {
        self.code_changes.iter().filter_map(|cc| match cc {
            CodeChange::Add { path } | CodeChange::Modify { path } => Some(path.as_str()),
            _ => None,
        })
    }

    pub fn deleted_files(&self) -> impl Iterator<Item = &str> {
        self.code_changes.iter().filter_map(|cc| match cc {
            CodeChange::Delete { path } => Some(path.as_str()),
            _ => None,
        })
    }

    /// `(old, new)` path pairs for renames, in commit order.
    pub fn renames(&self) -> impl Iterator<Item = (&str, &str)> {
        self.code_changes.iter().filter_map(|cc| match cc {
            CodeChange::Rename { old_path, path } => Some((old_path.as_str(), path.as_str())),
            _ => None,
        })
    }
}

// ── Artifact graph kinds ───────────────────────────────────────────

/// Kind tag of an artifact graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    /// A contributor (normalized author name).
    Developer,
    /// A commit, keyed by hash.
    ChangeSet,
    /// A source file, keyed by its current path.
    File,
    /// An issue tracker entry.
    Issue,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Developer => "Developer",
            Self::ChangeSet => "ChangeSet",
            Self::File => "File",
            Self::Issue => "Issue",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind tag of an artifact graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Developer → `ChangeSet`. Always undated, zero distance.
    Commit,
    /// `ChangeSet` → File.
    Include,
    /// `ChangeSet` → Issue.
    Link,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Include => "include",
            Self::Link => "link",
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Scores ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub developer: String,
    pub score: f64,
}

/// Developer scores sorted by descending score (ties broken by name).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scores(Vec<ScoreEntry>);

impl Scores {
    /// Sort descending and drop every score below `threshold`.
    pub fn ranked<I>(scores: I, threshold: f64) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let mut entries: Vec<ScoreEntry> = scores
            .into_iter()
            .filter(|(_, score)| *score >= threshold)
            .map(|(developer, score)| ScoreEntry { developer, score })
            .collect();
        entries.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.developer.cmp(&b.developer))
        });
        Self(entries)
    }

    pub fn get(&self, developer: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|e| e.developer == developer)
            .map(|e| e.score)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoreEntry> {
        self.0.iter()
    }

    pub fn developers(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|e| e.developer.as_str())
    }

    pub fn top(&self, n: usize) -> &[ScoreEntry] {
        &self.0[..n.min(self.0.len())]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Scores {
    type Item = &'a ScoreEntry;
    type IntoIter = std::slice::Iter<'a, ScoreEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ── Metric selection ───────────────────────────────────────────────

/// Developer metrics reported per window state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TopCommitters,
    Jacks,
    Mavens,
    Connectors,
}

impl Metric {
    pub const ALL: [Self; 4] = [
        Self::TopCommitters,
        Self::Jacks,
        Self::Mavens,
        Self::Connectors,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopCommitters => "top_committers",
            Self::Jacks => "jacks",
            Self::Mavens => "mavens",
            Self::Connectors => "connectors",
        }
    }

    /// The Pareto category of this metric, if it has one.
    pub fn category(&self) -> Option<Category> {
        match self {
            Self::TopCommitters => None,
            Self::Jacks => Some(Category::Jacks),
            Self::Mavens => Some(Category::Mavens),
            Self::Connectors => Some(Category::Connectors),
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "top_committers" | "committers" => Ok(Self::TopCommitters),
            "jacks" | "jack" => Ok(Self::Jacks),
            "mavens" | "maven" => Ok(Self::Mavens),
            "connectors" | "connector" => Ok(Self::Connectors),
            other => Err(format!(
                "unknown metric '{other}' (expected top_committers, jacks, mavens or connectors)"
            )),
        }
    }
}

/// Key-developer categories that have a "last significant" developer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Jacks,
    Mavens,
    Connectors,
}

impl Category {
    pub const ALL: [Self; 3] = [Self::Jacks, Self::Mavens, Self::Connectors];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jacks => "jacks",
            Self::Mavens => "mavens",
            Self::Connectors => "connectors",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<Metric>()?.category() {
            Some(category) => Ok(category),
            None => Err(format!("'{s}' has no significance category")),
        }
    }
}

// ── Team shape ─────────────────────────────────────────────────────

/// Label for how knowledge is spread over the team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamShape {
    Balanced,
    Hero,
}

impl TeamShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::Hero => "hero",
        }
    }
}

impl std::fmt::Display for TeamShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_parse() {
        assert_eq!("jacks".parse::<Metric>(), Ok(Metric::Jacks));
        assert_eq!("Top-Committers".parse::<Metric>(), Ok(Metric::TopCommitters));
        assert!("heroes".parse::<Metric>().is_err());
        assert_eq!("connector".parse::<Category>(), Ok(Category::Connectors));
        assert!("top_committers".parse::<Category>().is_err());
        for metric in Metric::ALL {
            assert_eq!(metric.as_str().parse::<Metric>(), Ok(metric));
        }
    }

    #[test]
    fn ranked_sorts_descending_and_filters() {
        let scores = Scores::ranked(
            vec![
                ("b".to_string(), 0.5),
                ("a".to_string(), 0.9),
                ("c".to_string(), 0.000_001),
                ("d".to_string(), 0.5),
            ],
            0.000_005,
        );
        let names: Vec<_> = scores.developers().collect();
        assert_eq!(names, vec!["a", "b", "d"]);
        assert_eq!(scores.get("c"), None);
        assert_eq!(scores.get("a"), Some(0.9));
    }

    #[test]
    fn change_set_partitions_changes() {
        let cs = ChangeSet {
            commit_hash: "c1".into(),
            author: "dev".into(),
            date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            issues: vec![],
            code_changes: vec![
                CodeChange::Add { path: "a".into() },
                CodeChange::Modify { path: "b".into() },
                CodeChange::Delete { path: "c".into() },
                CodeChange::Rename {
                    old_path: "d".into(),
                    path: "e".into(),
                },
            ],
            num_files_in_project: 4,
        };
        assert_eq!(cs.touched_files().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(cs.deleted_files().collect::<Vec<_>>(), vec!["c"]);
        assert_eq!(cs.renames().collect::<Vec<_>>(), vec![("d", "e")]);
        assert_eq!(cs.code_changes[3].old_path(), Some("d"));
        assert_eq!(cs.code_changes[3].change_type(), ChangeType::Rename);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_scores() -> impl Strategy<Value = Vec<(String, f64)>> {
            prop::collection::vec(("[a-e]{1,3}", 0.0f64..1.0), 0..20)
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(100))]

            #[test]
            fn ranked_scores_are_sorted_and_thresholded(
                scores in arb_scores(),
                threshold in 0.0f64..1.0,
            ) {
                let ranked = Scores::ranked(scores.clone(), threshold);
                let kept = scores.iter().filter(|(_, s)| *s >= threshold).count();
                prop_assert_eq!(ranked.len(), kept);

                let entries: Vec<&ScoreEntry> = ranked.iter().collect();
                for pair in entries.windows(2) {
                    let (a, b) = (pair[0], pair[1]);
                    prop_assert!(
                        a.score > b.score || (a.score == b.score && a.developer <= b.developer)
                    );
                }
                prop_assert!(ranked.iter().all(|e| e.score >= threshold));
            }
        }
    }
}
