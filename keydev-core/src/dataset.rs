//! Change-set dataset loading.
//!
//! Datasets are produced by an external extraction step as a single JSON
//! document: `{"change_sets": [...]}`, one record per commit, in commit order.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::DatasetError;
use crate::types::{ChangeSet, ChangeType, CodeChange};

/// Date format used by the extraction step.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

// ── Raw records ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawDataset {
    change_sets: Vec<RawChangeSet>,
}

#[derive(Debug, Deserialize)]
struct RawChangeSet {
    commit_hash: String,
    author: String,
    date: String,
    #[serde(default)]
    issues: Vec<String>,
    code_changes: Vec<RawCodeChange>,
    num_current_files: usize,
}

/// A file change as emitted by the extraction step.
///
/// `num_added`/`num_deleted` are only present in datasets whose renames
/// have not been detected yet; see [`fuse_renames`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawCodeChange {
    pub file_path: String,
    pub change_type: ChangeType,
    #[serde(default)]
    pub old_file_path: Option<String>,
    #[serde(default)]
    pub num_added: Option<u64>,
    #[serde(default)]
    pub num_deleted: Option<u64>,
}

impl RawCodeChange {
    fn file_name(&self) -> &str {
        self.file_path.rsplit('/').next().unwrap_or(&self.file_path)
    }

    fn into_code_change(self, commit: &str) -> Result<CodeChange, DatasetError> {
        let invalid = |message: String| DatasetError::InvalidChange {
            commit: commit.to_string(),
            message,
        };
        match (self.change_type, self.old_file_path) {
            (ChangeType::Rename, Some(old_path)) => Ok(CodeChange::Rename {
                old_path,
                path: self.file_path,
            }),
            (ChangeType::Rename, None) => Err(invalid(format!(
                "RENAME of {} has no old file path",
                self.file_path
            ))),
            (other, Some(old)) => Err(invalid(format!(
                "{other} of {} carries an old file path ({old})",
                self.file_path
            ))),
            (ChangeType::Add, None) => Ok(CodeChange::Add {
                path: self.file_path,
            }),
            (ChangeType::Modify, None) => Ok(CodeChange::Modify {
                path: self.file_path,
            }),
            (ChangeType::Delete, None) => Ok(CodeChange::Delete {
                path: self.file_path,
            }),
        }
    }
}

// ── Rename detection ───────────────────────────────────────────────

/// Fuse ADD/DELETE pairs of one commit into RENAMEs.
///
/// An ADD and a DELETE are the same file moved when the added line count of
/// the one equals the deleted line count of the other. A partner with the
/// same file name wins over any other match. Changes without line counts are
/// never fused. The fused change takes the position of the first change of
/// the pair.
pub fn fuse_renames(changes: Vec<RawCodeChange>) -> Vec<RawCodeChange> {
    let mut consumed = vec![false; changes.len()];
    let mut fused = Vec::with_capacity(changes.len());

    for i in 0..changes.len() {
        if consumed[i] {
            continue;
        }
        consumed[i] = true;
        let current = &changes[i];

        let partner = find_rename_partner(&changes, &consumed, i);

        match partner {
            Some(j) => {
                consumed[j] = true;
                let (added, deleted) = if current.change_type == ChangeType::Add {
                    (current, &changes[j])
                } else {
                    (&changes[j], current)
                };
                fused.push(RawCodeChange {
                    file_path: added.file_path.clone(),
                    change_type: ChangeType::Rename,
                    old_file_path: Some(deleted.file_path.clone()),
                    num_added: None,
                    num_deleted: None,
                });
            }
            None => fused.push(current.clone()),
        }
    }

    fused
}

/// Index of the unconsumed change that completes a rename with `changes[i]`.
fn find_rename_partner(changes: &[RawCodeChange], consumed: &[bool], i: usize) -> Option<usize> {
    let current = &changes[i];
    let (wanted, lines) = match current.change_type {
        ChangeType::Add => (ChangeType::Delete, current.num_added?),
        ChangeType::Delete => (ChangeType::Add, current.num_deleted?),
        ChangeType::Modify | ChangeType::Rename => return None,
    };
    let matches = |j: usize| {
        let cc = &changes[j];
        let other_lines = if wanted == ChangeType::Add {
            cc.num_added
        } else {
            cc.num_deleted
        };
        !consumed[j] && cc.change_type == wanted && other_lines == Some(lines)
    };

    let mut candidates = (i + 1..changes.len()).filter(|&j| matches(j));
    let first = candidates.next()?;
    if changes[first].file_name() == current.file_name() {
        return Some(first);
    }
    candidates
        .find(|&j| changes[j].file_name() == current.file_name())
        .or(Some(first))
}

// ── Dataset ────────────────────────────────────────────────────────

/// Time-ordered sequence of change sets for one project.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    change_sets: Vec<ChangeSet>,
}

impl Dataset {
    /// Build a dataset from change sets, ordering them by day (stable).
    pub fn new(mut change_sets: Vec<ChangeSet>) -> Self {
        change_sets.sort_by_key(|cs| cs.date);
        Self { change_sets }
    }

    pub fn from_json_path(path: &Path) -> Result<Self, DatasetError> {
        let text = std::fs::read_to_string(path)?;
        let dataset = Self::from_json_str(&text)?;
        info!(
            path = %path.display(),
            change_sets = dataset.len(),
            "Loaded change-set dataset"
        );
        Ok(dataset)
    }

    pub fn from_json_str(text: &str) -> Result<Self, DatasetError> {
        let raw: RawDataset = serde_json::from_str(text)?;
        let change_sets = raw
            .change_sets
            .into_iter()
            .map(convert_change_set)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(change_sets))
    }

    pub fn change_sets(&self) -> &[ChangeSet] {
        &self.change_sets
    }

    pub fn into_change_sets(self) -> Vec<ChangeSet> {
        self.change_sets
    }

    pub fn len(&self) -> usize {
        self.change_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.change_sets.is_empty()
    }
}

fn convert_change_set(raw: RawChangeSet) -> Result<ChangeSet, DatasetError> {
    if raw.code_changes.is_empty() {
        return Err(DatasetError::EmptyChangeSet(raw.commit_hash));
    }
    let date = parse_day(&raw.date).ok_or_else(|| DatasetError::InvalidDate {
        commit: raw.commit_hash.clone(),
        value: raw.date.clone(),
    })?;

    let before = raw.code_changes.len();
    let raw_changes = fuse_renames(raw.code_changes);
    if raw_changes.len() < before {
        debug!(
            commit = %raw.commit_hash,
            fused = before - raw_changes.len(),
            "Fused ADD/DELETE pairs into renames"
        );
    }

    let code_changes = raw_changes
        .into_iter()
        .map(|cc| cc.into_code_change(&raw.commit_hash))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ChangeSet {
        commit_hash: raw.commit_hash,
        author: raw.author,
        date,
        issues: raw.issues,
        code_changes,
        num_files_in_project: raw.num_current_files,
    })
}

/// Parse a commit timestamp and truncate it to its day.
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    NaiveDateTime::parse_from_str(value, DATE_FORMAT)
        .map(|dt| dt.date())
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.naive_utc().date()))
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(path: &str, kind: ChangeType, added: Option<u64>, deleted: Option<u64>) -> RawCodeChange {
        RawCodeChange {
            file_path: path.into(),
            change_type: kind,
            old_file_path: None,
            num_added: added,
            num_deleted: deleted,
        }
    }

    #[test]
    fn add_delete_pair_fuses_into_rename() {
        let fused = fuse_renames(vec![
            raw("x/New.java", ChangeType::Add, Some(12), Some(0)),
            raw("y/Other.java", ChangeType::Modify, Some(1), Some(1)),
            raw("x/Old.java", ChangeType::Delete, Some(0), Some(12)),
        ]);
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].change_type, ChangeType::Rename);
        assert_eq!(fused[0].file_path, "x/New.java");
        assert_eq!(fused[0].old_file_path.as_deref(), Some("x/Old.java"));
        assert_eq!(fused[1].change_type, ChangeType::Modify);
    }

    #[test]
    fn same_file_name_partner_is_preferred() {
        let fused = fuse_renames(vec![
            raw("a/Util.java", ChangeType::Add, Some(5), Some(0)),
            raw("a/Other.java", ChangeType::Delete, Some(0), Some(5)),
            raw("b/Util.java", ChangeType::Delete, Some(0), Some(5)),
        ]);
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].old_file_path.as_deref(), Some("b/Util.java"));
        assert_eq!(fused[1].file_path, "a/Other.java");
        assert_eq!(fused[1].change_type, ChangeType::Delete);
    }

    #[test]
    fn delete_first_pair_also_fuses() {
        let fused = fuse_renames(vec![
            raw("a/Util.java", ChangeType::Delete, Some(0), Some(7)),
            raw("b/Util.java", ChangeType::Add, Some(7), Some(0)),
        ]);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].file_path, "b/Util.java");
        assert_eq!(fused[0].old_file_path.as_deref(), Some("a/Util.java"));
    }

    #[test]
    fn mismatched_line_counts_stay_separate() {
        let fused = fuse_renames(vec![
            raw("a/Util.java", ChangeType::Add, Some(7), Some(0)),
            raw("b/Util.java", ChangeType::Delete, Some(0), Some(8)),
        ]);
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].change_type, ChangeType::Add);
        assert_eq!(fused[1].change_type, ChangeType::Delete);
    }

    #[test]
    fn parses_dataset_json() {
        let json = r#"{"change_sets": [
            {"commit_hash": "CS1", "author": "d1", "date": "2019-01-15T12:00:00Z",
             "issues": ["I1"], "num_current_files": 3,
             "code_changes": [{"file_path": "F1", "change_type": "ADD"},
                              {"file_path": "F2", "change_type": "RENAME", "old_file_path": "F0"}]},
            {"commit_hash": "CS0", "author": "d2", "date": "2018-11-17T23:59:59Z",
             "issues": [], "num_current_files": 1,
             "code_changes": [{"file_path": "F0", "change_type": "ADD"}]}
        ]}"#;
        let dataset = Dataset::from_json_str(json).unwrap();
        assert_eq!(dataset.len(), 2);
        let first = &dataset.change_sets()[0];
        assert_eq!(first.commit_hash, "CS0");
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2018, 11, 17).unwrap());
        let second = &dataset.change_sets()[1];
        assert_eq!(
            second.code_changes[1],
            CodeChange::Rename {
                old_path: "F0".into(),
                path: "F2".into()
            }
        );
    }

    #[test]
    fn rename_without_old_path_is_rejected() {
        let json = r#"{"change_sets": [
            {"commit_hash": "CS1", "author": "d1", "date": "2019-01-15T12:00:00Z",
             "issues": [], "num_current_files": 1,
             "code_changes": [{"file_path": "F1", "change_type": "RENAME"}]}
        ]}"#;
        let err = Dataset::from_json_str(json).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidChange { .. }));
    }

    #[test]
    fn empty_code_changes_are_rejected() {
        let json = r#"{"change_sets": [
            {"commit_hash": "CS1", "author": "d1", "date": "2019-01-15T12:00:00Z",
             "issues": [], "num_current_files": 1, "code_changes": []}
        ]}"#;
        let err = Dataset::from_json_str(json).unwrap_err();
        assert!(matches!(err, DatasetError::EmptyChangeSet(_)));
    }

    #[test]
    fn bad_date_is_rejected() {
        let json = r#"{"change_sets": [
            {"commit_hash": "CS1", "author": "d1", "date": "yesterday",
             "issues": [], "num_current_files": 1,
             "code_changes": [{"file_path": "F1", "change_type": "ADD"}]}
        ]}"#;
        let err = Dataset::from_json_str(json).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidDate { .. }));
    }

    #[test]
    fn parse_day_accepts_common_formats() {
        let day = NaiveDate::from_ymd_opt(2020, 3, 4).unwrap();
        assert_eq!(parse_day("2020-03-04T10:11:12Z"), Some(day));
        assert_eq!(parse_day("2020-03-04T10:11:12+00:00"), Some(day));
        assert_eq!(parse_day("2020-03-04"), Some(day));
        assert_eq!(parse_day("04/03/2020"), None);
    }
}
