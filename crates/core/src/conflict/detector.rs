//! Conflict detection logic.
//!
//! Given the changes made on each side of a merge (both measured from the
//! common ancestor), the detector identifies files touched on both sides and
//! classifies how they collide.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::diff::{DiffEntry, FileStatus};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Categorisation of a conflict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Both sides changed (or added) the same file with different content.
    Content,
    /// One side edited, the other deleted.
    EditDelete,
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Content => write!(f, "content"),
            Self::EditDelete => write!(f, "edit_delete"),
        }
    }
}

/// A file changed on both sides of a merge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileConflict {
    pub path: String,
    pub conflict_type: ConflictType,
    /// Common ancestor content, absent when the file was added on both sides.
    pub base_content: Option<String>,
    /// Current-side content, absent when deleted there.
    pub ours_content: Option<String>,
    /// Incoming-side content, absent when deleted there.
    pub theirs_content: Option<String>,
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Stateless conflict detector that compares two sets of file changes.
pub struct ConflictDetector;

impl ConflictDetector {
    /// Compare base→ours and base→theirs change sets and return the files
    /// that collide, ordered by path.
    ///
    /// Identical changes on both sides and deletions on both sides are not
    /// conflicts.
    pub fn detect(ours: &[DiffEntry], theirs: &[DiffEntry]) -> Vec<FileConflict> {
        info!(
            ours_count = ours.len(),
            theirs_count = theirs.len(),
            "detecting conflicts"
        );

        let theirs_by_path: HashMap<&str, &DiffEntry> =
            theirs.iter().map(|c| (c.file.as_str(), c)).collect();

        let mut conflicts = Vec::new();
        for our_change in ours {
            let Some(their_change) = theirs_by_path.get(our_change.file.as_str()) else {
                continue;
            };
            let Some(conflict_type) = classify_conflict(our_change, their_change) else {
                continue;
            };
            debug!(path = %our_change.file, conflict_type = %conflict_type, "conflict detected");
            conflicts.push(FileConflict {
                path: our_change.file.clone(),
                conflict_type,
                base_content: our_change.old_content.clone(),
                ours_content: our_change.new_content.clone(),
                theirs_content: their_change.new_content.clone(),
            });
        }

        conflicts.sort_by(|a, b| a.path.cmp(&b.path));
        info!(count = conflicts.len(), "conflict detection complete");
        conflicts
    }
}

/// Classify what kind of conflict exists between two changes to the same path.
fn classify_conflict(ours: &DiffEntry, theirs: &DiffEntry) -> Option<ConflictType> {
    use FileStatus::*;

    match (ours.status, theirs.status) {
        // Both deleted -- no conflict.
        (Deleted, Deleted) => None,

        // One side modified/added, the other deleted.
        (Deleted, _) | (_, Deleted) => Some(ConflictType::EditDelete),

        // Same resulting content on both sides merges trivially.
        _ if ours.new_content == theirs.new_content => None,

        _ => Some(ConflictType::Content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(path: &str, status: FileStatus, old: Option<&str>, new: Option<&str>) -> DiffEntry {
        DiffEntry {
            file: path.to_string(),
            status,
            old_content: old.map(str::to_string),
            new_content: new.map(str::to_string),
            diff: String::new(),
        }
    }

    fn modified(path: &str, new: &str) -> DiffEntry {
        change(path, FileStatus::Modified, Some("base"), Some(new))
    }

    #[test]
    fn test_no_conflicts_disjoint() {
        let ours = vec![modified("a.rs", "x")];
        let theirs = vec![modified("b.rs", "y")];
        assert!(ConflictDetector::detect(&ours, &theirs).is_empty());
    }

    #[test]
    fn test_content_conflict() {
        let ours = vec![modified("main.rs", "ours")];
        let theirs = vec![modified("main.rs", "theirs")];
        let conflicts = ConflictDetector::detect(&ours, &theirs);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::Content);
        assert_eq!(conflicts[0].base_content.as_deref(), Some("base"));
        assert_eq!(conflicts[0].theirs_content.as_deref(), Some("theirs"));
    }

    #[test]
    fn test_identical_change_is_not_a_conflict() {
        let ours = vec![modified("main.rs", "same")];
        let theirs = vec![modified("main.rs", "same")];
        assert!(ConflictDetector::detect(&ours, &theirs).is_empty());
    }

    #[test]
    fn test_edit_delete_conflict() {
        let ours = vec![modified("file.rs", "edited")];
        let theirs = vec![change("file.rs", FileStatus::Deleted, Some("base"), None)];
        let conflicts = ConflictDetector::detect(&ours, &theirs);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::EditDelete);
        assert!(conflicts[0].theirs_content.is_none());
    }

    #[test]
    fn test_both_deleted_no_conflict() {
        let ours = vec![change("file.rs", FileStatus::Deleted, Some("b"), None)];
        let theirs = vec![change("file.rs", FileStatus::Deleted, Some("b"), None)];
        assert!(ConflictDetector::detect(&ours, &theirs).is_empty());
    }

    #[test]
    fn test_add_add_conflict() {
        let ours = vec![change("new.rs", FileStatus::Added, None, Some("one"))];
        let theirs = vec![change("new.rs", FileStatus::Added, None, Some("two"))];
        let conflicts = ConflictDetector::detect(&ours, &theirs);
        assert_eq!(conflicts[0].conflict_type, ConflictType::Content);
        assert!(conflicts[0].base_content.is_none());
    }

    #[test]
    fn test_multiple_conflicts_sorted() {
        let ours = vec![
            modified("c.rs", "1"),
            change("b.rs", FileStatus::Deleted, Some("b"), None),
            modified("a.rs", "1"),
        ];
        let theirs = vec![
            modified("a.rs", "2"),
            modified("b.rs", "2"),
            modified("d.rs", "2"),
        ];
        let conflicts = ConflictDetector::detect(&ours, &theirs);
        let paths: Vec<&str> = conflicts.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["a.rs", "b.rs"]);
    }
}
