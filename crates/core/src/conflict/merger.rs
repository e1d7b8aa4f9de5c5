//! Three-way merge engine.
//!
//! Uses the `diffy` crate to perform line-based three-way merges between a
//! base, "ours" (current) and "theirs" (incoming) version of a file. When the
//! merge is not clean the output carries standard two-way conflict markers
//! and their line ranges, ready for a [`ConflictSectionModel`].

use diffy::{ConflictStyle, MergeOptions};
use tracing::{debug, info};

use super::markers::{scan_markers, MarkerRange};
use super::sections::ConflictSectionModel;

/// The result of a three-way merge attempt.
#[derive(Debug, Clone)]
pub struct MergeResult {
    /// The merged content (contains conflict markers if `has_conflicts`).
    pub merged_content: String,
    /// Whether the merge completed without conflicts.
    pub has_conflicts: bool,
    /// Line ranges of the conflict blocks within `merged_content`.
    pub conflict_markers: Vec<MarkerRange>,
}

impl MergeResult {
    fn clean(content: &str) -> Self {
        Self {
            merged_content: content.to_string(),
            has_conflicts: false,
            conflict_markers: Vec::new(),
        }
    }

    /// A parsed section model over the merged content.
    pub fn section_model(&self) -> ConflictSectionModel {
        ConflictSectionModel::parsed(&self.merged_content, self.conflict_markers.clone())
    }
}

/// Stateless three-way merge engine.
pub struct Merger;

impl Merger {
    /// Merge `ours` and `theirs`, both derived from `base`.
    ///
    /// Always returns merged content; `has_conflicts` tells whether it
    /// contains conflict blocks.
    pub fn three_way_merge(base: &str, ours: &str, theirs: &str) -> MergeResult {
        info!("performing three-way merge");

        // Fast path: if either side is identical to base, the other side wins cleanly.
        if ours == base {
            debug!("ours == base, theirs wins cleanly");
            return MergeResult::clean(theirs);
        }
        if theirs == base || ours == theirs {
            debug!("theirs unchanged or identical to ours, ours wins cleanly");
            return MergeResult::clean(ours);
        }

        let mut options = MergeOptions::new();
        options.set_conflict_style(ConflictStyle::Merge);
        match options.merge(base, ours, theirs) {
            Ok(merged) => {
                debug!("clean three-way merge");
                MergeResult::clean(&merged)
            }
            Err(conflicted) => {
                let conflict_markers = scan_markers(&conflicted);
                debug!(blocks = conflict_markers.len(), "merge produced conflicts");
                MergeResult {
                    merged_content: conflicted,
                    has_conflicts: true,
                    conflict_markers,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::sections::Side;

    #[test]
    fn test_identical_files() {
        let base = "line1\nline2\nline3\n";
        let result = Merger::three_way_merge(base, base, base);
        assert!(!result.has_conflicts);
        assert!(result.conflict_markers.is_empty());
        assert_eq!(result.merged_content, base);
    }

    #[test]
    fn test_only_one_side_changed() {
        let base = "line1\nline2\nline3\n";
        let changed = "line1\nmodified\nline3\n";

        let result = Merger::three_way_merge(base, changed, base);
        assert!(!result.has_conflicts);
        assert_eq!(result.merged_content, changed);

        let result = Merger::three_way_merge(base, base, changed);
        assert!(!result.has_conflicts);
        assert_eq!(result.merged_content, changed);
    }

    #[test]
    fn test_non_overlapping_changes() {
        let base = "aaa\nbbb\nccc\nddd\neee\n";
        let ours = "AAA\nbbb\nccc\nddd\neee\n";
        let theirs = "aaa\nbbb\nccc\nddd\nEEE\n";
        let result = Merger::three_way_merge(base, ours, theirs);
        assert!(!result.has_conflicts);
        assert!(result.merged_content.contains("AAA"));
        assert!(result.merged_content.contains("EEE"));
    }

    #[test]
    fn test_conflicting_changes_feed_section_model() {
        let base = "line1\noriginal\nline3\n";
        let ours = "line1\nours_version\nline3\n";
        let theirs = "line1\ntheirs_version\nline3\n";

        let result = Merger::three_way_merge(base, ours, theirs);
        assert!(result.has_conflicts);
        assert_eq!(result.conflict_markers.len(), 1);

        let mut model = result.section_model();
        assert!(model.defects().is_empty());
        assert_eq!(model.sections()[0].current_content, "ours_version");
        assert_eq!(model.sections()[0].incoming_content, "theirs_version");

        model.select_side(0, Side::Incoming).unwrap();
        assert_eq!(model.regenerate(), theirs);
    }

    #[test]
    fn test_same_change_both_sides() {
        let result = Merger::three_way_merge("old\n", "new\n", "new\n");
        assert!(!result.has_conflicts);
        assert_eq!(result.merged_content, "new\n");
    }
}
