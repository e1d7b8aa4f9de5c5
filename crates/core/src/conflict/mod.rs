//! Conflict detection, three-way merging, and per-section resolution.
//!
//! The conflict subsystem is responsible for:
//! 1. **Detection** -- finding files changed on both sides of a merge.
//! 2. **Merging** -- attempting automatic three-way merges where possible,
//!    emitting standard conflict markers where not.
//! 3. **Marker scanning** -- locating `<<<<<<<` / `=======` / `>>>>>>>`
//!    blocks in merged text.
//! 4. **Resolution** -- tracking a per-section choice and regenerating the
//!    resolved document.
//!
//! The section model never looks at marker text itself; it trusts the line
//! ranges it is given, which normally come from [`scan_markers`].

pub mod detector;
pub mod markers;
pub mod merger;
pub mod sections;

pub use detector::{ConflictDetector, ConflictType, FileConflict};
pub use markers::{scan_markers, MarkerRange};
pub use merger::{MergeResult, Merger};
pub use sections::{ConflictSection, ConflictSectionModel, ParseDefect, Side};
