//! gitdesk core library.
//!
//! In-memory building blocks for a repository browser: a path tree over the
//! files of a revision, blob-level commit comparison, conflict sections with
//! per-section resolution, and merge request orchestration. Repository and
//! hosting access go through the traits in [`provider`], with git2 and GitHub
//! implementations in [`git`].

pub mod config;
pub mod conflict;
pub mod diff;
pub mod errors;
pub mod generation;
pub mod git;
pub mod merge;
pub mod models;
pub mod provider;
pub mod tree;

// Re-exports for convenience.
pub use config::AppConfig;
pub use conflict::{ConflictSection, ConflictSectionModel, Side};
pub use diff::{DiffEngine, DiffEntry, DiffReport};
pub use merge::{MergeOrchestrator, MergeRequestDraft};
pub use models::SubmitOutcome;
pub use provider::{HostingApi, RevisionProvider};
pub use tree::{build_tree, TreeNode};
