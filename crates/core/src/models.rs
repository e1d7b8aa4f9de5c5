//! Domain model types shared by the merge orchestrator, the hosting client
//! and the CLI.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Branches
// ---------------------------------------------------------------------------

/// Local and remote branch names known for a repository.
///
/// Remote names are stored without their `<remote>/` prefix and never
/// include symbolic references such as `HEAD`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSet {
    pub local: BTreeSet<String>,
    pub remote: BTreeSet<String>,
    pub current: Option<String>,
}

/// Whether `name` denotes a symbolic pointer (`HEAD`, `origin/HEAD`,
/// `refs/remotes/origin/HEAD`) rather than a mergeable branch.
pub fn is_symbolic_ref(name: &str) -> bool {
    let name = name.trim();
    name == "HEAD" || name.ends_with("/HEAD")
}

/// Strip a leading `<remote>/` qualifier (and any `refs/remotes/` or
/// `refs/heads/` namespace) from a branch name.
pub fn strip_remote_prefix<'a>(name: &'a str, remote: &str) -> &'a str {
    let name = name.strip_prefix("refs/heads/").unwrap_or(name);
    let name = name.strip_prefix("refs/remotes/").unwrap_or(name);
    match name.strip_prefix(remote) {
        Some(rest) if rest.starts_with('/') => &rest[1..],
        _ => name,
    }
}

// ---------------------------------------------------------------------------
// Merge requests
// ---------------------------------------------------------------------------

/// Payload for opening a merge/pull request on the hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMergeRequest {
    pub title: String,
    pub description: String,
    /// Source branch, without remote prefix.
    pub head: String,
    /// Target branch, without remote prefix.
    pub base: String,
}

/// The hosting service's view of a newly created merge request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedMergeRequest {
    pub number: u64,
    pub url: String,
}

/// Result of a merge request submission. Failures are data, never errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// The request was created.
    Success { number: u64, url: String },
    /// A local merge attempt found conflicting files.
    Conflict { message: String, files: Vec<String> },
    /// Validation or the remote API rejected the request.
    Error { message: String },
}

impl SubmitOutcome {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Human-readable one-line summary.
    pub fn message(&self) -> String {
        match self {
            Self::Success { number, url } => format!("created merge request #{} ({})", number, url),
            Self::Conflict { message, .. } => message.clone(),
            Self::Error { message } => message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_symbolic_ref() {
        assert!(is_symbolic_ref("HEAD"));
        assert!(is_symbolic_ref("origin/HEAD"));
        assert!(is_symbolic_ref("refs/remotes/origin/HEAD"));
        assert!(!is_symbolic_ref("main"));
        assert!(!is_symbolic_ref("HEADLINE"));
        assert!(!is_symbolic_ref("feature/HEADER"));
    }

    #[test]
    fn test_strip_remote_prefix() {
        assert_eq!(strip_remote_prefix("origin/main", "origin"), "main");
        assert_eq!(strip_remote_prefix("origin/feature/x", "origin"), "feature/x");
        assert_eq!(strip_remote_prefix("refs/remotes/origin/dev", "origin"), "dev");
        assert_eq!(strip_remote_prefix("refs/heads/topic", "origin"), "topic");
        assert_eq!(strip_remote_prefix("main", "origin"), "main");
        assert_eq!(strip_remote_prefix("originals", "origin"), "originals");
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = SubmitOutcome::Success {
            number: 7,
            url: "https://example.com/pr/7".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["kind"], "success");
        assert_eq!(json["number"], 7);
        assert!(outcome.is_success());
        assert!(outcome.message().contains("#7"));
    }
}
