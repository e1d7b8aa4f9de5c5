//! Capabilities consumed from the outside world.
//!
//! The core never talks to a repository or a hosting service directly; it is
//! handed implementations of these traits. [`crate::git::GitRevisionProvider`]
//! and [`crate::git::GitHubClient`] are the production implementations.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::{GitHubError, ProviderError};
use crate::models::{CreatedMergeRequest, NewMergeRequest};

/// Read-only access to repository snapshots and branch metadata.
///
/// Implementations must be safe to call concurrently.
#[async_trait]
pub trait RevisionProvider: Send + Sync {
    /// All file paths (blobs only) reachable at `revision`.
    async fn list_files(&self, revision: &str) -> Result<BTreeSet<String>, ProviderError>;

    /// Content of `path` at `revision`, `None` if the path does not exist there.
    async fn read_blob(&self, revision: &str, path: &str) -> Result<Option<Vec<u8>>, ProviderError>;

    async fn list_local_branches(&self) -> Result<BTreeSet<String>, ProviderError>;

    /// Remote-tracking branch names for `remote`, as the provider reports them
    /// (they may still carry the `<remote>/` prefix).
    async fn list_remote_branches(&self, remote: &str) -> Result<BTreeSet<String>, ProviderError>;

    async fn current_branch(&self) -> Result<Option<String>, ProviderError>;

    /// Best-effort synchronisation of remote-tracking refs.
    async fn fetch_remote(&self, remote: &str) -> Result<(), ProviderError>;
}

/// Code-hosting API able to open merge/pull requests.
#[async_trait]
pub trait HostingApi: Send + Sync {
    async fn create_merge_request(
        &self,
        owner: &str,
        repo: &str,
        request: &NewMergeRequest,
    ) -> Result<CreatedMergeRequest, GitHubError>;
}

// ---------------------------------------------------------------------------
// In-memory provider
// ---------------------------------------------------------------------------

/// A [`RevisionProvider`] backed by plain maps, for tests and previews.
#[derive(Debug, Default, Clone)]
pub struct MemoryProvider {
    revisions: HashMap<String, BTreeMap<String, Vec<u8>>>,
    unreadable: BTreeSet<(String, String)>,
    local: BTreeSet<String>,
    remote: BTreeSet<String>,
    current: Option<String>,
    fetch_fails: bool,
    fetches: Arc<AtomicUsize>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file to a revision, creating the revision if needed.
    pub fn with_file(mut self, revision: &str, path: &str, content: impl AsRef<[u8]>) -> Self {
        self.revisions
            .entry(revision.to_string())
            .or_default()
            .insert(path.to_string(), content.as_ref().to_vec());
        self
    }

    /// Register an empty revision.
    pub fn with_revision(mut self, revision: &str) -> Self {
        self.revisions.entry(revision.to_string()).or_default();
        self
    }

    /// Make reads of `path` at `revision` fail (the path is still listed).
    pub fn with_unreadable(mut self, revision: &str, path: &str) -> Self {
        self.unreadable.insert((revision.to_string(), path.to_string()));
        self
    }

    pub fn with_local_branches(mut self, names: &[&str]) -> Self {
        self.local = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_remote_branches(mut self, names: &[&str]) -> Self {
        self.remote = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_current_branch(mut self, name: &str) -> Self {
        self.current = Some(name.to_string());
        self
    }

    pub fn with_failing_fetch(mut self) -> Self {
        self.fetch_fails = true;
        self
    }

    /// Number of `fetch_remote` calls made so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn revision(&self, revision: &str) -> Result<&BTreeMap<String, Vec<u8>>, ProviderError> {
        self.revisions
            .get(revision)
            .ok_or_else(|| ProviderError::RevisionNotFound(revision.to_string()))
    }
}

#[async_trait]
impl RevisionProvider for MemoryProvider {
    async fn list_files(&self, revision: &str) -> Result<BTreeSet<String>, ProviderError> {
        Ok(self.revision(revision)?.keys().cloned().collect())
    }

    async fn read_blob(&self, revision: &str, path: &str) -> Result<Option<Vec<u8>>, ProviderError> {
        if self
            .unreadable
            .contains(&(revision.to_string(), path.to_string()))
        {
            return Err(ProviderError::ReadFailed {
                revision: revision.to_string(),
                path: path.to_string(),
                detail: "simulated read failure".into(),
            });
        }
        Ok(self.revision(revision)?.get(path).cloned())
    }

    async fn list_local_branches(&self) -> Result<BTreeSet<String>, ProviderError> {
        Ok(self.local.clone())
    }

    async fn list_remote_branches(&self, _remote: &str) -> Result<BTreeSet<String>, ProviderError> {
        Ok(self.remote.clone())
    }

    async fn current_branch(&self) -> Result<Option<String>, ProviderError> {
        Ok(self.current.clone())
    }

    async fn fetch_remote(&self, remote: &str) -> Result<(), ProviderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fetch_fails {
            return Err(ProviderError::FetchFailed {
                remote: remote.to_string(),
                detail: "network unreachable".into(),
            });
        }
        Ok(())
    }
}
