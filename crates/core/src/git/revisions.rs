//! [`RevisionProvider`] backed by a local repository.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{instrument, warn};

use super::client::GitClient;
use crate::errors::{GitError, ProviderError};
use crate::provider::RevisionProvider;

/// Serves revisions, blobs and branches from a [`GitClient`].
///
/// `git2::Repository` is not `Sync`, so the client sits behind an async
/// mutex and every call takes the lock for its duration.
#[derive(Clone)]
pub struct GitRevisionProvider {
    client: Arc<tokio::sync::Mutex<GitClient>>,
    token: Option<String>,
}

impl GitRevisionProvider {
    pub fn new(client: GitClient) -> Self {
        Self {
            client: Arc::new(tokio::sync::Mutex::new(client)),
            token: None,
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GitError> {
        Ok(Self::new(GitClient::new(path)?))
    }

    /// Token used for authenticated fetches.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }
}

fn revision_error(err: GitError) -> ProviderError {
    match err {
        GitError::RevisionNotFound(rev) => ProviderError::RevisionNotFound(rev),
        other => ProviderError::Git(other),
    }
}

#[async_trait]
impl RevisionProvider for GitRevisionProvider {
    async fn list_files(&self, revision: &str) -> Result<BTreeSet<String>, ProviderError> {
        let client = self.client.lock().await;
        client.list_files(revision).map_err(revision_error)
    }

    async fn read_blob(&self, revision: &str, path: &str) -> Result<Option<Vec<u8>>, ProviderError> {
        let client = self.client.lock().await;
        client.read_blob(revision, path).map_err(|e| match e {
            GitError::RevisionNotFound(rev) => ProviderError::RevisionNotFound(rev),
            other => ProviderError::ReadFailed {
                revision: revision.to_string(),
                path: path.to_string(),
                detail: other.to_string(),
            },
        })
    }

    async fn list_local_branches(&self) -> Result<BTreeSet<String>, ProviderError> {
        let client = self.client.lock().await;
        Ok(client.list_local_branches()?)
    }

    async fn list_remote_branches(&self, remote: &str) -> Result<BTreeSet<String>, ProviderError> {
        let client = self.client.lock().await;
        Ok(client.list_remote_branches(remote)?)
    }

    async fn current_branch(&self) -> Result<Option<String>, ProviderError> {
        let client = self.client.lock().await;
        Ok(client.current_branch()?)
    }

    #[instrument(skip(self))]
    async fn fetch_remote(&self, remote: &str) -> Result<(), ProviderError> {
        let client = self.client.lock().await;
        client.fetch(remote, self.token.as_deref()).map_err(|e| {
            warn!(error = %e, "fetch failed");
            ProviderError::FetchFailed {
                remote: remote.to_string(),
                detail: e.to_string(),
            }
        })
    }
}
