//! Local Git repository access via `git2`.

use std::collections::BTreeSet;
use std::path::Path;

use git2::{
    BranchType, Cred, ErrorCode, FetchOptions, ObjectType, RemoteCallbacks, Repository, Tree,
    TreeWalkMode, TreeWalkResult,
};
use tracing::{debug, info, instrument};

use crate::errors::GitError;

/// High-level Git client wrapping a `git2::Repository`.
pub struct GitClient {
    repo: Repository,
}

impl GitClient {
    /// Open an existing Git repository at `repo_path`.
    ///
    /// Parent directories are searched, so a path inside a working copy works.
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Result<Self, GitError> {
        let path = repo_path.as_ref();
        info!(path = %path.display(), "opening git repository");
        let repo = Repository::discover(path)
            .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;
        Ok(Self { repo })
    }

    /// Fetch from a named remote.
    #[instrument(skip(self, token))]
    pub fn fetch(&self, remote_name: &str, token: Option<&str>) -> Result<(), GitError> {
        info!(remote = remote_name, "fetching");
        let mut remote = self
            .repo
            .find_remote(remote_name)
            .map_err(|_| GitError::RemoteNotFound(remote_name.to_string()))?;
        let mut callbacks = RemoteCallbacks::new();
        if let Some(tok) = token {
            let tok = tok.to_string();
            callbacks.credentials(move |_url, _username, _allowed| {
                Cred::userpass_plaintext("x-access-token", &tok)
            });
        }
        let mut fetch_opts = FetchOptions::new();
        fetch_opts.remote_callbacks(callbacks);
        remote.fetch(&[] as &[&str], Some(&mut fetch_opts), None)?;
        debug!("fetch completed");
        Ok(())
    }

    /// URL configured for `remote_name`, if any.
    pub fn remote_url(&self, remote_name: &str) -> Result<Option<String>, GitError> {
        let remote = self
            .repo
            .find_remote(remote_name)
            .map_err(|_| GitError::RemoteNotFound(remote_name.to_string()))?;
        Ok(remote.url().map(str::to_string))
    }

    /// List all local branch names.
    pub fn list_local_branches(&self) -> Result<BTreeSet<String>, GitError> {
        self.branch_names(BranchType::Local, None)
    }

    /// Remote-tracking branches of `remote_name`, as `<remote>/<branch>`.
    pub fn list_remote_branches(&self, remote_name: &str) -> Result<BTreeSet<String>, GitError> {
        self.branch_names(BranchType::Remote, Some(remote_name))
    }

    fn branch_names(&self, kind: BranchType, remote: Option<&str>) -> Result<BTreeSet<String>, GitError> {
        let prefix = remote.map(|r| format!("{}/", r));
        let mut names = BTreeSet::new();
        for branch_result in self.repo.branches(Some(kind))? {
            let (branch, _) = branch_result?;
            let Some(name) = branch.name()? else { continue };
            if prefix.as_deref().map_or(true, |p| name.starts_with(p)) {
                names.insert(name.to_string());
            }
        }
        Ok(names)
    }

    /// Short name of the checked-out branch; `None` when detached or unborn.
    pub fn current_branch(&self) -> Result<Option<String>, GitError> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        };
        if !head.is_branch() {
            return Ok(None);
        }
        Ok(head.shorthand().map(str::to_string))
    }

    /// Resolve any revision expression to a commit SHA.
    pub fn resolve_commit(&self, revision: &str) -> Result<String, GitError> {
        let commit = self
            .repo
            .revparse_single(revision)
            .and_then(|obj| obj.peel_to_commit())
            .map_err(|_| GitError::RevisionNotFound(revision.to_string()))?;
        Ok(commit.id().to_string())
    }

    fn tree_at(&self, revision: &str) -> Result<Tree<'_>, GitError> {
        self.repo
            .revparse_single(revision)
            .and_then(|obj| obj.peel_to_tree())
            .map_err(|_| GitError::RevisionNotFound(revision.to_string()))
    }

    /// Every blob path reachable from `revision`'s tree.
    pub fn list_files(&self, revision: &str) -> Result<BTreeSet<String>, GitError> {
        let tree = self.tree_at(revision)?;
        let mut files = BTreeSet::new();
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                if let Some(name) = entry.name() {
                    files.insert(format!("{}{}", root, name));
                }
            }
            TreeWalkResult::Ok
        })?;
        debug!(revision, count = files.len(), "listed files");
        Ok(files)
    }

    /// Raw content of `path` at `revision`; `None` if no blob lives there.
    pub fn read_blob(&self, revision: &str, path: &str) -> Result<Option<Vec<u8>>, GitError> {
        let tree = self.tree_at(revision)?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if entry.kind() != Some(ObjectType::Blob) {
            return Ok(None);
        }
        let blob = entry.to_object(&self.repo)?.peel_to_blob()?;
        Ok(Some(blob.content().to_vec()))
    }

    /// Best common ancestor of two revisions, if they share history.
    pub fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>, GitError> {
        let a = git2::Oid::from_str(&self.resolve_commit(a)?)?;
        let b = git2::Oid::from_str(&self.resolve_commit(b)?)?;
        match self.repo.merge_base(a, b) {
            Ok(oid) => Ok(Some(oid.to_string())),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use git2::Signature;

    /// Write `files` into the working tree and commit them on HEAD.
    pub(crate) fn commit_files(repo: &Repository, files: &[(&str, &str)], message: &str) -> git2::Oid {
        let workdir = repo.workdir().unwrap().to_path_buf();
        let mut index = repo.index().unwrap();
        for (path, content) in files {
            let full = workdir.join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(&full, content).unwrap();
            index.add_path(Path::new(path)).unwrap();
        }
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Test", "test@test.com").unwrap();
        let parent = repo.head().ok().map(|h| h.peel_to_commit().unwrap());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents).unwrap()
    }

    #[test]
    fn test_list_and_read_files() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let oid = commit_files(&repo, &[("README.md", "hi\n"), ("src/lib.rs", "fn a() {}\n")], "init");

        let client = GitClient::new(dir.path()).unwrap();
        let sha = oid.to_string();
        let files: Vec<String> = client.list_files(&sha).unwrap().into_iter().collect();
        assert_eq!(files, vec!["README.md", "src/lib.rs"]);
        assert_eq!(client.read_blob("HEAD", "src/lib.rs").unwrap().unwrap(), b"fn a() {}\n");
        assert!(client.read_blob("HEAD", "missing.txt").unwrap().is_none());
        assert!(client.read_blob("HEAD", "src").unwrap().is_none());
    }

    #[test]
    fn test_branches_and_current() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let client = GitClient::new(dir.path()).unwrap();
        assert_eq!(client.current_branch().unwrap(), None);

        let oid = commit_files(&repo, &[("f.txt", "c")], "init");
        let commit = repo.find_commit(oid).unwrap();
        repo.branch("feature", &commit, false).unwrap();

        let current = client.current_branch().unwrap().unwrap();
        let local = client.list_local_branches().unwrap();
        assert!(local.contains("feature"));
        assert!(local.contains(&current));
        assert!(client.list_remote_branches("origin").unwrap().is_empty());
    }

    #[test]
    fn test_merge_base() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let base = commit_files(&repo, &[("f.txt", "1")], "base");
        let next = commit_files(&repo, &[("f.txt", "2")], "next");

        let client = GitClient::new(dir.path()).unwrap();
        let found = client.merge_base(&base.to_string(), &next.to_string()).unwrap();
        assert_eq!(found, Some(base.to_string()));
    }

    #[test]
    fn test_unknown_revision_and_remote() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_files(&repo, &[("f.txt", "1")], "init");
        let client = GitClient::new(dir.path()).unwrap();
        assert!(matches!(client.list_files("nope"), Err(GitError::RevisionNotFound(_))));
        assert!(matches!(client.fetch("origin", None), Err(GitError::RemoteNotFound(_))));
    }

    #[test]
    fn test_repo_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(GitClient::new(&missing), Err(GitError::RepositoryNotFound(_))));
    }
}
