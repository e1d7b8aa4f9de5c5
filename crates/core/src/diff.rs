//! Commit-to-commit blob comparison.
//!
//! [`DiffEngine::compare`] lists both revisions through a
//! [`RevisionProvider`], classifies every path as added, deleted or modified,
//! drops unchanged files and renders a line-oriented unified diff per entry.

use std::collections::BTreeSet;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::errors::ProviderError;
use crate::generation::GenerationCounter;
use crate::provider::RevisionProvider;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How a file changed between the two revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Added,
    Deleted,
    Modified,
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Deleted => write!(f, "deleted"),
            Self::Modified => write!(f, "modified"),
        }
    }
}

/// One changed file.
///
/// `Added` has only `new_content`, `Deleted` only `old_content`, `Modified`
/// both (and they differ).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub file: String,
    pub status: FileStatus,
    pub old_content: Option<String>,
    pub new_content: Option<String>,
    pub diff: String,
}

/// Added/removed line counts of a rendered diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub additions: usize,
    pub deletions: usize,
}

impl DiffEntry {
    pub fn stats(&self) -> DiffStats {
        let mut stats = DiffStats::default();
        // Skip the `---`/`+++` header pair.
        for line in self.diff.lines().skip(2) {
            if line.starts_with('+') {
                stats.additions += 1;
            } else if line.starts_with('-') {
                stats.deletions += 1;
            }
        }
        stats
    }
}

/// Line diff strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAlgorithm {
    /// Walk both sides in lockstep; a mismatch is one removal plus one
    /// addition. Cheap, but an inserted line misaligns everything after it.
    #[default]
    Pairwise,
    /// Minimal line edit script.
    Lcs,
}

impl std::str::FromStr for DiffAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pairwise" => Ok(Self::Pairwise),
            "lcs" => Ok(Self::Lcs),
            other => Err(format!("unknown diff algorithm '{}'", other)),
        }
    }
}

/// A blob that could not be read and was compared as empty content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffWarning {
    pub revision: String,
    pub path: String,
    pub detail: String,
}

/// Result of a comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    /// Changed files, ascending by path.
    pub entries: Vec<DiffEntry>,
    /// Unreadable blobs. Entries for these paths may report a spurious
    /// change to or from empty content.
    pub warnings: Vec<DiffWarning>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Compares two revisions of one repository.
pub struct DiffEngine<'a> {
    provider: &'a dyn RevisionProvider,
    algorithm: DiffAlgorithm,
    parallel_reads: bool,
}

impl<'a> DiffEngine<'a> {
    pub fn new(provider: &'a dyn RevisionProvider) -> Self {
        Self {
            provider,
            algorithm: DiffAlgorithm::default(),
            parallel_reads: true,
        }
    }

    pub fn with_algorithm(mut self, algorithm: DiffAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Read blobs for different paths concurrently (default) or one by one.
    pub fn with_parallel_reads(mut self, parallel: bool) -> Self {
        self.parallel_reads = parallel;
        self
    }

    /// Compare `rev_a` (old) with `rev_b` (new).
    ///
    /// Listing failures are errors; blob read failures are not (see
    /// [`DiffReport::warnings`]).
    #[instrument(skip(self))]
    pub async fn compare(&self, rev_a: &str, rev_b: &str) -> Result<DiffReport, ProviderError> {
        let (files_a, files_b) = tokio::join!(
            self.provider.list_files(rev_a),
            self.provider.list_files(rev_b)
        );
        let files_a = files_a?;
        let files_b = files_b?;

        let all: BTreeSet<&String> = files_a.union(&files_b).collect();
        info!(
            old_count = files_a.len(),
            new_count = files_b.len(),
            union = all.len(),
            "comparing revisions"
        );

        let jobs = all.into_iter().map(|path| {
            self.diff_path(rev_a, rev_b, path, files_a.contains(path), files_b.contains(path))
        });

        let results = if self.parallel_reads {
            join_all(jobs).await
        } else {
            let mut results = Vec::new();
            for job in jobs {
                results.push(job.await);
            }
            results
        };

        let mut report = DiffReport::default();
        for (entry, warnings) in results {
            report.warnings.extend(warnings);
            if let Some(entry) = entry {
                report.entries.push(entry);
            }
        }
        report.entries.sort_by(|a, b| a.file.cmp(&b.file));

        info!(
            changed = report.entries.len(),
            warnings = report.warnings.len(),
            "comparison complete"
        );
        Ok(report)
    }

    /// Like [`compare`](Self::compare), but returns `Ok(None)` when another
    /// comparison was started on `counter` before this one finished.
    pub async fn compare_guarded(
        &self,
        counter: &GenerationCounter,
        rev_a: &str,
        rev_b: &str,
    ) -> Result<Option<DiffReport>, ProviderError> {
        let ticket = counter.next();
        let report = self.compare(rev_a, rev_b).await?;
        if counter.is_current(ticket) {
            Ok(Some(report))
        } else {
            debug!(rev_a, rev_b, "discarding superseded comparison");
            Ok(None)
        }
    }

    async fn diff_path(
        &self,
        rev_a: &str,
        rev_b: &str,
        path: &str,
        in_a: bool,
        in_b: bool,
    ) -> (Option<DiffEntry>, Vec<DiffWarning>) {
        let mut warnings = Vec::new();

        let (status, old_content, new_content) = match (in_a, in_b) {
            (false, true) => {
                let new = self.read_bytes(rev_b, path, &mut warnings).await;
                (FileStatus::Added, None, Some(decode(&new)))
            }
            (true, false) => {
                let old = self.read_bytes(rev_a, path, &mut warnings).await;
                (FileStatus::Deleted, Some(decode(&old)), None)
            }
            (true, true) => {
                let old = self.read_bytes(rev_a, path, &mut warnings).await;
                let new = self.read_bytes(rev_b, path, &mut warnings).await;
                // Raw bytes: distinct non-UTF-8 blobs may decode identically.
                if old == new {
                    return (None, warnings);
                }
                (FileStatus::Modified, Some(decode(&old)), Some(decode(&new)))
            }
            (false, false) => return (None, warnings),
        };

        let diff = unified_diff(
            path,
            old_content.as_deref(),
            new_content.as_deref(),
            self.algorithm,
        );
        debug!(path, status = %status, "file changed");

        let entry = DiffEntry {
            file: path.to_string(),
            status,
            old_content,
            new_content,
            diff,
        };
        (Some(entry), warnings)
    }

    async fn read_bytes(&self, revision: &str, path: &str, warnings: &mut Vec<DiffWarning>) -> Vec<u8> {
        match self.provider.read_blob(revision, path).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(revision, path, "listed path has no blob, using empty content");
                Vec::new()
            }
            Err(e) => {
                warn!(revision, path, error = %e, "blob read failed, using empty content");
                warnings.push(DiffWarning {
                    revision: revision.to_string(),
                    path: path.to_string(),
                    detail: e.to_string(),
                });
                Vec::new()
            }
        }
    }
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render a unified-style diff between two versions of `path`.
///
/// Output starts with `--- a/<path>` / `+++ b/<path>`, followed by one line
/// per source line prefixed with `' '`, `'-'` or `'+'`. A missing side is
/// treated as empty.
pub fn unified_diff(
    path: &str,
    old: Option<&str>,
    new: Option<&str>,
    algorithm: DiffAlgorithm,
) -> String {
    let old = old.unwrap_or("");
    let new = new.unwrap_or("");

    let mut out = String::new();
    out.push_str(&format!("--- a/{}\n", path));
    out.push_str(&format!("+++ b/{}\n", path));

    match algorithm {
        DiffAlgorithm::Pairwise => pairwise_lines(old, new, &mut out),
        DiffAlgorithm::Lcs => lcs_lines(old, new, &mut out),
    }
    out
}

fn push_line(out: &mut String, marker: char, text: &str) {
    out.push(marker);
    out.push_str(text);
    out.push('\n');
}

fn pairwise_lines(old: &str, new: &str, out: &mut String) {
    let old: Vec<&str> = old.lines().collect();
    let new: Vec<&str> = new.lines().collect();

    let mut i = 0;
    let mut j = 0;
    while i < old.len() && j < new.len() {
        if old[i] == new[j] {
            push_line(out, ' ', old[i]);
        } else {
            push_line(out, '-', old[i]);
            push_line(out, '+', new[j]);
        }
        i += 1;
        j += 1;
    }
    for line in &old[i..] {
        push_line(out, '-', line);
    }
    for line in &new[j..] {
        push_line(out, '+', line);
    }
}

fn lcs_lines(old: &str, new: &str, out: &mut String) {
    let mut options = diffy::DiffOptions::new();
    // Context wide enough that the single hunk spans the whole file.
    options.set_context_len(old.lines().count() + new.lines().count() + 1);
    let patch = options.create_patch(old, new);

    for hunk in patch.hunks() {
        for line in hunk.lines() {
            let (marker, text) = match line {
                diffy::Line::Context(t) => (' ', *t),
                diffy::Line::Delete(t) => ('-', *t),
                diffy::Line::Insert(t) => ('+', *t),
            };
            let text = text.strip_suffix('\n').unwrap_or(text);
            let text = text.strip_suffix('\r').unwrap_or(text);
            push_line(out, marker, text);
        }
    }
}
