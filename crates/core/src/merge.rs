//! Branch selection and merge request submission.
//!
//! The [`MergeOrchestrator`] loads the branch set from a
//! [`RevisionProvider`], picks sensible defaults for the source and target,
//! validates a [`MergeRequestDraft`] and submits it through a [`HostingApi`].
//! It never merges anything itself; [`MergeOrchestrator::check_local_merge`]
//! is the separate, opt-in step for workflows that want to see conflicts
//! before opening a request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::AppConfig;
use crate::conflict::{ConflictDetector, ConflictSectionModel, ConflictType, Merger};
use crate::diff::{DiffAlgorithm, DiffEngine, DiffWarning};
use crate::errors::ProviderError;
use crate::models::{
    is_symbolic_ref, strip_remote_prefix, BranchSet, NewMergeRequest, SubmitOutcome,
};
use crate::provider::{HostingApi, RevisionProvider};

// ---------------------------------------------------------------------------
// Options and results
// ---------------------------------------------------------------------------

/// Tunables for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorOptions {
    /// Remote whose branches are offered as targets.
    pub remote: String,
    /// Synchronise remote-tracking refs before listing branches.
    pub fetch_before_load: bool,
    /// Preferred target branches, in priority order.
    pub default_targets: Vec<String>,
    /// Line diff strategy used by local merge checks.
    pub algorithm: DiffAlgorithm,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            remote: "origin".into(),
            fetch_before_load: true,
            default_targets: vec!["main".into(), "master".into()],
            algorithm: DiffAlgorithm::default(),
        }
    }
}

impl OrchestratorOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            remote: config.repository.remote.clone(),
            fetch_before_load: config.merge.fetch_before_load,
            default_targets: config.merge.default_targets.clone(),
            algorithm: config.diff.algorithm,
        }
    }
}

/// A non-fatal problem encountered while loading branches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadWarning {
    pub remote: String,
    pub detail: String,
}

/// The branch set plus the selections a UI should start from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchLoad {
    pub branches: BranchSet,
    pub default_source: String,
    pub default_target: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<LoadWarning>,
}

/// What the user is about to submit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequestDraft {
    pub source: String,
    pub target: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl MergeRequestDraft {
    pub fn new(source: impl Into<String>, target: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            title: title.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Reason the draft cannot be submitted, ignoring the in-flight state.
    fn validation_error(&self) -> Option<&'static str> {
        if self.source.trim().is_empty() {
            return Some("source branch is required");
        }
        if self.target.trim().is_empty() {
            return Some("target branch is required");
        }
        if self.source.trim() == self.target.trim() {
            return Some("source and target branches must differ");
        }
        if self.title.trim().is_empty() {
            return Some("title is required");
        }
        None
    }
}

/// A file that needs manual attention after a local merge attempt.
#[derive(Debug, Clone)]
pub struct ConflictedFile {
    pub path: String,
    pub conflict_type: ConflictType,
    /// Merged text with conflict markers, for content conflicts.
    pub merged_content: Option<String>,
    /// Parsed sections over `merged_content`.
    pub model: Option<ConflictSectionModel>,
}

/// Outcome of [`MergeOrchestrator::check_local_merge`].
#[derive(Debug, Clone, Default)]
pub struct LocalMergeReport {
    /// Files changed on both sides that merged cleanly.
    pub auto_merged: Vec<String>,
    pub conflicts: Vec<ConflictedFile>,
    pub warnings: Vec<DiffWarning>,
}

impl LocalMergeReport {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// `SubmitOutcome::Conflict` naming the conflicted files, if any.
    pub fn conflict_outcome(&self) -> Option<SubmitOutcome> {
        if self.is_clean() {
            return None;
        }
        let files: Vec<String> = self.conflicts.iter().map(|c| c.path.clone()).collect();
        Some(SubmitOutcome::Conflict {
            message: format!("{} file(s) conflict and must be resolved", files.len()),
            files,
        })
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct MergeOrchestrator {
    provider: Arc<dyn RevisionProvider>,
    hosting: Arc<dyn HostingApi>,
    owner: String,
    repo: String,
    options: OrchestratorOptions,
    /// Set while a submission awaits the hosting API.
    in_flight: Arc<AtomicBool>,
}

impl MergeOrchestrator {
    pub fn new(
        provider: Arc<dyn RevisionProvider>,
        hosting: Arc<dyn HostingApi>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            hosting,
            owner: owner.into(),
            repo: repo.into(),
            options: OrchestratorOptions::default(),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    /// Whether a submission is currently awaiting the hosting API.
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------------
    // Branches
    // -----------------------------------------------------------------------

    /// Load local and remote branches and choose default selections.
    ///
    /// A failed fetch is reported as a [`LoadWarning`] and the (possibly
    /// stale) local view is used. Listing failures are errors.
    #[instrument(skip(self), fields(remote = %self.options.remote))]
    pub async fn load_branches(&self) -> Result<BranchLoad, ProviderError> {
        let remote = self.options.remote.as_str();
        let mut warnings = Vec::new();

        if self.options.fetch_before_load {
            if let Err(e) = self.provider.fetch_remote(remote).await {
                warn!(error = %e, "remote fetch failed, using local branch data");
                warnings.push(LoadWarning {
                    remote: remote.to_string(),
                    detail: e.to_string(),
                });
            }
        }

        let (local, remote_names, current) = tokio::join!(
            self.provider.list_local_branches(),
            self.provider.list_remote_branches(remote),
            self.provider.current_branch(),
        );

        let local = local?;
        let remote_set = remote_names?
            .iter()
            .filter(|name| !is_symbolic_ref(name))
            .map(|name| strip_remote_prefix(name, remote).to_string())
            .filter(|name| !name.is_empty())
            .collect();
        let current = current?.filter(|name| !is_symbolic_ref(name));

        let branches = BranchSet {
            local,
            remote: remote_set,
            current,
        };
        let default_source = default_source(&branches);
        let default_target =
            default_target(&branches, &default_source, &self.options.default_targets);

        info!(
            local = branches.local.len(),
            remote = branches.remote.len(),
            source = %default_source,
            target = %default_target,
            "branches loaded"
        );

        Ok(BranchLoad {
            branches,
            default_source,
            default_target,
            warnings,
        })
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Whether `draft` may be submitted right now.
    pub fn can_submit(&self, draft: &MergeRequestDraft) -> bool {
        draft.validation_error().is_none() && !self.is_submitting()
    }

    /// Open a merge request for `draft`.
    ///
    /// Every failure, validation or remote, is returned as
    /// [`SubmitOutcome::Error`].
    #[instrument(skip(self, draft), fields(source = %draft.source, target = %draft.target))]
    pub async fn submit(&self, draft: &MergeRequestDraft) -> SubmitOutcome {
        for branch in [&draft.source, &draft.target] {
            if is_symbolic_ref(branch) {
                warn!(branch = %branch, "refusing to submit a symbolic reference");
                return SubmitOutcome::error(format!(
                    "'{}' is a symbolic reference, select a branch instead",
                    branch.trim()
                ));
            }
        }

        let remote = self.options.remote.as_str();
        let request = NewMergeRequest {
            title: draft.title.trim().to_string(),
            description: draft.description.clone(),
            head: strip_remote_prefix(draft.source.trim(), remote).to_string(),
            base: strip_remote_prefix(draft.target.trim(), remote).to_string(),
        };
        let stripped = MergeRequestDraft {
            source: request.head.clone(),
            target: request.base.clone(),
            title: request.title.clone(),
            description: String::new(),
        };
        if let Some(reason) = stripped.validation_error() {
            debug!(reason, "draft rejected");
            return SubmitOutcome::error(reason);
        }
        if self.owner.is_empty() || self.repo.is_empty() {
            return SubmitOutcome::error("hosting repository (owner/name) is not configured");
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return SubmitOutcome::error("a submission is already in progress");
        }
        let _guard = InFlightGuard(self.in_flight.clone());

        info!(head = %request.head, base = %request.base, "creating merge request");
        match self
            .hosting
            .create_merge_request(&self.owner, &self.repo, &request)
            .await
        {
            Ok(created) => {
                info!(number = created.number, url = %created.url, "merge request created");
                SubmitOutcome::Success {
                    number: created.number,
                    url: created.url,
                }
            }
            Err(e) => {
                warn!(error = %e, "merge request submission failed");
                SubmitOutcome::error(e.to_string())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Local merge check
    // -----------------------------------------------------------------------

    /// Attempt a three-way merge of `ours` and `theirs` against `base`
    /// without touching the repository.
    ///
    /// Files changed on only one side are not reported. Files changed on
    /// both sides are merged line by line; those that still conflict come
    /// back with a parsed [`ConflictSectionModel`].
    #[instrument(skip(self))]
    pub async fn check_local_merge(
        &self,
        base: &str,
        ours: &str,
        theirs: &str,
    ) -> Result<LocalMergeReport, ProviderError> {
        let engine = DiffEngine::new(self.provider.as_ref()).with_algorithm(self.options.algorithm);
        let (ours_report, theirs_report) =
            tokio::join!(engine.compare(base, ours), engine.compare(base, theirs));
        let ours_report = ours_report?;
        let theirs_report = theirs_report?;

        let mut report = LocalMergeReport {
            warnings: ours_report.warnings,
            ..Default::default()
        };
        report.warnings.extend(theirs_report.warnings);

        for conflict in ConflictDetector::detect(&ours_report.entries, &theirs_report.entries) {
            match conflict.conflict_type {
                ConflictType::EditDelete => {
                    report.conflicts.push(ConflictedFile {
                        path: conflict.path,
                        conflict_type: conflict.conflict_type,
                        merged_content: None,
                        model: None,
                    });
                }
                ConflictType::Content => {
                    let result = Merger::three_way_merge(
                        conflict.base_content.as_deref().unwrap_or_default(),
                        conflict.ours_content.as_deref().unwrap_or_default(),
                        conflict.theirs_content.as_deref().unwrap_or_default(),
                    );
                    if !result.has_conflicts {
                        debug!(path = %conflict.path, "auto-merged");
                        report.auto_merged.push(conflict.path);
                        continue;
                    }
                    let model = result.section_model();
                    report.conflicts.push(ConflictedFile {
                        path: conflict.path,
                        conflict_type: conflict.conflict_type,
                        merged_content: Some(result.merged_content),
                        model: Some(model),
                    });
                }
            }
        }

        info!(
            auto_merged = report.auto_merged.len(),
            conflicts = report.conflicts.len(),
            "local merge check complete"
        );
        Ok(report)
    }
}

/// Clears the in-flight flag when the submission finishes or is dropped.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn default_source(branches: &BranchSet) -> String {
    branches
        .current
        .clone()
        .or_else(|| branches.local.iter().next().cloned())
        .unwrap_or_default()
}

fn default_target(branches: &BranchSet, source: &str, preferred: &[String]) -> String {
    if let Some(name) = preferred.iter().find(|name| branches.remote.contains(*name)) {
        return name.clone();
    }
    if let Some(name) = branches.remote.iter().next() {
        return name.clone();
    }
    branches
        .local
        .iter()
        .find(|name| name.as_str() != source)
        .cloned()
        .unwrap_or_default()
}
