//! Error types for the gitdesk core library.
//!
//! Each subsystem has its own error type derived with `thiserror`.
//!
//! Most failures inside the core are *not* surfaced as errors at all: input
//! defects and transient I/O problems degrade to warnings carried alongside
//! the result (see `ParseDefect`, `DiffWarning`, `LoadWarning`), and merge
//! request submission reports failures through `SubmitOutcome`.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from local Git (git2) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The repository path does not exist or is not a git repo.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// A revision (branch, tag, SHA) could not be resolved.
    #[error("git revision not found: {0}")]
    RevisionNotFound(String),

    /// The named remote is not configured.
    #[error("git remote not found: {0}")]
    RemoteNotFound(String),

    /// Generic I/O wrapper.
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Revision provider errors
// ---------------------------------------------------------------------------

/// Errors raised by a [`RevisionProvider`](crate::provider::RevisionProvider)
/// implementation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The revision could not be resolved by the provider.
    #[error("revision not found: {0}")]
    RevisionNotFound(String),

    /// Reading a blob failed for a reason other than absence.
    #[error("failed to read '{path}' at {revision}: {detail}")]
    ReadFailed {
        revision: String,
        path: String,
        detail: String,
    },

    /// Synchronising with a remote failed.
    #[error("fetch from remote '{remote}' failed: {detail}")]
    FetchFailed { remote: String, detail: String },

    /// Underlying git error.
    #[error(transparent)]
    Git(#[from] GitError),
}

impl From<git2::Error> for ProviderError {
    fn from(err: git2::Error) -> Self {
        ProviderError::Git(GitError::Git2Error(err))
    }
}

// ---------------------------------------------------------------------------
// GitHub API errors
// ---------------------------------------------------------------------------

/// Errors from code-hosting REST API interactions.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// HTTP-level transport error (network, TLS, etc.).
    #[error("GitHub HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The API returned a non-success status code.
    #[error("GitHub API error (HTTP {status}): {body}")]
    ApiError { status: u16, body: String },

    /// Authentication token is missing or invalid.
    #[error("GitHub authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The request was well-formed but rejected (e.g. PR already exists).
    #[error("GitHub rejected the request: {0}")]
    Unprocessable(String),

    /// Rate limit exceeded.
    #[error("GitHub rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: String },

    /// JSON deserialization failure.
    #[error("GitHub response parse error: {0}")]
    ParseError(String),
}

// ---------------------------------------------------------------------------
// Conflict errors
// ---------------------------------------------------------------------------

/// Errors from the conflict section model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConflictError {
    /// The requested section ID does not exist in the parsed model.
    #[error("conflict section not found: {0}")]
    SectionNotFound(usize),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
