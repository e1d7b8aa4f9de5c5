//! Git and GitHub access for gitdesk.

pub mod client;
pub mod github;
pub mod remote_url;
pub mod revisions;

pub use client::GitClient;
pub use github::GitHubClient;
pub use remote_url::{api_url_for_host, parse_owner_repo, parse_remote_url, RemoteSlug};
pub use revisions::GitRevisionProvider;
