//! Subcommand implementations and the plumbing they share.

pub mod branches;
pub mod conflicts;
pub mod diff;
pub mod pr;
pub mod style;
pub mod tree;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use gitdesk_core::config::AppConfig;
use gitdesk_core::git::{
    api_url_for_host, parse_remote_url, GitClient, GitHubClient, GitRevisionProvider,
};
use gitdesk_core::merge::{MergeOrchestrator, OrchestratorOptions};

const DEFAULT_API_URL: &str = "https://api.github.com";

/// Where pull requests for this repository are opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostingTarget {
    pub owner: String,
    pub repo: String,
    pub api_url: String,
}

/// Open the configured repository as a revision provider.
pub fn open_provider(config: &AppConfig) -> Result<GitRevisionProvider> {
    let provider = GitRevisionProvider::open(&config.repository.path).with_context(|| {
        format!(
            "failed to open repository at {}",
            config.repository.path.display()
        )
    })?;
    Ok(provider.with_token(config.github.token.clone()))
}

/// Resolve `owner/repo` and the API URL, from the config or the remote URL.
pub fn hosting_target(config: &AppConfig) -> Result<Option<HostingTarget>> {
    if let Some((owner, repo)) = config.github.owner_repo() {
        return Ok(Some(HostingTarget {
            owner: owner.to_string(),
            repo: repo.to_string(),
            api_url: config.github.api_url.clone(),
        }));
    }

    let client = GitClient::new(&config.repository.path).context("failed to open repository")?;
    let Some(url) = client.remote_url(&config.repository.remote).ok().flatten() else {
        return Ok(None);
    };
    let Some(slug) = parse_remote_url(&url) else {
        debug!(%url, "remote URL does not name a hosted repository");
        return Ok(None);
    };
    let api_url = if config.github.api_url == DEFAULT_API_URL {
        api_url_for_host(&slug.host)
    } else {
        config.github.api_url.clone()
    };
    Ok(Some(HostingTarget {
        owner: slug.owner,
        repo: slug.repo,
        api_url,
    }))
}

/// Orchestrator over the local repository. Without a hosting target it can
/// still load branches; submissions are rejected with a clear message.
pub fn orchestrator(config: &AppConfig, target: Option<&HostingTarget>) -> Result<MergeOrchestrator> {
    let provider = open_provider(config)?;
    let api_url = target.map_or(config.github.api_url.as_str(), |t| t.api_url.as_str());
    let token = config.github.token.clone().unwrap_or_default();
    let hosting = GitHubClient::new(api_url, token).context("failed to create GitHub client")?;
    let (owner, repo) = target.map_or((String::new(), String::new()), |t| {
        (t.owner.clone(), t.repo.clone())
    });
    Ok(
        MergeOrchestrator::new(Arc::new(provider), Arc::new(hosting), owner, repo)
            .with_options(OrchestratorOptions::from_config(config)),
    )
}

/// A steady-ticking spinner with `msg`.
pub fn spinner(msg: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    spinner.set_message(msg.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Print a value as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize output")?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosting_target_from_config() {
        let mut config = AppConfig::default();
        config.github.repo = Some("acme/widgets".into());
        let target = hosting_target(&config).unwrap().unwrap();
        assert_eq!(
            target,
            HostingTarget {
                owner: "acme".into(),
                repo: "widgets".into(),
                api_url: DEFAULT_API_URL.into(),
            }
        );
    }
}
