//! `gitdesk pr`: open a pull request from a branch pair.

use anyhow::{Context, Result};

use gitdesk_core::config::AppConfig;
use gitdesk_core::merge::MergeRequestDraft;
use gitdesk_core::models::SubmitOutcome;

use super::{hosting_target, orchestrator, print_json, spinner, style};

pub struct PrArgs {
    pub title: String,
    pub body: Option<String>,
    pub source: Option<String>,
    pub target: Option<String>,
    pub dry_run: bool,
    pub json: bool,
}

pub async fn run(config: &AppConfig, args: PrArgs) -> Result<()> {
    let target = hosting_target(config)?;
    if target.is_none() && !args.dry_run {
        anyhow::bail!(
            "cannot determine the GitHub repository: set github.repo or add a GitHub remote '{}'",
            config.repository.remote
        );
    }
    if config.github.token.is_none() && !args.dry_run {
        anyhow::bail!(
            "no GitHub token: set the {} environment variable",
            config.github.token_env
        );
    }
    let orch = orchestrator(config, target.as_ref())?;

    // Only consult the repository when a side was left to its default.
    let (source, target_branch) = match (args.source, args.target) {
        (Some(source), Some(target)) => (source, target),
        (source, target) => {
            let load = orch
                .load_branches()
                .await
                .context("failed to load branches")?;
            for warning in &load.warnings {
                eprintln!("{}", style::warn(&format!("fetch failed: {}", warning.detail)));
            }
            (
                source.unwrap_or(load.default_source),
                target.unwrap_or(load.default_target),
            )
        }
    };

    let draft = MergeRequestDraft::new(source, target_branch, args.title)
        .with_description(args.body.unwrap_or_default());

    if args.dry_run {
        if args.json {
            return print_json(&draft);
        }
        println!("{}", style::header("Pull request (dry run)"));
        println!("  {} → {}", draft.source, draft.target);
        println!("  Title: {}", draft.title);
        if !draft.description.is_empty() {
            println!("  Body : {}", draft.description);
        }
        if !orch.can_submit(&draft) {
            println!("{}", style::warn("this draft would be rejected"));
        }
        return Ok(());
    }

    let progress = (!args.json).then(|| spinner("Creating pull request..."));
    let outcome = orch.submit(&draft).await;
    if let Some(progress) = progress {
        progress.finish_and_clear();
    }

    if args.json {
        print_json(&outcome)?;
    }
    match outcome {
        SubmitOutcome::Success { number, url } => {
            if !args.json {
                println!("{}", style::success(&format!("Created pull request #{}", number)));
                println!("  {}", url);
            }
            Ok(())
        }
        other => {
            if !args.json {
                println!("{}", style::error(&other.message()));
            }
            anyhow::bail!("pull request was not created")
        }
    }
}
