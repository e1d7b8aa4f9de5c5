//! `gitdesk branches`: local and remote branches with default selections.

use anyhow::{Context, Result};

use gitdesk_core::config::AppConfig;
use gitdesk_core::merge::BranchLoad;

use super::{orchestrator, print_json, spinner, style};

pub async fn run(config: &AppConfig, no_fetch: bool, json: bool) -> Result<()> {
    let mut config = config.clone();
    if no_fetch {
        config.merge.fetch_before_load = false;
    }
    let orch = orchestrator(&config, None)?;

    let progress = (!json && config.merge.fetch_before_load)
        .then(|| spinner(format!("Fetching {}...", config.repository.remote)));
    let load = orch.load_branches().await.context("failed to load branches");
    if let Some(progress) = progress {
        progress.finish_and_clear();
    }
    let load = load?;

    if json {
        return print_json(&load);
    }
    print_branches(&load);
    Ok(())
}

fn print_branches(load: &BranchLoad) {
    for warning in &load.warnings {
        println!(
            "{}",
            style::warn(&format!(
                "fetch from '{}' failed, branch list may be stale: {}",
                warning.remote, warning.detail
            ))
        );
    }

    println!();
    println!("{}", style::header("Local branches"));
    for name in &load.branches.local {
        let marker = if load.branches.current.as_deref() == Some(name.as_str()) {
            "*"
        } else {
            " "
        };
        println!("  {} {}", marker, name);
    }

    println!();
    println!("{}", style::header("Remote branches"));
    if load.branches.remote.is_empty() {
        println!("  {}", style::dim("(none)"));
    }
    for name in &load.branches.remote {
        println!("    {}", name);
    }

    println!();
    println!("  Default source: {}", display_or_none(&load.default_source));
    println!("  Default target: {}", display_or_none(&load.default_target));
    println!();
}

fn display_or_none(name: &str) -> String {
    if name.is_empty() {
        style::dim("(none)")
    } else {
        name.to_string()
    }
}
