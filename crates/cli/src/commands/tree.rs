//! `gitdesk tree`: the file tree of a revision.

use anyhow::{Context, Result};

use gitdesk_core::config::AppConfig;
use gitdesk_core::provider::RevisionProvider;
use gitdesk_core::tree::{build_tree, count_files, flatten_tree, TreeNode};

use super::{open_provider, print_json, style};

pub async fn run(config: &AppConfig, revision: &str, json: bool) -> Result<()> {
    let provider = open_provider(config)?;
    let files = provider
        .list_files(revision)
        .await
        .with_context(|| format!("failed to list files at {}", revision))?;
    let tree = build_tree(&files);

    if json {
        return print_json(&tree);
    }

    println!("{}", render(&tree));
    println!();
    println!(
        "{}",
        style::dim(&format!("{} files at {}", count_files(&tree), revision))
    );
    Ok(())
}

/// Indented listing, two spaces per level, directories first.
fn render(tree: &[TreeNode]) -> String {
    flatten_tree(tree, true)
        .iter()
        .map(|entry| {
            let indent = "  ".repeat(entry.depth);
            if entry.is_directory {
                format!("{}{}", indent, style::directory(&entry.name))
            } else {
                format!("{}{}", indent, entry.name)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
