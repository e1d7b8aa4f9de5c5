//! `gitdesk conflicts`: inspect and resolve conflict blocks in a file, and
//! `gitdesk merge-check`: preview the conflicts of merging two revisions.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use dialoguer::Confirm;

use gitdesk_core::config::AppConfig;
use gitdesk_core::conflict::{scan_markers, ConflictSection, ConflictSectionModel, Side};
use gitdesk_core::git::GitClient;

use super::{orchestrator, print_json, style};

pub struct ConflictsArgs<'a> {
    pub file: &'a Path,
    pub accept: Option<Side>,
    pub write: bool,
    pub yes: bool,
    pub json: bool,
}

pub fn run(args: ConflictsArgs<'_>) -> Result<()> {
    let text = std::fs::read_to_string(args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let mut model = ConflictSectionModel::parsed(&text, scan_markers(&text));

    for defect in model.defects() {
        eprintln!(
            "{}",
            style::warn(&format!(
                "skipped conflict block {} (lines {}-{}): {}",
                defect.marker_index,
                defect.range.start + 1,
                defect.range.end + 1,
                defect.reason
            ))
        );
    }

    if let Some(side) = args.accept {
        if matches!(side, Side::Custom | Side::None) {
            anyhow::bail!("--accept takes 'current' or 'incoming'");
        }
        model.resolve_all(side);
    }

    if args.json {
        return print_json(&model.sections());
    }

    if model.sections().is_empty() {
        println!("{}", style::success("No conflict blocks found"));
        return Ok(());
    }

    println!();
    println!(
        "{}",
        style::header(&format!(
            "{} ({} sections, {} unresolved)",
            args.file.display(),
            model.sections().len(),
            model.unresolved_count()
        ))
    );
    println!("{}", sections_table(model.sections()));

    if args.accept.is_none() {
        return Ok(());
    }

    let resolved = model.regenerate();
    if !args.write {
        println!();
        print!("{}", resolved);
        return Ok(());
    }

    if !args.yes {
        let overwrite = Confirm::new()
            .with_prompt(format!("Overwrite {}?", args.file.display()))
            .default(false)
            .interact()
            .context("failed to read confirmation")?;
        if !overwrite {
            println!("Aborted.");
            return Ok(());
        }
    }
    std::fs::write(args.file, resolved)
        .with_context(|| format!("failed to write {}", args.file.display()))?;
    println!("{}", style::success(&format!("Wrote {}", args.file.display())));
    Ok(())
}

fn sections_table(sections: &[ConflictSection]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Lines", "Current", "Incoming", "Resolution"]);
    for section in sections {
        let resolution = if section.resolved {
            Cell::new(section.selected_side).fg(comfy_table::Color::Green)
        } else {
            Cell::new("unresolved").fg(comfy_table::Color::Yellow)
        };
        table.add_row(vec![
            Cell::new(section.id),
            Cell::new(format!("{}-{}", section.start_line + 1, section.end_line + 1)),
            Cell::new(preview(&section.current_content)),
            Cell::new(preview(&section.incoming_content)),
            resolution,
        ]);
    }
    table
}

/// First few lines of a side, for the table.
fn preview(content: &str) -> String {
    const MAX_LINES: usize = 3;
    let lines: Vec<&str> = content.lines().collect();
    if lines.len() <= MAX_LINES {
        return content.to_string();
    }
    format!(
        "{}\n… {} more lines",
        lines[..MAX_LINES].join("\n"),
        lines.len() - MAX_LINES
    )
}

pub async fn run_merge_check(
    config: &AppConfig,
    ours: &str,
    theirs: &str,
    base: Option<&str>,
    json: bool,
) -> Result<()> {
    let base = match base {
        Some(base) => base.to_string(),
        None => GitClient::new(&config.repository.path)
            .context("failed to open repository")?
            .merge_base(ours, theirs)
            .context("failed to find merge base")?
            .with_context(|| format!("{} and {} share no history", ours, theirs))?,
    };

    let orch = orchestrator(config, None)?;
    let report = orch
        .check_local_merge(&base, ours, theirs)
        .await
        .context("failed to check merge")?;

    if json {
        let conflicts: Vec<_> = report
            .conflicts
            .iter()
            .map(|c| {
                serde_json::json!({
                    "path": c.path,
                    "conflict_type": c.conflict_type,
                    "sections": c.model.as_ref().map(|m| m.sections().len()),
                })
            })
            .collect();
        return print_json(&serde_json::json!({
            "base": base,
            "auto_merged": report.auto_merged,
            "conflicts": conflicts,
            "warnings": report.warnings,
        }));
    }

    for warning in &report.warnings {
        eprintln!(
            "{}",
            style::warn(&format!("could not read {} at {}", warning.path, warning.revision))
        );
    }
    for path in &report.auto_merged {
        println!("{}", style::success(&format!("{} merges cleanly", path)));
    }
    match report.conflict_outcome() {
        None => {
            println!("{}", style::success(&format!("{} merges into {} without conflicts", theirs, ours)));
            Ok(())
        }
        Some(outcome) => {
            println!("{}", style::error(&outcome.message()));
            for conflicted in &report.conflicts {
                let detail = match &conflicted.model {
                    Some(model) => format!("{} section(s)", model.sections().len()),
                    None => conflicted.conflict_type.to_string(),
                };
                println!("  {} {}", conflicted.path, style::dim(&format!("({})", detail)));
            }
            anyhow::bail!("merge would conflict")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFLICTED: &str = "fn a() {}\n<<<<<<< ours\nfn b() {}\n=======\nfn c() {}\n>>>>>>> theirs\n";

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview("a\nb"), "a\nb");
        assert_eq!(preview("1\n2\n3\n4\n5"), "1\n2\n3\n… 2 more lines");
    }

    #[test]
    fn test_accept_and_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.rs");
        std::fs::write(&path, CONFLICTED).unwrap();

        run(ConflictsArgs {
            file: &path,
            accept: Some(Side::Incoming),
            write: true,
            yes: true,
            json: false,
        })
        .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fn a() {}\nfn c() {}\n");
    }

    #[test]
    fn test_listing_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.rs");
        std::fs::write(&path, CONFLICTED).unwrap();

        run(ConflictsArgs {
            file: &path,
            accept: None,
            write: true,
            yes: true,
            json: false,
        })
        .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), CONFLICTED);
    }

    #[test]
    fn test_custom_side_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.rs");
        std::fs::write(&path, CONFLICTED).unwrap();
        let result = run(ConflictsArgs {
            file: &path,
            accept: Some(Side::Custom),
            write: false,
            yes: true,
            json: false,
        });
        assert!(result.is_err());
    }
}
