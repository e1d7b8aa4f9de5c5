//! `gitdesk diff`: compare two revisions file by file.

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};

use gitdesk_core::config::AppConfig;
use gitdesk_core::diff::{DiffAlgorithm, DiffEngine, DiffReport};

use super::{open_provider, print_json, style};

pub struct DiffArgs<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub stat: bool,
    pub algorithm: Option<DiffAlgorithm>,
    pub json: bool,
}

pub async fn run(config: &AppConfig, args: DiffArgs<'_>) -> Result<()> {
    let provider = open_provider(config)?;
    let engine = DiffEngine::new(&provider)
        .with_algorithm(args.algorithm.unwrap_or(config.diff.algorithm))
        .with_parallel_reads(config.diff.parallel_reads);
    let report = engine
        .compare(args.from, args.to)
        .await
        .with_context(|| format!("failed to compare {}..{}", args.from, args.to))?;

    if args.json {
        return print_json(&report);
    }

    for warning in &report.warnings {
        eprintln!(
            "{}",
            style::warn(&format!(
                "could not read {} at {} ({}), compared as empty",
                warning.path, warning.revision, warning.detail
            ))
        );
    }

    if report.entries.is_empty() {
        println!("{}", style::dim("No differences"));
        return Ok(());
    }

    if args.stat {
        println!("{}", stat_table(&report));
    } else {
        for entry in &report.entries {
            for line in entry.diff.lines() {
                println!("{}", style::diff_line(line));
            }
        }
    }
    Ok(())
}

fn stat_table(report: &DiffReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["", "File", "+", "-"]);

    let (mut added, mut removed) = (0, 0);
    for entry in &report.entries {
        let stats = entry.stats();
        added += stats.additions;
        removed += stats.deletions;
        table.add_row(vec![
            Cell::new(style::status_tag(entry.status)),
            Cell::new(&entry.file),
            Cell::new(stats.additions)
                .fg(comfy_table::Color::Green)
                .set_alignment(CellAlignment::Right),
            Cell::new(stats.deletions)
                .fg(comfy_table::Color::Red)
                .set_alignment(CellAlignment::Right),
        ]);
    }
    table.add_row(vec![
        Cell::new(""),
        Cell::new(format!("{} files changed", report.entries.len())),
        Cell::new(added).set_alignment(CellAlignment::Right),
        Cell::new(removed).set_alignment(CellAlignment::Right),
    ]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitdesk_core::provider::MemoryProvider;

    #[tokio::test]
    async fn test_stat_table_totals() {
        console::set_colors_enabled(false);
        let provider = MemoryProvider::new()
            .with_file("a", "x.txt", "1\n2\n")
            .with_file("b", "x.txt", "1\n3\n")
            .with_file("b", "y.txt", "new\n");
        let report = DiffEngine::new(&provider).compare("a", "b").await.unwrap();
        let rendered = stat_table(&report).to_string();
        assert!(rendered.contains("x.txt"));
        assert!(rendered.contains("y.txt"));
        assert!(rendered.contains("2 files changed"));
    }
}
