//! Shared styling utilities for terminal output.

use console::Style;

use gitdesk_core::diff::FileStatus;

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create an error-styled string (red with cross).
pub fn error(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create a header-styled string (bold, white).
pub fn header(msg: &str) -> String {
    let style = Style::new().bold();
    style.apply_to(msg).to_string()
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    let style = Style::new().dim();
    style.apply_to(msg).to_string()
}

/// Directory name in a tree listing (bold blue, trailing slash).
pub fn directory(name: &str) -> String {
    let style = Style::new().blue().bold();
    format!("{}/", style.apply_to(name))
}

/// One line of a unified diff, colored by its prefix.
pub fn diff_line(line: &str) -> String {
    let style = if line.starts_with("+++") || line.starts_with("---") {
        Style::new().bold()
    } else if line.starts_with('+') {
        Style::new().green()
    } else if line.starts_with('-') {
        Style::new().red()
    } else {
        Style::new()
    };
    style.apply_to(line).to_string()
}

/// Short colored status tag: `A`, `D` or `M`.
pub fn status_tag(status: FileStatus) -> String {
    match status {
        FileStatus::Added => Style::new().green().apply_to("A").to_string(),
        FileStatus::Deleted => Style::new().red().apply_to("D").to_string(),
        FileStatus::Modified => Style::new().yellow().apply_to("M").to_string(),
    }
}
