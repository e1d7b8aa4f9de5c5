//! Per-section conflict resolution over a merged document.
//!
//! [`ConflictSectionModel`] is built from the merged text plus the line
//! ranges of its conflict blocks. Each block becomes a [`ConflictSection`]
//! whose resolution (current, incoming, or hand-edited content) is tracked
//! independently. [`ConflictSectionModel::regenerate`] rebuilds the document
//! at any time: resolved sections are substituted, unresolved ones are kept
//! verbatim with their markers.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::markers::MarkerRange;
use crate::errors::ConflictError;

/// Which content a section resolves to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Current,
    Incoming,
    Custom,
    /// Not resolved.
    #[default]
    None,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Current => write!(f, "current"),
            Self::Incoming => write!(f, "incoming"),
            Self::Custom => write!(f, "custom"),
            Self::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "current" | "ours" => Ok(Self::Current),
            "incoming" | "theirs" => Ok(Self::Incoming),
            "custom" => Ok(Self::Custom),
            "none" => Ok(Self::None),
            other => Err(format!("unknown side '{}'", other)),
        }
    }
}

/// One conflict block and its resolution state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictSection {
    /// 0-based, in document order.
    pub id: usize,
    pub start_line: usize,
    pub separator_line: usize,
    pub end_line: usize,
    /// diff3 base marker line, if any.
    #[serde(default)]
    pub base_line: Option<usize>,
    /// Lines between the start marker and the separator (or the diff3 base
    /// marker), joined with `\n`.
    pub current_content: String,
    /// Lines between the separator and the end marker.
    pub incoming_content: String,
    pub resolved: bool,
    pub selected_side: Side,
    pub custom_content: Option<String>,
}

impl ConflictSection {
    fn clear(&mut self) {
        self.resolved = false;
        self.selected_side = Side::None;
        self.custom_content = None;
    }
}

/// A marker range rejected during [`ConflictSectionModel::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseDefect {
    /// Index of the range in the caller-supplied list.
    pub marker_index: usize,
    pub range: MarkerRange,
    pub reason: String,
}

/// Conflict sections of one merged document.
#[derive(Debug, Clone)]
pub struct ConflictSectionModel {
    lines: Vec<String>,
    trailing_newline: bool,
    markers: Vec<MarkerRange>,
    sections: Vec<ConflictSection>,
    defects: Vec<ParseDefect>,
}

impl ConflictSectionModel {
    /// Create an unparsed model. Call [`parse`](Self::parse) before use.
    pub fn new(original_text: &str, markers: Vec<MarkerRange>) -> Self {
        let trailing_newline = original_text.ends_with('\n');
        let body = original_text.strip_suffix('\n').unwrap_or(original_text);
        let lines = if original_text.is_empty() {
            Vec::new()
        } else {
            body.split('\n').map(str::to_string).collect()
        };
        Self {
            lines,
            trailing_newline,
            markers,
            sections: Vec::new(),
            defects: Vec::new(),
        }
    }

    /// Create and parse in one step.
    pub fn parsed(original_text: &str, markers: Vec<MarkerRange>) -> Self {
        let mut model = Self::new(original_text, markers);
        model.parse();
        model
    }

    /// Build the sections from the marker ranges, discarding any previous
    /// resolution state.
    ///
    /// Ranges are taken in document order regardless of the order supplied.
    /// A range is rejected, and reported as a defect, when its lines are not
    /// strictly increasing, when it runs past the end of the text, or when
    /// it overlaps an earlier accepted range. Rejection never stops the
    /// remaining ranges from being parsed.
    pub fn parse(&mut self) -> &[ParseDefect] {
        self.sections.clear();
        self.defects.clear();

        let mut order: Vec<usize> = (0..self.markers.len()).collect();
        order.sort_by_key(|&i| (self.markers[i].start, i));

        let mut last_end: Option<usize> = None;
        for idx in order {
            let range = self.markers[idx];
            if let Err(reason) = self.check_range(&range, last_end) {
                warn!(marker = idx, start = range.start, %reason, "skipping malformed conflict marker");
                self.defects.push(ParseDefect {
                    marker_index: idx,
                    range,
                    reason,
                });
                continue;
            }

            let current_stop = range.base.unwrap_or(range.separator);
            let section = ConflictSection {
                id: self.sections.len(),
                start_line: range.start,
                separator_line: range.separator,
                end_line: range.end,
                base_line: range.base,
                current_content: self.lines[range.start + 1..current_stop].join("\n"),
                incoming_content: self.lines[range.separator + 1..range.end].join("\n"),
                resolved: false,
                selected_side: Side::None,
                custom_content: None,
            };
            debug!(id = section.id, start = range.start, end = range.end, "parsed conflict section");
            self.sections.push(section);
            last_end = Some(range.end);
        }

        info!(
            sections = self.sections.len(),
            defects = self.defects.len(),
            "conflict sections parsed"
        );
        &self.defects
    }

    fn check_range(&self, range: &MarkerRange, last_end: Option<usize>) -> Result<(), String> {
        if !(range.start < range.separator && range.separator < range.end) {
            return Err(format!(
                "marker lines out of order (start {}, separator {}, end {})",
                range.start, range.separator, range.end
            ));
        }
        if let Some(base) = range.base {
            if !(range.start < base && base < range.separator) {
                return Err(format!("base marker {} outside its block", base));
            }
        }
        if range.end >= self.lines.len() {
            return Err(format!(
                "end line {} beyond document of {} lines",
                range.end,
                self.lines.len()
            ));
        }
        if let Some(prev) = last_end {
            if range.start <= prev {
                return Err(format!("overlaps the block ending at line {}", prev));
            }
        }
        Ok(())
    }

    pub fn sections(&self) -> &[ConflictSection] {
        &self.sections
    }

    pub fn section(&self, id: usize) -> Option<&ConflictSection> {
        self.sections.get(id)
    }

    pub fn defects(&self) -> &[ParseDefect] {
        &self.defects
    }

    fn section_mut(&mut self, id: usize) -> Result<&mut ConflictSection, ConflictError> {
        self.sections
            .get_mut(id)
            .ok_or(ConflictError::SectionNotFound(id))
    }

    /// Resolve a section to `side`. Selecting [`Side::Custom`] for the first
    /// time seeds the custom content with the current side. Selecting
    /// [`Side::None`] is the same as [`reset_section`](Self::reset_section).
    pub fn select_side(&mut self, id: usize, side: Side) -> Result<(), ConflictError> {
        let section = self.section_mut(id)?;
        if side == Side::None {
            section.clear();
            return Ok(());
        }
        section.selected_side = side;
        section.resolved = true;
        if side == Side::Custom && section.custom_content.is_none() {
            section.custom_content = Some(section.current_content.clone());
        }
        debug!(id, side = %side, "conflict section resolved");
        Ok(())
    }

    /// Replace the hand-edited content of a section. Resolution state is
    /// left as is.
    pub fn update_custom_content(&mut self, id: usize, text: impl Into<String>) -> Result<(), ConflictError> {
        self.section_mut(id)?.custom_content = Some(text.into());
        Ok(())
    }

    pub fn reset_section(&mut self, id: usize) -> Result<(), ConflictError> {
        self.section_mut(id)?.clear();
        Ok(())
    }

    pub fn reset_all(&mut self) {
        for section in &mut self.sections {
            section.clear();
        }
    }

    /// Resolve every section to the same side.
    pub fn resolve_all(&mut self, side: Side) {
        for id in 0..self.sections.len() {
            // Ids are dense, so this cannot fail.
            let _ = self.select_side(id, side);
        }
    }

    /// True when every section is resolved (vacuously true with none).
    pub fn is_fully_resolved(&self) -> bool {
        self.sections.iter().all(|s| s.resolved)
    }

    pub fn unresolved_count(&self) -> usize {
        self.sections.iter().filter(|s| !s.resolved).count()
    }

    fn current_lines<'a>(&'a self, section: &ConflictSection) -> impl Iterator<Item = &'a str> {
        let stop = section.base_line.unwrap_or(section.separator_line);
        self.lines[section.start_line + 1..stop]
            .iter()
            .map(String::as_str)
    }

    /// Rebuild the document from the original lines and the current
    /// resolution state.
    pub fn regenerate(&self) -> String {
        let mut out: Vec<&str> = Vec::with_capacity(self.lines.len());
        let mut cursor = 0;

        for section in &self.sections {
            out.extend(self.lines[cursor..section.start_line].iter().map(String::as_str));
            match section.selected_side {
                Side::None => out.extend(
                    self.lines[section.start_line..=section.end_line]
                        .iter()
                        .map(String::as_str),
                ),
                Side::Current => out.extend(self.current_lines(section)),
                Side::Incoming => out.extend(
                    self.lines[section.separator_line + 1..section.end_line]
                        .iter()
                        .map(String::as_str),
                ),
                Side::Custom => match section.custom_content.as_deref() {
                    Some(text) => {
                        // Only hand-edited text is normalised; an empty edit
                        // removes the block.
                        let text = text.strip_suffix('\n').unwrap_or(text);
                        if !text.is_empty() {
                            out.extend(text.split('\n'));
                        }
                    }
                    None => out.extend(self.current_lines(section)),
                },
            }
            cursor = section.end_line + 1;
        }
        out.extend(self.lines[cursor..].iter().map(String::as_str));

        let mut text = out.join("\n");
        if self.trailing_newline && !out.is_empty() {
            text.push('\n');
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::markers::scan_markers;

    const ONE: &str = "before\n<<<<<<< HEAD\nX\n=======\nY\n>>>>>>> feature\nafter\n";

    const TWO: &str = "\
head
<<<<<<< HEAD
a1
=======
b1
>>>>>>> feature
middle
<<<<<<< HEAD
a2
a2b
=======
b2
>>>>>>> feature
tail
";

    fn two_markers() -> Vec<MarkerRange> {
        vec![MarkerRange::new(1, 3, 5), MarkerRange::new(7, 10, 12)]
    }

    #[test]
    fn test_parse_sections() {
        let model = ConflictSectionModel::parsed(TWO, two_markers());
        assert!(model.defects().is_empty());
        let sections = model.sections();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].current_content, "a1");
        assert_eq!(sections[0].incoming_content, "b1");
        assert_eq!(sections[1].id, 1);
        assert_eq!(sections[1].current_content, "a2\na2b");
        assert_eq!(sections[1].incoming_content, "b2");
        assert!(!sections[1].resolved);
        assert_eq!(sections[1].selected_side, Side::None);
    }

    #[test]
    fn test_select_current_round_trip() {
        let mut model = ConflictSectionModel::parsed(ONE, vec![MarkerRange::new(1, 3, 5)]);
        model.select_side(0, Side::Current).unwrap();
        let text = model.regenerate();
        assert_eq!(text, "before\nX\nafter\n");
        assert!(!text.contains("<<<<<<<"));
        assert!(!text.contains("======="));
        assert!(!text.contains(">>>>>>>"));
        assert!(model.is_fully_resolved());
    }

    #[test]
    fn test_select_incoming() {
        let mut model = ConflictSectionModel::parsed(ONE, vec![MarkerRange::new(1, 3, 5)]);
        model.select_side(0, Side::Incoming).unwrap();
        assert_eq!(model.regenerate(), "before\nY\nafter\n");
    }

    #[test]
    fn test_partial_resolution_keeps_markers() {
        let mut model = ConflictSectionModel::parsed(TWO, two_markers());
        model.select_side(1, Side::Incoming).unwrap();

        assert!(!model.is_fully_resolved());
        assert_eq!(model.unresolved_count(), 1);
        let expected = "\
head
<<<<<<< HEAD
a1
=======
b1
>>>>>>> feature
middle
b2
tail
";
        assert_eq!(model.regenerate(), expected);
    }

    #[test]
    fn test_unresolved_document_is_unchanged() {
        let model = ConflictSectionModel::parsed(TWO, two_markers());
        assert_eq!(model.regenerate(), TWO);
    }

    #[test]
    fn test_custom_seeded_from_current() {
        let mut model = ConflictSectionModel::parsed(TWO, two_markers());
        model.select_side(1, Side::Custom).unwrap();
        assert_eq!(model.section(1).unwrap().custom_content.as_deref(), Some("a2\na2b"));

        model.update_custom_content(1, "merged\n").unwrap();
        model.select_side(0, Side::Current).unwrap();
        let text = model.regenerate();
        assert_eq!(text, "head\na1\nmiddle\nmerged\ntail\n");

        // Re-selecting custom keeps the edit.
        model.select_side(1, Side::Incoming).unwrap();
        model.select_side(1, Side::Custom).unwrap();
        assert_eq!(model.section(1).unwrap().custom_content.as_deref(), Some("merged\n"));
    }

    #[test]
    fn test_custom_falls_back_to_current_when_never_edited() {
        let mut model = ConflictSectionModel::parsed(ONE, vec![MarkerRange::new(1, 3, 5)]);
        model.select_side(0, Side::Custom).unwrap();
        model.sections[0].custom_content = None;
        assert_eq!(model.regenerate(), "before\nX\nafter\n");
    }

    #[test]
    fn test_update_custom_does_not_resolve() {
        let mut model = ConflictSectionModel::parsed(ONE, vec![MarkerRange::new(1, 3, 5)]);
        model.update_custom_content(0, "Z").unwrap();
        let section = model.section(0).unwrap();
        assert!(!section.resolved);
        assert_eq!(section.selected_side, Side::None);
        assert_eq!(model.regenerate(), ONE);
    }

    #[test]
    fn test_empty_custom_content_removes_block() {
        let mut model = ConflictSectionModel::parsed(ONE, vec![MarkerRange::new(1, 3, 5)]);
        model.select_side(0, Side::Custom).unwrap();
        model.update_custom_content(0, "").unwrap();
        assert_eq!(model.regenerate(), "before\nafter\n");
    }

    #[test]
    fn test_reset() {
        let mut model = ConflictSectionModel::parsed(TWO, two_markers());
        model.resolve_all(Side::Current);
        assert!(model.is_fully_resolved());

        model.reset_section(0).unwrap();
        assert!(!model.is_fully_resolved());
        assert_eq!(model.section(0).unwrap().selected_side, Side::None);

        model.reset_all();
        assert_eq!(model.unresolved_count(), 2);
        assert_eq!(model.regenerate(), TWO);

        model.select_side(1, Side::Incoming).unwrap();
        model.select_side(1, Side::None).unwrap();
        assert!(!model.section(1).unwrap().resolved);
    }

    #[test]
    fn test_unknown_section() {
        let mut model = ConflictSectionModel::parsed(ONE, vec![MarkerRange::new(1, 3, 5)]);
        assert_eq!(
            model.select_side(5, Side::Current),
            Err(ConflictError::SectionNotFound(5))
        );
        assert!(model.update_custom_content(1, "x").is_err());
        assert!(model.reset_section(9).is_err());
    }

    #[test]
    fn test_markers_sorted_by_position() {
        let mut markers = two_markers();
        markers.reverse();
        let mut model = ConflictSectionModel::parsed(TWO, markers);
        assert_eq!(model.sections()[0].start_line, 1);
        assert_eq!(model.sections()[1].start_line, 7);

        model.select_side(0, Side::Incoming).unwrap();
        model.select_side(1, Side::Current).unwrap();
        assert_eq!(model.regenerate(), "head\nb1\nmiddle\na2\na2b\ntail\n");
    }

    #[test]
    fn test_malformed_markers_skipped() {
        let markers = vec![
            MarkerRange::new(7, 10, 12),
            MarkerRange::new(5, 3, 1),   // inverted
            MarkerRange::new(1, 3, 50),  // out of bounds
            MarkerRange::new(1, 3, 5),
            MarkerRange::new(2, 4, 6),   // overlaps the previous block
        ];
        let model = ConflictSectionModel::parsed(TWO, markers);
        assert_eq!(model.sections().len(), 2);
        let rejected: Vec<usize> = model.defects().iter().map(|d| d.marker_index).collect();
        assert_eq!(rejected.len(), 3);
        assert!(rejected.contains(&1));
        assert!(rejected.contains(&2));
        assert!(rejected.contains(&4));
    }

    #[test]
    fn test_diff3_base_excluded_from_current() {
        let text = "<<<<<<< ours\nmine\n||||||| base\norig\n=======\nyours\n>>>>>>> theirs\n";
        let model = ConflictSectionModel::parsed(text, vec![MarkerRange::new(0, 4, 6).with_base(2)]);
        assert_eq!(model.sections()[0].current_content, "mine");
        assert_eq!(model.sections()[0].incoming_content, "yours");
    }

    #[test]
    fn test_no_trailing_newline_preserved() {
        let text = "<<<<<<< a\nx\n=======\ny\n>>>>>>> b";
        let mut model = ConflictSectionModel::parsed(text, vec![MarkerRange::new(0, 2, 4)]);
        assert_eq!(model.regenerate(), text);
        model.select_side(0, Side::Incoming).unwrap();
        assert_eq!(model.regenerate(), "y");
    }

    #[test]
    fn test_side_ending_in_blank_line_keeps_it() {
        let text = "top\n<<<<<<< a\nX\n\n=======\nY\n>>>>>>> b\nbottom\n";
        let mut model = ConflictSectionModel::parsed(text, scan_markers(text));
        model.select_side(0, Side::Current).unwrap();
        assert_eq!(model.regenerate(), "top\nX\n\nbottom\n");
    }

    #[test]
    fn test_side_of_one_blank_line_keeps_it() {
        let text = "top\n<<<<<<< a\n\n=======\nY\n>>>>>>> b\nbottom\n";
        let mut model = ConflictSectionModel::parsed(text, scan_markers(text));
        model.select_side(0, Side::Current).unwrap();
        assert_eq!(model.regenerate(), "top\n\nbottom\n");

        let empty = "top\n<<<<<<< a\n=======\nY\n>>>>>>> b\nbottom\n";
        let mut model = ConflictSectionModel::parsed(empty, scan_markers(empty));
        model.select_side(0, Side::Current).unwrap();
        assert_eq!(model.regenerate(), "top\nbottom\n");
    }

    #[test]
    fn test_incoming_blank_lines_kept() {
        let text = "<<<<<<< a\nX\n=======\n\nY\n\n>>>>>>> b\n";
        let mut model = ConflictSectionModel::parsed(text, scan_markers(text));
        model.select_side(0, Side::Incoming).unwrap();
        assert_eq!(model.regenerate(), "\nY\n\n");
    }

    #[test]
    fn test_reparse_clears_state() {
        let mut model = ConflictSectionModel::parsed(ONE, vec![MarkerRange::new(1, 3, 5)]);
        model.select_side(0, Side::Current).unwrap();
        model.parse();
        assert!(!model.is_fully_resolved());
    }

    #[test]
    fn test_side_from_str() {
        assert_eq!("ours".parse::<Side>().unwrap(), Side::Current);
        assert_eq!("incoming".parse::<Side>().unwrap(), Side::Incoming);
        assert!("both".parse::<Side>().is_err());
    }
}
