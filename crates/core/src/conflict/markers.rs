//! Conflict marker scanning.
//!
//! Finds standard Git conflict blocks in merged text and reports their line
//! ranges. Both the two-way form and the diff3 form (with a `|||||||` base
//! block) are recognised. Markers must start at column 0.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Line indices (0-based) of one conflict block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerRange {
    /// The `<<<<<<<` line.
    pub start: usize,
    /// The `|||||||` line of a diff3 block, if present.
    #[serde(default)]
    pub base: Option<usize>,
    /// The `=======` line.
    pub separator: usize,
    /// The `>>>>>>>` line.
    pub end: usize,
}

impl MarkerRange {
    pub fn new(start: usize, separator: usize, end: usize) -> Self {
        Self {
            start,
            base: None,
            separator,
            end,
        }
    }

    pub fn with_base(mut self, base: usize) -> Self {
        self.base = Some(base);
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum State {
    Outside,
    Current { start: usize },
    Base { start: usize, base: usize },
    Incoming { start: usize, base: Option<usize>, separator: usize },
}

/// Whether `line` is a conflict marker made of seven `ch` characters,
/// optionally followed by a space and a label.
fn is_marker(line: &str, ch: u8, allow_label: bool) -> bool {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let bytes = line.as_bytes();
    if bytes.len() < 7 || !bytes[..7].iter().all(|b| *b == ch) {
        return false;
    }
    match bytes.get(7) {
        None => true,
        Some(b' ') => allow_label,
        Some(_) => false,
    }
}

/// Locate every complete conflict block in `text`, in document order.
///
/// Unterminated blocks are ignored. A `<<<<<<<` inside an open block restarts
/// the block at the new line.
pub fn scan_markers(text: &str) -> Vec<MarkerRange> {
    let mut ranges = Vec::new();
    let mut state = State::Outside;

    for (idx, line) in text.split('\n').enumerate() {
        if is_marker(line, b'<', true) {
            if !matches!(state, State::Outside) {
                debug!(line = idx, "conflict block restarted before it was closed");
            }
            state = State::Current { start: idx };
            continue;
        }

        state = match state {
            State::Outside => State::Outside,
            State::Current { start } if is_marker(line, b'|', true) => {
                State::Base { start, base: idx }
            }
            State::Current { start } if is_marker(line, b'=', false) => State::Incoming {
                start,
                base: None,
                separator: idx,
            },
            State::Base { start, base } if is_marker(line, b'=', false) => State::Incoming {
                start,
                base: Some(base),
                separator: idx,
            },
            State::Incoming {
                start,
                base,
                separator,
            } if is_marker(line, b'>', true) => {
                ranges.push(MarkerRange {
                    start,
                    base,
                    separator,
                    end: idx,
                });
                State::Outside
            }
            other => other,
        };
    }

    if !matches!(state, State::Outside) {
        debug!("ignoring unterminated conflict block at end of text");
    }
    debug!(count = ranges.len(), "scanned conflict markers");
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_blocks(text: &str) -> bool {
        scan_markers(text).is_empty()
    }

    #[test]
    fn test_two_way_block() {
        let text = "a\n<<<<<<< HEAD\nours\n=======\ntheirs\n>>>>>>> feature\nb\n";
        assert_eq!(scan_markers(text), vec![MarkerRange::new(1, 3, 5)]);
    }

    #[test]
    fn test_diff3_block() {
        let text = "<<<<<<< ours\nx\n||||||| base\no\n=======\ny\n>>>>>>> theirs";
        assert_eq!(
            scan_markers(text),
            vec![MarkerRange::new(0, 4, 6).with_base(2)]
        );
    }

    #[test]
    fn test_multiple_blocks_and_crlf() {
        let text = "<<<<<<<\r\n1\r\n=======\r\n2\r\n>>>>>>>\r\nmid\r\n<<<<<<< a\r\n=======\r\n>>>>>>> b\r\n";
        let ranges = scan_markers(text);
        assert_eq!(ranges, vec![MarkerRange::new(0, 2, 4), MarkerRange::new(6, 7, 8)]);
    }

    #[test]
    fn test_unterminated_and_lookalikes_ignored() {
        assert!(scan_markers("<<<<<<< HEAD\nx\n=======\ny\n").is_empty());
        assert!(no_blocks("<<<<<<<<\n========\n>>>>>>>>\n"));
        assert!(no_blocks("=======\n"));
        // Indented markers are content, not markers.
        assert!(no_blocks("  <<<<<<< a\n  =======\n  >>>>>>> b\n"));
    }

    #[test]
    fn test_restarted_block() {
        let text = "<<<<<<< a\nx\n<<<<<<< b\ny\n=======\nz\n>>>>>>> c\n";
        assert_eq!(scan_markers(text), vec![MarkerRange::new(2, 4, 6)]);
    }
}
