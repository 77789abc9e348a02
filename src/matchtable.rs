//! Match regex table and the match-under-cursor engine (§4.6).
//!
//! Patterns are kept in a slot table so removing one is O(1) (the slot
//! becomes a "hole" and is reused by the next `add`) instead of shifting
//! every tag after it. A one-entry cache remembers the last scanned
//! logical line so repeated `match_check` calls while the mouse sits still
//! don't re-run every pattern on every call.

use crate::cell::CellAttributes;
use crate::cursor::Position;
use crate::error::{Error, Result};
use crate::screen::Screen;
use crate::text_projection::{get_text_range, line_end, line_start};

use regex::Regex;

struct Entry {
    pattern: String,
    regex: Regex,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchSpan {
    pub tag: i64,
    pub start: Position,
    pub end: Position,
    pub text: String,
}

struct LineCache {
    line_start_row: u64,
    text: String,
    spans: Vec<MatchSpan>,
}

pub struct MatchTable {
    entries: Vec<Option<Entry>>,
    holes: Vec<usize>,
    cache: Option<LineCache>,
}

impl Default for MatchTable {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            holes: Vec::new(),
            cache: None,
        }
    }
}

impl MatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and register a pattern, returning its tag. Tags are stable
    /// for the lifetime of the entry and may be reused by a later `add`
    /// once removed.
    pub fn add(&mut self, pattern: &str) -> Result<i64> {
        let regex = Regex::new(pattern).map_err(Error::Regex)?;
        let entry = Entry {
            pattern: pattern.to_string(),
            regex,
        };
        let tag = if let Some(idx) = self.holes.pop() {
            self.entries[idx] = Some(entry);
            idx
        } else {
            self.entries.push(Some(entry));
            self.entries.len() - 1
        };
        self.cache = None;
        Ok(tag as i64)
    }

    pub fn remove(&mut self, tag: i64) -> bool {
        let idx = tag as usize;
        if let Some(slot) = self.entries.get_mut(idx) {
            if slot.take().is_some() {
                self.holes.push(idx);
                self.cache = None;
                return true;
            }
        }
        false
    }

    pub fn remove_all(&mut self) {
        self.entries.clear();
        self.holes.clear();
        self.cache = None;
    }

    pub fn pattern(&self, tag: i64) -> Option<&str> {
        self.entries
            .get(tag as usize)?
            .as_ref()
            .map(|e| e.pattern.as_str())
    }

    /// Project the logical line containing `row` into plain text — cheap
    /// relative to running every pattern, so it's always redone to decide
    /// whether a rescan is actually needed.
    fn project_line(&self, screen: &Screen, row: u64) -> (u64, String) {
        let start_row = line_start(screen, row);
        let end_row = line_end(screen, row);
        let text = get_text_range(screen, (start_row, 0), (end_row, screen.cols), true);
        (start_row, text)
    }

    /// Run every registered pattern over `text`, in table order (lowest tag
    /// first — first-registered patterns win ties at the same position).
    fn run_patterns(&self, start_row: u64, text: &str) -> Vec<MatchSpan> {
        let mut spans = Vec::new();
        for (tag, entry) in self.entries.iter().enumerate() {
            let Some(entry) = entry else { continue };
            for m in entry.regex.find_iter(text) {
                let (start, end) = char_span_to_positions(start_row, text, m.start(), m.end());
                spans.push(MatchSpan {
                    tag: tag as i64,
                    start,
                    end,
                    text: m.as_str().to_string(),
                });
            }
        }
        spans
    }

    /// Does any registered pattern cover `pos`? Returns the highest-priority
    /// (lowest-tag) match containing it. The (comparatively expensive)
    /// regex pass only reruns when the projected line text actually changed
    /// since the last call — repeated checks while the mouse sits still
    /// over a static line are nearly free.
    pub fn match_check(&mut self, screen: &Screen, pos: Position) -> Option<MatchSpan> {
        let (start_row, text) = self.project_line(screen, pos.row);

        let unchanged = matches!(&self.cache, Some(c) if c.line_start_row == start_row && c.text == text);
        if !unchanged {
            let spans = self.run_patterns(start_row, &text);
            self.cache = Some(LineCache {
                line_start_row: start_row,
                text,
                spans,
            });
        }

        self.cache
            .as_ref()
            .and_then(|c| c.spans.iter().find(|s| contains(s, pos)).cloned())
    }
}

fn contains(span: &MatchSpan, pos: Position) -> bool {
    (span.start.row, span.start.col) <= (pos.row, pos.col) && (pos.row, pos.col) < (span.end.row, span.end.col)
}

/// Map a `[byte_start, byte_end)` range in the projected line text back to
/// absolute `(row, col)` positions, accounting for the `\n` the projector
/// inserts at hard line breaks (soft-wrapped continuations get none).
fn char_span_to_positions(
    start_row: u64,
    text: &str,
    byte_start: usize,
    byte_end: usize,
) -> (Position, Position) {
    let mut row = start_row;
    let mut col: u16 = 0;
    let mut start_pos = None;
    let mut end_pos = None;

    for (byte_idx, ch) in text.char_indices() {
        if byte_idx == byte_start {
            start_pos = Some(Position::new(row, col));
        }
        if byte_idx == byte_end {
            end_pos = Some(Position::new(row, col));
        }
        if ch == '\n' {
            row += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    if byte_end == text.len() {
        end_pos.get_or_insert(Position::new(row, col));
    }
    (
        start_pos.unwrap_or(Position::new(start_row, 0)),
        end_pos.unwrap_or(Position::new(row, col)),
    )
}

/// Attribute overlay a renderer can use to highlight an active match
/// (§4.6 "match_attributes" projection).
pub fn match_attributes(base: CellAttributes, highlight_fg: u16, highlight_bg: u16) -> CellAttributes {
    CellAttributes {
        fore: highlight_fg,
        back: highlight_bg,
        flags: base.flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insertion::print_char;

    fn screen_with(rows: u16, cols: u16, text: &str) -> Screen {
        let mut s = Screen::new(rows, cols, 100, true);
        for c in text.chars() {
            print_char(&mut s, c);
        }
        s
    }

    #[test]
    fn match_check_finds_pattern_under_cursor() {
        let s = screen_with(3, 40, "visit https://example.com for docs");
        let mut table = MatchTable::new();
        table.add(r"https?://\S+").unwrap();
        let pos = Position::new(s.absolute(0), 10);
        let m = table.match_check(&s, pos).expect("url should match");
        assert_eq!(m.text, "https://example.com");
    }

    #[test]
    fn removed_tag_is_reused_and_stops_matching() {
        let mut table = MatchTable::new();
        let tag = table.add(r"\d+").unwrap();
        assert!(table.remove(tag));
        let new_tag = table.add(r"[a-z]+").unwrap();
        assert_eq!(tag, new_tag);
        assert!(table.pattern(tag).unwrap().contains("a-z"));
    }

    #[test]
    fn cache_is_reused_when_line_text_is_unchanged() {
        let s = screen_with(3, 40, "hello world");
        let mut table = MatchTable::new();
        table.add(r"\w+").unwrap();
        let pos = Position::new(s.absolute(0), 2);
        let first = table.match_check(&s, pos).unwrap();
        assert!(table.cache.is_some());
        let second = table.match_check(&s, pos).unwrap();
        assert_eq!(first, second);
    }
}
