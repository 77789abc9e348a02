//! Cell-to-text projection (§4.5): turning a range of cells into a string,
//! word-class boundaries for double-click selection, and the plain-text
//! persisted dump format.

use crate::cell::CellAttributes;
use crate::cursor::Position;
use crate::screen::Screen;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharClass {
    Word,
    Space,
    Other,
}

/// Classify a character for word-boundary purposes. Letters and digits are
/// always word characters; `extra_word_chars` lets callers opt additional
/// punctuation in (e.g. `_`, `-`, `/` for path-aware double-click), matching
/// the configurable "word chars" knob real terminals expose.
pub fn classify(c: char, extra_word_chars: &str) -> CharClass {
    if c.is_whitespace() {
        CharClass::Space
    } else if c.is_alphanumeric() || extra_word_chars.contains(c) {
        CharClass::Word
    } else {
        CharClass::Other
    }
}

pub fn is_word_char(c: char, extra_word_chars: &str) -> bool {
    classify(c, extra_word_chars) == CharClass::Word
}

pub fn same_class(a: char, b: char, extra_word_chars: &str) -> bool {
    classify(a, extra_word_chars) == classify(b, extra_word_chars)
}

/// A projected cell's rendered text and the attributes it was written with,
/// used by callers that need styled text (e.g. HTML copy) rather than a
/// plain string.
#[derive(Debug, Clone, PartialEq)]
pub struct TextCell {
    pub text: String,
    pub attrs: CellAttributes,
}

/// Extract plain text between two absolute `(row, col)` positions,
/// inclusive of `start`, exclusive of `end`. Soft-wrapped rows are joined
/// without inserting a newline; hard-wrapped rows get one. Trailing blank
/// cells on a line are elided unless `trailing_blanks` is true.
pub fn get_text_range(
    screen: &Screen,
    start: (u64, u16),
    end: (u64, u16),
    trailing_blanks: bool,
) -> String {
    let mut out = String::new();
    let (start_row, start_col) = start;
    let (end_row, end_col) = end;
    if start_row > end_row || (start_row == end_row && start_col >= end_col) {
        return out;
    }

    let mut row = start_row;
    while row <= end_row {
        if !screen.row_data.contains(row) {
            row += 1;
            continue;
        }
        let r = screen.row_data.get(row);
        let col_start = if row == start_row { start_col as usize } else { 0 };
        let col_end = if row == end_row {
            (end_col as usize).min(r.len())
        } else {
            r.len()
        };
        let line_end = if trailing_blanks {
            col_end
        } else {
            col_end.saturating_sub(
                r.cells[col_start..col_end]
                    .iter()
                    .rev()
                    .take_while(|c| c.is_blank())
                    .count(),
            )
        };
        for cell in &r.cells[col_start..line_end.max(col_start)] {
            if cell.is_fragment() {
                continue;
            }
            out.push_str(&screen.combining.render(cell.unistr));
        }
        if row < end_row && !r.soft_wrapped {
            out.push('\n');
        }
        row += 1;
    }
    out
}

/// Text of a single cell (collapsing combining marks), or an empty string
/// if the cell is the fragment half of a wide character.
pub fn cell_text(screen: &Screen, pos: Position) -> String {
    if !screen.row_data.contains(pos.row) {
        return String::new();
    }
    let row = screen.row_data.get(pos.row);
    let Some(cell) = row.cells.get(pos.col as usize) else {
        return String::new();
    };
    if cell.is_fragment() {
        return String::new();
    }
    screen.combining.render(cell.unistr)
}

/// First absolute row of the logical line containing `row`, walking
/// backward across soft-wrap continuations (§4.5, shared by selection
/// line-expansion and the match engine's per-line scanning).
pub fn line_start(screen: &Screen, mut row: u64) -> u64 {
    while row > screen.row_data.delta() && screen.row_data.get(row - 1).soft_wrapped {
        row -= 1;
    }
    row
}

/// Last absolute row of the logical line containing `row`.
pub fn line_end(screen: &Screen, mut row: u64) -> u64 {
    while screen.row_data.contains(row)
        && screen.row_data.get(row).soft_wrapped
        && row + 1 < screen.row_data.next()
    {
        row += 1;
    }
    row
}

/// Plain-text dump of an absolute row range, one line per row, used for the
/// persisted "write contents" export (§4.5). Each row is trimmed of
/// trailing blanks; hard-wrapped row boundaries get a newline.
pub fn dump_plain_text(screen: &Screen, start_row: u64, end_row: u64) -> String {
    let mut out = String::new();
    let mut row = start_row;
    while row < end_row {
        if screen.row_data.contains(row) {
            let r = screen.row_data.get(row);
            let keep = r.len() - r.trailing_blank_count();
            for cell in &r.cells[..keep] {
                if !cell.is_fragment() {
                    out.push_str(&screen.combining.render(cell.unistr));
                }
            }
            if !r.soft_wrapped {
                out.push('\n');
            }
        }
        row += 1;
    }
    out
}
