//! The insertion engine (§4.4): turns one decoded code point into cell
//! mutations against a [`Screen`] — width resolution, autowrap, combining
//! marks, wide characters and tab-run cleanup all live here. Control
//! characters and escape/CSI dispatch are handled one layer up; this module
//! only ever sees printable code points plus the explicit tab/cursor-down
//! primitives that share its bookkeeping.

use unicode_width::UnicodeWidthChar;

use crate::cell::{Cell, CellAttributes, CellFlags, UniStr};
use crate::charset::translate_special_graphics;
use crate::row::Row;
use crate::screen::Screen;
use crate::tabstops::TabStops;

/// Outcome of printing one code point, for the caller (pipeline/terminal
/// layer) to fold into its bounding-box and scrollback bookkeeping.
#[derive(Debug, Default)]
pub struct InsertOutcome {
    /// A row pushed out of the visible window into scrollback, if the write
    /// triggered a full-screen scroll.
    pub scrolled: Option<Row>,
}

/// Print one code point at the cursor, applying the full §4.4 pipeline.
pub fn print_char(screen: &mut Screen, c: char) -> InsertOutcome {
    let c = if screen.modes.alternate_charset {
        translate_special_graphics(c)
    } else {
        c
    };

    if screen.modes.status_line {
        screen.modes.status_line_contents.push(c);
        screen.modes.status_line_changed = true;
        return InsertOutcome::default();
    }

    let width = UnicodeWidthChar::width(c).unwrap_or(1).min(2) as u16;

    if width == 0 {
        combine_mark(screen, c);
        return InsertOutcome::default();
    }

    // Autowrap pre-check: does the incoming glyph fit before the margin?
    if screen.cursor.position.col as u32 + width as u32 > screen.cols as u32 {
        if screen.modes.autowrap {
            let row = screen.cursor_screen_row();
            screen.visible_row_mut(row).soft_wrapped = true;
            let scrolled = screen.cursor_down();
            screen.cursor.position.col = 0;
            if scrolled.is_some() {
                return place(screen, c, width).with_scrolled(scrolled);
            }
        } else {
            screen.cursor.position.col = screen.cols.saturating_sub(width);
        }
    }

    place(screen, c, width)
}

impl InsertOutcome {
    fn with_scrolled(mut self, scrolled: Option<Row>) -> Self {
        if self.scrolled.is_none() {
            self.scrolled = scrolled;
        }
        self
    }
}

fn place(screen: &mut Screen, c: char, width: u16) -> InsertOutcome {
    let row_idx = screen.cursor_screen_row();
    let col = screen.cursor.position.col as usize;
    let insert_mode = screen.modes.insert_mode;
    let defaults = screen.defaults;
    let color_defaults = screen.color_defaults;
    let fill_defaults = screen.fill_defaults;

    {
        let row = screen.visible_row_mut(row_idx);
        clear_tab_fragment_run(row, col, fill_defaults);
        if width == 2 {
            clear_tab_fragment_run(row, col + 1, fill_defaults);
        }
        clear_overlapping_wide_chars(row, col, width as usize, fill_defaults);
    }

    if insert_mode {
        let row = screen.visible_row_mut(row_idx);
        let len = row.cells.len();
        for _ in 0..width {
            row.cells.pop();
            let at = col.min(row.cells.len());
            row.cells.insert(at, Cell::blank(color_defaults));
        }
        debug_assert_eq!(row.cells.len(), len);
    }

    {
        let row = screen.visible_row_mut(row_idx);
        if row.cells.len() < col + width as usize {
            row.cells.resize(col + width as usize, Cell::blank(fill_defaults));
        }
        let primary = Cell {
            unistr: UniStr::Scalar(c),
            fore: defaults.fore,
            back: defaults.back,
            flags: defaults.flags,
            columns: width as u8,
        };
        row.cells[col] = primary;
        if width == 2 {
            let frag = Cell::wide_fragment(&row.cells[col]);
            if col + 1 < row.cells.len() {
                row.cells[col + 1] = frag;
            }
        }
        row.dirty = true;
    }

    advance_cursor(screen, width);
    InsertOutcome::default()
}

/// Advance the cursor past a just-written glyph, applying the `xn`
/// deferred-wrap parking rule at the right margin.
fn advance_cursor(screen: &mut Screen, width: u16) {
    screen.cursor.position.col += width;
    if screen.cursor.position.col < screen.cols {
        return;
    }
    if !screen.modes.autowrap {
        screen.cursor.position.col = screen.cols.saturating_sub(1);
    } else if screen.modes.xn {
        // Cursor parks one past the margin; the wrap itself happens on the
        // *next* printable character's autowrap pre-check (§4.4, §8).
    } else {
        let row = screen.cursor_screen_row();
        screen.visible_row_mut(row).soft_wrapped = true;
        screen.cursor_down();
        screen.cursor.position.col = 0;
    }
}

/// Merge a zero-width combining mark into the preceding cell, per §4.4's
/// combining-mark rules: attach to the cell at `col - 1`, or to the last
/// cell of the row above if the cursor sits at column 0 of a soft-wrapped
/// continuation. Dropped silently if there is nothing sensible to attach to.
fn combine_mark(screen: &mut Screen, mark: char) {
    let row_idx = screen.cursor_screen_row();
    let col = screen.cursor.position.col;

    let (target_row, target_col) = if col == 0 {
        if row_idx == 0 {
            return;
        }
        let prev_row = row_idx - 1;
        if !screen.visible_row(prev_row).soft_wrapped {
            return;
        }
        (prev_row, screen.cols.saturating_sub(1))
    } else {
        (row_idx, col - 1)
    };

    merge_into_cell(screen, target_row, target_col, mark);
}

fn merge_into_cell(screen: &mut Screen, row_idx: u16, mut col: u16, mark: char) {
    let abs = screen.absolute(row_idx);
    screen.ensure_row(abs);

    let mut cell = screen.row_data.get(abs).cells[col as usize];
    if cell.flags.contains(CellFlags::TAB_FRAGMENT) {
        return;
    }
    if cell.is_fragment() {
        if col == 0 {
            return;
        }
        col -= 1;
        cell = screen.row_data.get(abs).cells[col as usize];
    }
    if cell.columns == 0 {
        return;
    }

    let new_id = screen.combining.attach(cell.unistr, mark);
    let is_wide = cell.columns == 2;
    let row = screen.row_data.get_mut(abs);
    row.cells[col as usize].unistr = UniStr::Combined(new_id);
    row.dirty = true;
    if is_wide {
        if let Some(next) = row.cells.get_mut(col as usize + 1) {
            next.unistr = UniStr::Combined(new_id);
        }
    }
}

/// Write a literal tab: mark the skipped columns as a tab-fragment run so
/// later combining marks and overwrites can identify and collapse it.
pub fn execute_tab(screen: &mut Screen, tabstops: &TabStops) {
    let row_idx = screen.cursor_screen_row();
    let old_col = screen.cursor.position.col;
    let next_stop = tabstops.next_after(old_col).min(screen.cols.saturating_sub(1));
    if next_stop <= old_col {
        return;
    }
    let fill = screen.fill_defaults;
    {
        let row = screen.visible_row_mut(row_idx);
        for i in old_col..next_stop {
            if (i as usize) < row.cells.len() {
                row.cells[i as usize] = Cell {
                    flags: CellFlags::TAB_FRAGMENT,
                    ..Cell::blank(fill)
                };
            }
        }
        row.dirty = true;
    }
    screen.cursor.position.col = next_stop;
}

/// Clear cell `col` and the rest of its contiguous tab-fragment run if it is
/// part of one — called before a write lands inside a previously expanded
/// tab (§4.4 "Tab cleanup").
fn clear_tab_fragment_run(row: &mut Row, col: usize, fill: CellAttributes) {
    if col >= row.cells.len() || !row.cells[col].flags.contains(CellFlags::TAB_FRAGMENT) {
        return;
    }
    let mut lo = col;
    while lo > 0 && row.cells[lo - 1].flags.contains(CellFlags::TAB_FRAGMENT) {
        lo -= 1;
    }
    let mut hi = col;
    while hi + 1 < row.cells.len() && row.cells[hi + 1].flags.contains(CellFlags::TAB_FRAGMENT) {
        hi += 1;
    }
    for cell in &mut row.cells[lo..=hi] {
        *cell = Cell::blank(fill);
    }
}

/// Break any wide character whose fragment or primary cell overlaps
/// `[col, col+width)`, so a write never leaves a half-wide-character cell
/// behind (§4.4 "Writing into a wide character").
fn clear_overlapping_wide_chars(row: &mut Row, col: usize, width: usize, fill: CellAttributes) {
    let len = row.cells.len();
    if col > 0 && row.cells[col - 1].columns == 2 && !row.cells[col - 1].is_fragment() {
        row.cells[col - 1] = Cell::blank(fill);
        if col < len {
            row.cells[col] = Cell::blank(fill);
        }
    }
    for i in col..(col + width).min(len) {
        if row.cells[i].is_fragment() {
            row.cells[i] = Cell::blank(fill);
            if i > 0 {
                row.cells[i - 1] = Cell::blank(fill);
            }
        } else if row.cells[i].columns == 2 {
            row.cells[i] = Cell::blank(fill);
            if i + 1 < len {
                row.cells[i + 1] = Cell::blank(fill);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::Screen;

    fn screen(rows: u16, cols: u16) -> Screen {
        Screen::new(rows, cols, 100, true)
    }

    #[test]
    fn plain_text_advances_cursor_and_fills_cells() {
        let mut s = screen(3, 10);
        for c in "abc".chars() {
            print_char(&mut s, c);
        }
        let row = s.visible_row(0);
        assert_eq!(row.cells[0].unistr, UniStr::Scalar('a'));
        assert_eq!(row.cells[2].unistr, UniStr::Scalar('c'));
        assert_eq!(s.cursor.position.col, 3);
    }

    #[test]
    fn xn_defers_wrap_to_next_character() {
        let mut s = screen(3, 5);
        for c in "abcde".chars() {
            print_char(&mut s, c);
        }
        assert_eq!(s.cursor.position.col, 5);
        assert!(!s.visible_row(0).soft_wrapped);

        print_char(&mut s, 'f');
        assert!(s.visible_row(0).soft_wrapped);
        assert_eq!(s.visible_row(1).cells[0].unistr, UniStr::Scalar('f'));
        assert_eq!(s.cursor.position.col, 1);
    }

    #[test]
    fn wide_character_crossing_margin_wraps_predictively() {
        let mut s = screen(3, 5);
        for c in "abcd".chars() {
            print_char(&mut s, c);
        }
        print_char(&mut s, '\u{4e2d}');
        assert!(s.visible_row(0).soft_wrapped);
        assert!(s.visible_row(0).cells[4].is_blank());
        assert_eq!(s.visible_row(1).cells[0].unistr, UniStr::Scalar('\u{4e2d}'));
        assert!(s.visible_row(1).cells[1].is_fragment());
        assert_eq!(s.cursor.position.col, 2);
    }

    #[test]
    fn combining_mark_attaches_to_previous_cell() {
        let mut s = screen(3, 10);
        print_char(&mut s, 'e');
        print_char(&mut s, '\u{0301}');
        let cell = s.visible_row(0).cells[0];
        assert_eq!(s.combining.render(cell.unistr), "e\u{0301}");
        assert_eq!(s.cursor.position.col, 1);
    }

    #[test]
    fn combining_mark_crosses_soft_wrap_boundary() {
        let mut s = screen(3, 5);
        for c in "abcde".chars() {
            print_char(&mut s, c);
        }
        print_char(&mut s, 'f'); // forces the deferred wrap
        s.cursor.position.col = 0;
        // simulate cursor parked at column 0 of the wrapped continuation row
        print_char(&mut s, '\u{0301}');
        let cell = s.visible_row(0).cells[4];
        assert_eq!(s.combining.render(cell.unistr), "e\u{0301}");
    }

    #[test]
    fn tab_then_overwrite_collapses_whole_run() {
        let mut s = screen(3, 20);
        let stops = TabStops::new(20);
        execute_tab(&mut s, &stops);
        assert_eq!(s.cursor.position.col, 8);
        assert!(s.visible_row(0).cells[3]
            .flags
            .contains(CellFlags::TAB_FRAGMENT));

        s.cursor.position.col = 3;
        print_char(&mut s, 'x');
        let row = s.visible_row(0);
        assert!(!row.cells[0].flags.contains(CellFlags::TAB_FRAGMENT));
        assert!(!row.cells[7].flags.contains(CellFlags::TAB_FRAGMENT));
        assert_eq!(row.cells[3].unistr, UniStr::Scalar('x'));
    }

    #[test]
    fn insert_mode_shifts_existing_cells_right() {
        let mut s = screen(3, 10);
        for c in "abc".chars() {
            print_char(&mut s, c);
        }
        s.cursor.position.col = 0;
        s.modes.insert_mode = true;
        print_char(&mut s, 'X');
        let row = s.visible_row(0);
        assert_eq!(row.cells[0].unistr, UniStr::Scalar('X'));
        assert_eq!(row.cells[1].unistr, UniStr::Scalar('a'));
        assert_eq!(row.cells[3].unistr, UniStr::Scalar('c'));
    }
}
