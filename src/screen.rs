//! The complete logical state of one buffer (§3 "Screen", §4.2).

use crate::cell::{CellAttributes, CombiningTable};
use crate::cursor::{CursorState, Position};
use crate::modes::ScreenModes;
use crate::ring::RowRing;
use crate::row::Row;

/// A scrolling region, 0-based and inclusive, relative to the visible area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRegion {
    pub start: u16,
    pub end: u16,
}

impl ScrollRegion {
    pub fn full(rows: u16) -> Self {
        Self {
            start: 0,
            end: rows.saturating_sub(1),
        }
    }

    pub fn clamp(self, rows: u16) -> Self {
        let max = rows.saturating_sub(1);
        Self {
            start: self.start.min(max),
            end: self.end.min(max).max(self.start.min(max)),
        }
    }
}

pub struct Screen {
    pub row_data: RowRing,
    pub cursor: CursorState,
    pub combining: CombiningTable,

    /// Ring index of the top visible row when scrolled to the bottom.
    pub insert_delta: u64,
    /// Ring index currently shown at visible row 0 (<= insert_delta when the
    /// user has scrolled back).
    pub scroll_delta: u64,
    /// When false, `scroll_delta` snaps back to `insert_delta` on every
    /// full-screen scroll (the common "scroll to bottom on output" UX).
    pub scroll_on_output: bool,

    pub scrolling_restricted: bool,
    pub scrolling_region: ScrollRegion,

    /// Attributes applied to newly typed characters.
    pub defaults: CellAttributes,
    /// Attributes used for blanks produced by insertions (IRM padding).
    pub color_defaults: CellAttributes,
    /// Attributes used when scrolling/erasing reveals new cells.
    pub fill_defaults: CellAttributes,

    pub modes: ScreenModes,

    pub cols: u16,
    pub visible_rows: u16,
    /// True for the alternate screen: no scrollback is ever retained.
    has_scrollback: bool,
}

impl Screen {
    pub fn new(rows: u16, cols: u16, scrollback: usize, has_scrollback: bool) -> Self {
        let capacity = if has_scrollback {
            (rows as usize).max(scrollback)
        } else {
            rows as usize
        };
        let mut row_data = RowRing::new(capacity);
        for _ in 0..rows {
            row_data.append(Row::new(cols));
        }
        Self {
            row_data,
            cursor: CursorState::new(),
            combining: CombiningTable::new(),
            insert_delta: 0,
            scroll_delta: 0,
            scroll_on_output: true,
            scrolling_restricted: false,
            scrolling_region: ScrollRegion::full(rows),
            defaults: CellAttributes::default(),
            color_defaults: CellAttributes::default(),
            fill_defaults: CellAttributes::default(),
            modes: ScreenModes::default(),
            cols,
            visible_rows: rows,
            has_scrollback,
        }
    }

    pub fn absolute(&self, screen_row: u16) -> u64 {
        self.insert_delta + screen_row as u64
    }

    /// Active scrolling region, clamped to the current visible height.
    pub fn effective_region(&self) -> ScrollRegion {
        if self.scrolling_restricted {
            self.scrolling_region.clamp(self.visible_rows)
        } else {
            ScrollRegion::full(self.visible_rows)
        }
    }

    /// Pad the ring with blank rows until `abs` is a valid index. Used
    /// defensively; under normal operation the ring is always pre-populated
    /// out to `insert_delta + visible_rows`.
    pub fn ensure_row(&mut self, abs: u64) {
        while !self.row_data.contains(abs) && abs >= self.row_data.next() {
            self.row_data.append(Row::blank(self.cols, self.fill_defaults));
        }
    }

    pub fn visible_row(&self, screen_row: u16) -> &Row {
        self.row_data.get(self.absolute(screen_row))
    }

    pub fn visible_row_mut(&mut self, screen_row: u16) -> &mut Row {
        let abs = self.absolute(screen_row);
        self.ensure_row(abs);
        self.row_data.get_mut(abs)
    }

    /// Clamp the cursor into the current valid range. The only operation
    /// allowed to leave the cursor transiently invalid (right-margin parking
    /// for `xn`, or an in-flight resize) must finish by calling this.
    pub fn ensure_cursor(&mut self) {
        let max_col = self.cols.saturating_sub(1);
        self.cursor.position.col = self.cursor.position.col.min(max_col);
        let min_row = self.insert_delta;
        let max_row = self.insert_delta + self.visible_rows.saturating_sub(1) as u64;
        self.cursor.position.row = self.cursor.position.row.clamp(min_row, max_row);
    }

    /// Reconcile `scroll_delta`/`insert_delta` against ring bounds after an
    /// eviction or resize (§3 invariant: delta() <= scroll_delta <=
    /// insert_delta).
    pub fn adjust_adjustments(&mut self) {
        self.insert_delta = self.insert_delta.max(self.row_data.delta());
        self.scroll_delta = self
            .scroll_delta
            .clamp(self.row_data.delta(), self.insert_delta);
    }

    /// Scroll the region up by one line: the top region row is discarded (or,
    /// if the region starts at row 0, pushed into scrollback) and a blank row
    /// appears at the bottom. Returns the row that left the visible window
    /// when scrollback capture applies.
    pub fn scroll_up(&mut self, region: ScrollRegion) -> Option<Row> {
        if region.start == 0 {
            let old_top = self.insert_delta;
            let scrolled = self.row_data.get(old_top).clone();
            self.row_data.append(Row::blank(self.cols, self.fill_defaults));
            self.insert_delta += 1;
            if self.scroll_on_output || self.scroll_delta + 1 >= self.insert_delta {
                self.scroll_delta = self.insert_delta;
            }
            self.adjust_adjustments();
            if self.has_scrollback {
                Some(scrolled)
            } else {
                None
            }
        } else {
            let start_abs = self.absolute(region.start);
            let end_abs = self.absolute(region.end);
            self.row_data.remove(start_abs);
            self.row_data
                .insert(end_abs, Row::blank(self.cols, self.fill_defaults));
            None
        }
    }

    /// Scroll the region down by one line: a blank row appears at the top of
    /// the region and the bottom row of the region is discarded. Never
    /// produces scrollback.
    pub fn scroll_down(&mut self, region: ScrollRegion) {
        let start_abs = self.absolute(region.start);
        let end_abs = self.absolute(region.end);
        self.row_data.remove(end_abs);
        self.row_data
            .insert(start_abs, Row::blank(self.cols, self.fill_defaults));
    }

    /// Insert `n` blank rows at the cursor's row within the scrolling region
    /// (CSI L), shifting rows below it down and dropping rows that fall off
    /// the bottom of the region.
    pub fn insert_rows_at_cursor(&mut self, n: u16) {
        let region = self.effective_region();
        let cursor_row = (self.cursor.position.row - self.insert_delta) as u16;
        if cursor_row < region.start || cursor_row > region.end {
            return;
        }
        let sub_region = ScrollRegion {
            start: cursor_row,
            end: region.end,
        };
        for _ in 0..n {
            self.scroll_down(sub_region);
        }
    }

    /// Delete `n` rows at the cursor's row within the scrolling region
    /// (CSI M), pulling rows below it up and filling the bottom of the
    /// region with blanks.
    pub fn delete_rows_at_cursor(&mut self, n: u16) {
        let region = self.effective_region();
        let cursor_row = (self.cursor.position.row - self.insert_delta) as u16;
        if cursor_row < region.start || cursor_row > region.end {
            return;
        }
        let sub_region = ScrollRegion {
            start: cursor_row,
            end: region.end,
        };
        for _ in 0..n {
            self.scroll_up(sub_region);
        }
    }

    pub fn resize(&mut self, new_rows: u16, new_cols: u16, scrollback: usize) {
        for screen_row in 0..self.visible_rows {
            let abs = self.absolute(screen_row);
            if self.row_data.contains(abs) {
                self.row_data.get_mut(abs).resize(new_cols, self.fill_defaults);
            }
        }

        if new_rows > self.visible_rows {
            let needed = new_rows - self.visible_rows;
            for _ in 0..needed {
                self.row_data.append(Row::blank(new_cols, self.fill_defaults));
            }
        } else if new_rows < self.visible_rows && !self.has_scrollback {
            // Alternate screen: no scrollback, so shrink discards rows
            // beyond the new visible height instead of banking them.
            self.row_data.truncate_front_to(new_rows as usize);
        }

        let capacity = if self.has_scrollback {
            (new_rows as usize).max(scrollback)
        } else {
            new_rows as usize
        };
        self.row_data.set_capacity(capacity);

        self.visible_rows = new_rows;
        self.cols = new_cols;
        self.insert_delta = self.row_data.next().saturating_sub(new_rows as u64);
        self.scrolling_region = self.scrolling_region.clamp(new_rows);
        self.adjust_adjustments();
        self.ensure_cursor();
        self.mark_all_dirty();
    }

    pub fn mark_all_dirty(&mut self) {
        for screen_row in 0..self.visible_rows {
            let abs = self.absolute(screen_row);
            if self.row_data.contains(abs) {
                self.row_data.get_mut(abs).dirty = true;
            }
        }
    }

    pub fn set_scrollback(&mut self, lines: usize) {
        if !self.has_scrollback {
            return;
        }
        let capacity = (self.visible_rows as usize).max(lines);
        self.row_data.set_capacity(capacity);
        self.adjust_adjustments();
    }

    /// The cursor-down primitive shared by explicit line feed (IND/LF) and
    /// the insertion engine's autowrap path (§4.4 "Cursor-down primitive").
    /// Returns the row that left the visible window into scrollback, if any.
    pub fn cursor_down(&mut self) -> Option<Row> {
        let screen_row = self.cursor_screen_row();
        if self.scrolling_restricted {
            let region = self.effective_region();
            if screen_row == region.end {
                return self.scroll_up(region);
            }
            if screen_row < self.visible_rows.saturating_sub(1) {
                self.cursor.position.row += 1;
            }
            None
        } else if screen_row >= self.visible_rows.saturating_sub(1) {
            let scrolled = self.scroll_up(ScrollRegion::full(self.visible_rows));
            self.cursor.position.row += 1;
            scrolled
        } else {
            self.cursor.position.row += 1;
            None
        }
    }

    /// Cursor-up primitive for reverse index (ESC M) / scroll-down ops.
    pub fn cursor_up(&mut self) {
        let screen_row = self.cursor_screen_row();
        let region = self.effective_region();
        if screen_row == region.start {
            self.scroll_down(region);
        } else if self.cursor.position.row > self.row_data.delta() {
            self.cursor.position.row -= 1;
        }
    }

    pub fn at_bottom(&self) -> bool {
        self.scroll_delta == self.insert_delta
    }

    pub fn cursor_screen_row(&self) -> u16 {
        (self.cursor.position.row.saturating_sub(self.insert_delta)) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen() -> Screen {
        Screen::new(3, 5, 100, true)
    }

    #[test]
    fn scroll_up_at_region_start_zero_grows_history() {
        let mut s = screen();
        s.cursor.position.row = s.absolute(2);
        let next_before = s.row_data.next();
        let scrolled = s.scroll_up(ScrollRegion::full(3));
        assert!(scrolled.is_some());
        assert_eq!(s.row_data.next(), next_before + 1);
        assert_eq!(s.insert_delta, 1);
    }

    #[test]
    fn interior_region_scroll_preserves_ring_bounds() {
        let mut s = screen();
        let delta_before = s.row_data.delta();
        let next_before = s.row_data.next();
        let region = ScrollRegion { start: 1, end: 2 };
        let scrolled = s.scroll_up(region);
        assert!(scrolled.is_none());
        assert_eq!(s.row_data.delta(), delta_before);
        assert_eq!(s.row_data.next(), next_before);
    }

    #[test]
    fn alternate_screen_never_reports_scrollback() {
        let mut alt = Screen::new(3, 5, 100, false);
        let scrolled = alt.scroll_up(ScrollRegion::full(3));
        assert!(scrolled.is_none());
    }

    #[test]
    fn resize_grow_then_shrink_keeps_cursor_in_range() {
        let mut s = screen();
        s.cursor.position = Position::new(s.absolute(2), 4);
        s.resize(10, 10, 100);
        s.cursor.position = Position::new(s.absolute(9), 9);
        s.resize(2, 10, 100);
        s.ensure_cursor();
        assert!(s.cursor_screen_row() < 2);
        assert!(s.cursor.position.col < 10);
    }
}
