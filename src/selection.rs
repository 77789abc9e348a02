//! Selection geometry and the selection state machine (§4.5, §4.7).

use crate::cursor::Position;
use crate::screen::Screen;
use crate::text_projection::{get_text_range, line_end, line_start, same_class};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Linear,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectionState {
    Idle,
    Armed { anchor: Position },
    Dragging { anchor: Position, current: Position },
    Finalized { anchor: Position, end: Position },
}

pub struct Selection {
    pub mode: SelectionMode,
    pub word_chars: String,
    state: SelectionState,
    /// Text projected over the range at the moment `finalize` committed it;
    /// compared against a fresh projection by [`Selection::invalidate_if_stale`]
    /// to detect a content-changed-under-the-selection edit (§4.7).
    cached_text: Option<String>,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            mode: SelectionMode::Linear,
            word_chars: String::new(),
            state: SelectionState::Idle,
            cached_text: None,
        }
    }
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, SelectionState::Idle)
    }

    /// Press: arm a selection at `anchor` without yet committing to a drag.
    pub fn arm(&mut self, anchor: Position) {
        self.state = SelectionState::Armed { anchor };
    }

    /// Pointer motion while armed or already dragging.
    pub fn drag(&mut self, current: Position) {
        self.state = match self.state {
            SelectionState::Armed { anchor } => SelectionState::Dragging { anchor, current },
            SelectionState::Dragging { anchor, .. } => SelectionState::Dragging { anchor, current },
            SelectionState::Idle | SelectionState::Finalized { .. } => return,
        };
    }

    /// Release: commit the current drag (or a zero-width click) as final,
    /// caching its projected text for later staleness checks.
    pub fn finalize(&mut self, screen: &Screen) {
        self.state = match self.state {
            SelectionState::Dragging { anchor, current } => {
                SelectionState::Finalized { anchor, end: current }
            }
            SelectionState::Armed { anchor } => SelectionState::Finalized { anchor, end: anchor },
            other => other,
        };
        self.cached_text = self
            .range()
            .map(|(start, end)| get_text_range(screen, (start.row, start.col), (end.row, end.col), false));
    }

    pub fn clear(&mut self) {
        self.state = SelectionState::Idle;
        self.cached_text = None;
    }

    /// Re-project the current selection against `screen` and clear it if the
    /// text no longer matches what was cached at `finalize` time, but only
    /// when `touched` (an inclusive absolute row range) actually intersects
    /// the selection (§4.7: a contents-changed row under the selection
    /// returns it to idle). Selections that were never finalized have no
    /// cached text and are left alone.
    pub fn invalidate_if_stale(&mut self, screen: &Screen, touched: (u64, u64)) -> bool {
        let Some(cached) = &self.cached_text else {
            return false;
        };
        let Some((start, end)) = self.range() else {
            return false;
        };
        let (touched_start, touched_end) = touched;
        if touched_end < start.row || touched_start > end.row {
            return false;
        }
        let current = get_text_range(screen, (start.row, start.col), (end.row, end.col), false);
        if &current != cached {
            self.clear();
            true
        } else {
            false
        }
    }

    /// Move the active selection's moving endpoint without otherwise
    /// changing its state (keyboard-driven shift-arrow extension).
    pub fn extend_selection(&mut self, to: Position) {
        self.state = match self.state {
            SelectionState::Dragging { anchor, .. } => SelectionState::Dragging { anchor, current: to },
            SelectionState::Finalized { anchor, .. } => SelectionState::Finalized { anchor, end: to },
            SelectionState::Armed { anchor } => SelectionState::Dragging { anchor, current: to },
            SelectionState::Idle => SelectionState::Idle,
        };
    }

    /// Ordered `(start, end)` endpoints of the active selection, or `None`
    /// if nothing is selected. `end` is exclusive.
    pub fn range(&self) -> Option<(Position, Position)> {
        match self.state {
            SelectionState::Dragging { anchor, current } => Some(ordered(anchor, current)),
            SelectionState::Finalized { anchor, end } => Some(ordered(anchor, end)),
            _ => None,
        }
    }

    /// Grow the active selection out to whole-word boundaries (double-click).
    pub fn expand_to_word(&mut self, screen: &Screen) {
        let Some((start, end)) = self.range() else {
            return;
        };
        let last = Position::new(end.row, end.col.saturating_sub(1));
        let new_start = word_start(screen, start, &self.word_chars);
        let new_end = word_end(screen, last, &self.word_chars);
        self.state = SelectionState::Finalized {
            anchor: new_start,
            end: Position::new(new_end.row, new_end.col + 1),
        };
    }

    /// Grow the active selection out to whole logical-line boundaries
    /// (triple-click), following soft-wrap continuations.
    pub fn expand_to_line(&mut self, screen: &Screen) {
        let Some((start, end)) = self.range() else {
            return;
        };
        let row_start = line_start(screen, start.row);
        let row_end = line_end(screen, end.row);
        self.state = SelectionState::Finalized {
            anchor: Position::new(row_start, 0),
            end: Position::new(row_end, screen.cols),
        };
    }

    /// Per-row `(row, col_start, col_end)` spans covered by the selection,
    /// honouring [`SelectionMode`]: block selections use the same column
    /// range on every row, linear selections run full-width on interior
    /// rows.
    pub fn spans(&self, cols: u16) -> Vec<(u64, u16, u16)> {
        let Some((start, end)) = self.range() else {
            return Vec::new();
        };
        let mut spans = Vec::new();
        match self.mode {
            SelectionMode::Block => {
                let (lo, hi) = if start.col <= end.col {
                    (start.col, end.col)
                } else {
                    (end.col, start.col)
                };
                let mut row = start.row;
                while row <= end.row {
                    spans.push((row, lo, hi));
                    row += 1;
                }
            }
            SelectionMode::Linear => {
                if start.row == end.row {
                    spans.push((start.row, start.col, end.col));
                } else {
                    spans.push((start.row, start.col, cols));
                    let mut row = start.row + 1;
                    while row < end.row {
                        spans.push((row, 0, cols));
                        row += 1;
                    }
                    spans.push((end.row, 0, end.col));
                }
            }
        }
        spans
    }
}

fn ordered(a: Position, b: Position) -> (Position, Position) {
    if (a.row, a.col) <= (b.row, b.col) {
        (a, b)
    } else {
        (b, a)
    }
}

fn char_at(screen: &Screen, pos: Position) -> Option<char> {
    if !screen.row_data.contains(pos.row) {
        return None;
    }
    let row = screen.row_data.get(pos.row);
    let cell = row.cells.get(pos.col as usize)?;
    if cell.is_fragment() {
        return None;
    }
    Some(cell.unistr.base_char(&screen.combining))
}

fn word_start(screen: &Screen, mut pos: Position, word_chars: &str) -> Position {
    let Some(c0) = char_at(screen, pos) else {
        return pos;
    };
    loop {
        if pos.col == 0 {
            if pos.row <= screen.row_data.delta() {
                break;
            }
            let prev_row = pos.row - 1;
            if !screen.row_data.contains(prev_row) || !screen.row_data.get(prev_row).soft_wrapped {
                break;
            }
            let cand = Position::new(prev_row, screen.cols.saturating_sub(1));
            match char_at(screen, cand) {
                Some(c) if same_class(c, c0, word_chars) => pos = cand,
                _ => break,
            }
        } else {
            let cand = Position::new(pos.row, pos.col - 1);
            match char_at(screen, cand) {
                Some(c) if same_class(c, c0, word_chars) => pos = cand,
                _ => break,
            }
        }
    }
    pos
}

fn word_end(screen: &Screen, mut pos: Position, word_chars: &str) -> Position {
    let Some(c0) = char_at(screen, pos) else {
        return pos;
    };
    loop {
        if pos.col + 1 >= screen.cols {
            if !screen.row_data.contains(pos.row) || !screen.row_data.get(pos.row).soft_wrapped {
                break;
            }
            let next_row = pos.row + 1;
            let cand = Position::new(next_row, 0);
            match char_at(screen, cand) {
                Some(c) if same_class(c, c0, word_chars) => pos = cand,
                _ => break,
            }
        } else {
            let cand = Position::new(pos.row, pos.col + 1);
            match char_at(screen, cand) {
                Some(c) if same_class(c, c0, word_chars) => pos = cand,
                _ => break,
            }
        }
    }
    pos
}

/// Snap a pixel offset within a cell to a column boundary using the
/// thirds rule: the outer thirds snap to the nearer column edge, the
/// middle third resolves by which endpoint is moving — an anchor rounds
/// down (includes the cell it's in), a moving endpoint rounds up (also
/// includes the cell), so a selection never shrinks away from a click
/// that's ambiguously centred.
pub fn snap_column(pixel_x: f64, cell_width: f64, is_moving_endpoint: bool) -> u16 {
    if cell_width <= 0.0 {
        return 0;
    }
    let units = (pixel_x / cell_width).max(0.0);
    let col = units.floor();
    let frac = units - col;
    let snapped = if frac < 1.0 / 3.0 {
        col
    } else if frac > 2.0 / 3.0 {
        col + 1.0
    } else if is_moving_endpoint {
        col + 1.0
    } else {
        col
    };
    snapped.max(0.0) as u16
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
    fn arm_drag_finalize_produces_ordered_range() {
        let s = screen_with(10, 10, "");
        let mut sel = Selection::new();
        sel.arm(Position::new(5, 3));
        sel.drag(Position::new(2, 1));
        sel.finalize(&s);
        let (start, end) = sel.range().unwrap();
        assert_eq!(start, Position::new(2, 1));
        assert_eq!(end, Position::new(5, 3));
    }

    #[test]
    fn expand_to_word_crosses_soft_wrap_boundary() {
        let s = screen_with(3, 5, "abcdef");
        let mut sel = Selection::new();
        sel.arm(Position::new(s.absolute(1), 0));
        sel.finalize(&s);
        sel.expand_to_word(&s);
        let (start, end) = sel.range().unwrap();
        assert_eq!(start, Position::new(s.absolute(0), 0));
        assert_eq!(end, Position::new(s.absolute(1), 1));
    }

    #[test]
    fn block_mode_keeps_same_columns_on_every_row() {
        let s = screen_with(10, 10, "");
        let mut sel = Selection::new();
        sel.mode = SelectionMode::Block;
        sel.arm(Position::new(0, 2));
        sel.drag(Position::new(2, 5));
        sel.finalize(&s);
        let spans = sel.spans(10);
        assert_eq!(spans, vec![(0, 2, 5), (1, 2, 5), (2, 2, 5)]);
    }

    #[test]
    fn invalidate_if_stale_clears_when_touched_text_differs() {
        let mut s = screen_with(3, 10, "hello");
        let mut sel = Selection::new();
        sel.arm(Position::new(s.absolute(0), 0));
        sel.drag(Position::new(s.absolute(0), 5));
        sel.finalize(&s);
        assert!(sel.is_active());

        s.cursor.position.col = 0;
        print_char(&mut s, 'X');
        // overwriting inside the selected range changes the projected text
        let cleared = sel.invalidate_if_stale(&s, (s.absolute(0), s.absolute(0)));
        assert!(cleared);
        assert!(!sel.is_active());
    }

    #[test]
    fn invalidate_if_stale_ignores_rows_outside_the_selection() {
        let mut s = screen_with(3, 10, "hi");
        let mut sel = Selection::new();
        sel.arm(Position::new(s.absolute(0), 0));
        sel.drag(Position::new(s.absolute(0), 2));
        sel.finalize(&s);

        print_char(&mut s, 'z');
        let touched_row = s.absolute(1);
        let cleared = sel.invalidate_if_stale(&s, (touched_row, touched_row));
        assert!(!cleared);
        assert!(sel.is_active());
    }

    #[test]
    fn thirds_rule_snaps_edges_and_resolves_middle_by_direction() {
        assert_eq!(snap_column(0.05, 1.0, false), 0);
        assert_eq!(snap_column(0.95, 1.0, false), 1);
        assert_eq!(snap_column(0.5, 1.0, false), 0);
        assert_eq!(snap_column(0.5, 1.0, true), 1);
    }
}
