//! Cursor position and saved-cursor state (DECSC/DECRC).

use crate::cell::CellAttributes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorShape {
    Block,
    Underline,
    Bar,
}

impl Default for CursorShape {
    fn default() -> Self {
        CursorShape::Block
    }
}

/// A cursor position in absolute ring coordinates. May transiently sit
/// outside the visible area (e.g. parked at the right margin pending a
/// deferred `xn` wrap) — callers needing a visible-area position should
/// clamp explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub row: u64,
    pub col: u16,
}

impl Position {
    pub fn new(row: u64, col: u16) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, Copy)]
struct SavedCursor {
    position: Position,
    attrs: CellAttributes,
    origin_mode: bool,
}

#[derive(Debug, Clone)]
pub struct CursorState {
    pub position: Position,
    pub attrs: CellAttributes,
    pub shape: CursorShape,
    pub visible: bool,
    saved: Option<SavedCursor>,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            position: Position::default(),
            attrs: CellAttributes::default(),
            shape: CursorShape::default(),
            visible: true,
            saved: None,
        }
    }
}

impl CursorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&mut self, origin_mode: bool) {
        self.saved = Some(SavedCursor {
            position: self.position,
            attrs: self.attrs,
            origin_mode,
        });
    }

    /// Restores position and attributes; returns the saved origin-mode flag
    /// so the caller (DECSC/DECRC is mode-sensitive) can reapply it.
    pub fn restore(&mut self) -> Option<bool> {
        let saved = self.saved.take()?;
        self.position = saved.position;
        self.attrs = saved.attrs;
        Some(saved.origin_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_without_prior_save_is_a_no_op() {
        let mut cursor = CursorState::new();
        let before = cursor.position;
        assert!(cursor.restore().is_none());
        assert_eq!(cursor.position, before);
    }

    #[test]
    fn save_then_restore_round_trips_position() {
        let mut cursor = CursorState::new();
        cursor.position = Position::new(5, 10);
        cursor.save(false);
        cursor.position = Position::new(0, 0);
        let origin = cursor.restore();
        assert_eq!(origin, Some(false));
        assert_eq!(cursor.position, Position::new(5, 10));
    }
}
