//! Observable events a [`crate::terminal::Terminal`] emits as it processes
//! input (§4.1 step 4, §6 "Interfaces toward collaborators").

/// An inclusive rectangle of screen-relative rows/cols that changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRect {
    pub row_start: u16,
    pub row_end: u16,
    pub col_start: u16,
    pub col_end: u16,
}

impl DirtyRect {
    pub fn rows(row_start: u16, row_end: u16, cols: u16) -> Self {
        Self {
            row_start,
            row_end,
            col_start: 0,
            col_end: cols.saturating_sub(1),
        }
    }

    pub fn union(self, other: DirtyRect) -> DirtyRect {
        DirtyRect {
            row_start: self.row_start.min(other.row_start),
            row_end: self.row_end.max(other.row_end),
            col_start: self.col_start.min(other.col_start),
            col_end: self.col_end.max(other.col_end),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    CursorMoved,
    /// A bounding box of cells changed; coalesced by the pipeline with a
    /// slack margin rather than emitted per-cell (§4.1 step 4).
    ContentsChanged(DirtyRect),
    TextInserted,
    TextDeleted,
    TextModified,
    /// `n` rows scrolled out of the visible window (sign encodes direction:
    /// positive scrolls content up/back into history).
    TextScrolled(i64),
    WindowTitleChanged(String),
    IconTitleChanged(String),
    EmulationChanged(String),
    EncodingChanged(String),
    SelectionChanged,
    CharSizeChanged { rows: u16, cols: u16 },
    Bell,
    /// The external collaborator that owns the byte source reported EOF;
    /// the core does not detect this itself (§1 Non-goals: pty ownership).
    Eof,
    /// The external collaborator reported the child process exited with
    /// this status; same caveat as [`Event::Eof`].
    ChildExited(i32),
}
