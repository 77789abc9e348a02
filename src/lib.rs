//! A VT-style terminal emulator core: byte-stream decoding, sequence
//! matching, screen/scrollback state and dispatch, with no pty, rendering
//! or shell concerns of its own (§1 Overview).
//!
//! The entry point is [`Terminal`]: feed it bytes with [`Terminal::feed`],
//! read back the grid through [`Terminal::screen`], and react to
//! [`Event`]s for everything that isn't a direct cell mutation (title
//! changes, bells, scrollback growth, selection changes, ...).

mod blink;
mod cell;
mod charset;
mod chunk;
mod config;
mod cursor;
mod decoder;
mod error;
mod events;
mod insertion;
mod matcher;
mod matchtable;
mod modes;
mod palette;
mod pipeline;
mod ring;
mod row;
mod runtime;
mod screen;
mod selection;
mod tabstops;
mod terminal;
mod text_projection;

pub use cell::{Cell, CellAttributes, CellFlags, CombiningTable, UniStr};
pub use config::TerminalConfig;
pub use cursor::{CursorShape, CursorState, Position};
pub use decoder::Encoding;
pub use error::{Error, Result};
pub use events::{DirtyRect, Event};
pub use matchtable::MatchSpan;
pub use modes::{MouseEncoding, MouseModes, ScreenModes};
pub use palette::{Palette, PaletteIndex, Rgba};
pub use row::Row;
pub use runtime::Runtime;
pub use screen::{Screen, ScrollRegion};
pub use selection::SelectionMode;
pub use terminal::Terminal;
