//! The per-cell data model (§3 "Code point with attributes").

use bitflags::bitflags;

use crate::palette::{PaletteIndex, DEFAULT_BG, DEFAULT_FG};

bitflags! {
    /// Boolean cell attributes, packed into a bitset.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct CellFlags: u16 {
        const BOLD          = 1 << 0;
        const HALF          = 1 << 1;
        const UNDERLINE     = 1 << 2;
        const STRIKETHROUGH = 1 << 3;
        const REVERSE       = 1 << 4;
        const STANDOUT      = 1 << 5;
        const INVISIBLE     = 1 << 6;
        /// This cell is the continuation of a wide character.
        const FRAGMENT      = 1 << 7;
        const ITALIC        = 1 << 8;
        const BLINK         = 1 << 9;
        /// Column produced by expanding a tab, rather than a printed glyph.
        /// Writing into any cell of a tab run collapses the whole run back
        /// to plain blanks (§4.4 "Tab cleanup").
        const TAB_FRAGMENT  = 1 << 10;
    }
}

/// A cell's character payload: either a single scalar value, or an index
/// into [`CombiningTable`] for a base character plus attached combining
/// marks collapsed into one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniStr {
    Scalar(char),
    /// Index into the combining-sequence table owned by the [`Screen`].
    Combined(u32),
}

impl Default for UniStr {
    fn default() -> Self {
        UniStr::Scalar(' ')
    }
}

impl UniStr {
    /// The base (first) character of this unistr, ignoring combining marks.
    /// Used for width resolution and east-asian-width lookups.
    pub fn base_char(&self, table: &CombiningTable) -> char {
        match *self {
            UniStr::Scalar(c) => c,
            UniStr::Combined(id) => table.sequence(id).first().copied().unwrap_or(' '),
        }
    }
}

/// Interning table for base+mark sequences. Cells that accumulate combining
/// marks store an index here rather than growing in size themselves.
#[derive(Debug, Default)]
pub struct CombiningTable {
    sequences: Vec<Vec<char>>,
}

impl CombiningTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sequence(&self, id: u32) -> &[char] {
        self.sequences
            .get(id as usize)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Intern `base`'s existing sequence (if any) with `mark` appended,
    /// returning the new interned id. `base` may already be a combined
    /// unistr, in which case its full sequence is extended.
    pub fn attach(&mut self, base: UniStr, mark: char) -> u32 {
        let mut seq = match base {
            UniStr::Scalar(c) => vec![c],
            UniStr::Combined(id) => self.sequence(id).to_vec(),
        };
        seq.push(mark);
        let id = self.sequences.len() as u32;
        self.sequences.push(seq);
        id
    }

    /// Render a unistr back to a `String` (base char followed by marks).
    pub fn render(&self, u: UniStr) -> String {
        match u {
            UniStr::Scalar(c) => c.to_string(),
            UniStr::Combined(id) => self.sequence(id).iter().collect(),
        }
    }
}

/// A single terminal cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub unistr: UniStr,
    pub fore: PaletteIndex,
    pub back: PaletteIndex,
    pub flags: CellFlags,
    /// 0 = combining mark (never stored as a standalone cell outside of
    /// merge operations), 1 = narrow, 2 = wide.
    pub columns: u8,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            unistr: UniStr::Scalar(' '),
            fore: DEFAULT_FG,
            back: DEFAULT_BG,
            flags: CellFlags::empty(),
            columns: 1,
        }
    }
}

impl Cell {
    /// A blank cell carrying the given attribute set (used for padding,
    /// erase and fill operations per §4.4's "color_defaults"/"fill_defaults").
    pub fn blank(attrs: CellAttributes) -> Self {
        Self {
            unistr: UniStr::Scalar(' '),
            fore: attrs.fore,
            back: attrs.back,
            flags: attrs.flags,
            columns: 1,
        }
    }

    /// Trailing half of a wide character: same unistr as the primary cell,
    /// `columns = 2`, `flags |= FRAGMENT`.
    pub fn wide_fragment(primary: &Cell) -> Self {
        Self {
            unistr: primary.unistr,
            fore: primary.fore,
            back: primary.back,
            flags: primary.flags | CellFlags::FRAGMENT,
            columns: 2,
        }
    }

    pub fn is_fragment(&self) -> bool {
        self.flags.contains(CellFlags::FRAGMENT)
    }

    pub fn is_blank(&self) -> bool {
        matches!(self.unistr, UniStr::Scalar(' ')) && !self.is_fragment()
    }
}

/// The attribute triple cells are stamped with at write time. §3 keeps these
/// three separate because SGR updates them together but later operations
/// (scroll fill, erase) can let them diverge transiently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellAttributes {
    pub fore: PaletteIndex,
    pub back: PaletteIndex,
    pub flags: CellFlags,
}

impl Default for CellAttributes {
    fn default() -> Self {
        Self {
            fore: DEFAULT_FG,
            back: DEFAULT_BG,
            flags: CellFlags::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combining_table_extends_existing_sequences() {
        let mut table = CombiningTable::new();
        let id1 = table.attach(UniStr::Scalar('e'), '\u{0301}');
        assert_eq!(table.sequence(id1), &['e', '\u{0301}']);

        let id2 = table.attach(UniStr::Combined(id1), '\u{0302}');
        assert_eq!(table.sequence(id2), &['e', '\u{0301}', '\u{0302}']);
        // Original sequence is untouched — interning never mutates in place.
        assert_eq!(table.sequence(id1), &['e', '\u{0301}']);
    }

    #[test]
    fn wide_fragment_carries_primary_unistr() {
        let primary = Cell {
            unistr: UniStr::Scalar('\u{4e2d}'),
            columns: 2,
            ..Default::default()
        };
        let frag = Cell::wide_fragment(&primary);
        assert_eq!(frag.unistr, primary.unistr);
        assert!(frag.is_fragment());
        assert_eq!(frag.columns, 2);
    }
}
