//! 256-colour palette plus the handful of "special" slots cells can address
//! (default fg/bg, bold-fg, dim-fg, cursor-bg, reverse-bg, highlight-bg).
//!
//! Cells never store an RGB triple directly — they store a [`PaletteIndex`],
//! so a palette (theme) swap repaints every cell without walking the grid.

use serde::{Deserialize, Serialize};

/// Number of addressable 256-colour slots.
pub const BASE_COLORS: usize = 256;

/// Special slots appended after the 256-colour cube, in §3's listed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum SpecialSlot {
    DefaultFg = 0,
    DefaultBg = 1,
    BoldFg = 2,
    DimFg = 3,
    CursorBg = 4,
    ReverseBg = 5,
    HighlightBg = 6,
}

pub const SPECIAL_SLOT_COUNT: usize = 7;
pub const PALETTE_SIZE: usize = BASE_COLORS + SPECIAL_SLOT_COUNT;

/// A palette index: 0..256 is the colour cube, 256.. addresses a
/// [`SpecialSlot`]. Bit-width is wider than strictly needed so the type can
/// grow without a representation change.
pub type PaletteIndex = u16;

pub const DEFAULT_FG: PaletteIndex = (BASE_COLORS + SpecialSlot::DefaultFg as usize) as u16;
pub const DEFAULT_BG: PaletteIndex = (BASE_COLORS + SpecialSlot::DefaultBg as usize) as u16;
pub const BOLD_FG: PaletteIndex = (BASE_COLORS + SpecialSlot::BoldFg as usize) as u16;
pub const DIM_FG: PaletteIndex = (BASE_COLORS + SpecialSlot::DimFg as usize) as u16;
pub const CURSOR_BG: PaletteIndex = (BASE_COLORS + SpecialSlot::CursorBg as usize) as u16;
pub const REVERSE_BG: PaletteIndex = (BASE_COLORS + SpecialSlot::ReverseBg as usize) as u16;
pub const HIGHLIGHT_BG: PaletteIndex = (BASE_COLORS + SpecialSlot::HighlightBg as usize) as u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }
}

/// The terminal's colour table. `overridden` tracks which slots were set by
/// the application (OSC 4 / OSC 10-12) rather than derived from the active
/// style, so a theme change can repaint only the slots the user hasn't
/// overridden.
pub struct Palette {
    entries: Vec<Rgba>,
    overridden: Vec<bool>,
}

impl Palette {
    pub fn new() -> Self {
        let mut entries = vec![Rgba::rgb(0, 0, 0); PALETTE_SIZE];
        for i in 0..BASE_COLORS {
            entries[i] = indexed_to_rgb(i as u8);
        }
        entries[DEFAULT_FG as usize] = Rgba::rgb(0xd4, 0xd4, 0xd4);
        entries[DEFAULT_BG as usize] = Rgba::rgb(0x0e, 0x0e, 0x0e);
        entries[BOLD_FG as usize] = Rgba::rgb(0xff, 0xff, 0xff);
        entries[DIM_FG as usize] = Rgba::rgb(0x80, 0x80, 0x80);
        entries[CURSOR_BG as usize] = Rgba::rgb(0xd4, 0xd4, 0xd4);
        entries[REVERSE_BG as usize] = Rgba::rgb(0xd4, 0xd4, 0xd4);
        entries[HIGHLIGHT_BG as usize] = Rgba::rgb(0x26, 0x4f, 0x78);
        Self {
            entries,
            overridden: vec![false; PALETTE_SIZE],
        }
    }

    pub fn get(&self, idx: PaletteIndex) -> Rgba {
        self.entries
            .get(idx as usize)
            .copied()
            .unwrap_or(Rgba::rgb(0, 0, 0))
    }

    /// Application-set override (OSC 4 / OSC 10 / OSC 11 / OSC 12).
    pub fn set_override(&mut self, idx: PaletteIndex, rgba: Rgba) {
        if let Some(slot) = self.entries.get_mut(idx as usize) {
            *slot = rgba;
            self.overridden[idx as usize] = true;
        }
    }

    pub fn is_overridden(&self, idx: PaletteIndex) -> bool {
        self.overridden.get(idx as usize).copied().unwrap_or(false)
    }

    /// Reset a single slot back to its style-derived default (OSC 104/110-112).
    pub fn reset(&mut self, idx: PaletteIndex, default: Rgba) {
        if let Some(slot) = self.entries.get_mut(idx as usize) {
            *slot = default;
            self.overridden[idx as usize] = false;
        }
    }

    /// Intern a direct (SGR 38;2/48;2 truecolor) RGB triple as a new slot
    /// past the fixed 256-colour-plus-specials range, reusing an existing
    /// slot if this exact colour was interned before.
    pub fn intern_direct(&mut self, rgba: Rgba) -> PaletteIndex {
        if let Some(pos) = self.entries[PALETTE_SIZE..].iter().position(|&e| e == rgba) {
            return (PALETTE_SIZE + pos) as u16;
        }
        self.entries.push(rgba);
        self.overridden.push(true);
        (self.entries.len() - 1) as u16
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a 256-colour index to an RGB tuple: 0-15 standard ANSI, 16-231 a
/// 6x6x6 colour cube, 232-255 a grayscale ramp.
pub fn indexed_to_rgb(index: u8) -> Rgba {
    const ANSI: [(u8, u8, u8); 16] = [
        (0x15, 0x16, 0x1e),
        (0xf7, 0x76, 0x8e),
        (0x9e, 0xce, 0x6a),
        (0xe0, 0xaf, 0x68),
        (0x7a, 0xa2, 0xf7),
        (0xbb, 0x9a, 0xf7),
        (0x7d, 0xcf, 0xff),
        (0xa9, 0xb1, 0xd6),
        (0x41, 0x48, 0x68),
        (0xff, 0x9e, 0x9e),
        (0xb9, 0xf2, 0x7c),
        (0xff, 0x9e, 0x64),
        (0x82, 0xaa, 0xff),
        (0xd4, 0xb0, 0xff),
        (0xa9, 0xe1, 0xff),
        (0xc0, 0xca, 0xf5),
    ];
    match index {
        0..=15 => {
            let (r, g, b) = ANSI[index as usize];
            Rgba::rgb(r, g, b)
        }
        16..=231 => {
            let idx = index - 16;
            let r = idx / 36;
            let g = (idx % 36) / 6;
            let b = idx % 6;
            let to_val = |v: u8| if v == 0 { 0 } else { 55 + 40 * v };
            Rgba::rgb(to_val(r), to_val(g), to_val(b))
        }
        232..=255 => {
            let v = 8 + 10 * (index - 232);
            Rgba::rgb(v, v, v)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn special_slots_follow_the_colour_cube() {
        assert_eq!(DEFAULT_FG as usize, BASE_COLORS);
        assert_eq!(HIGHLIGHT_BG as usize, BASE_COLORS + SPECIAL_SLOT_COUNT - 1);
    }

    #[test]
    fn overrides_are_tracked_independently_of_value() {
        let mut p = Palette::new();
        assert!(!p.is_overridden(DEFAULT_BG));
        p.set_override(DEFAULT_BG, Rgba::rgb(1, 2, 3));
        assert!(p.is_overridden(DEFAULT_BG));
        assert_eq!(p.get(DEFAULT_BG), Rgba::rgb(1, 2, 3));
    }
}
