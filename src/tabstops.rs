//! Sparse tabstop set (§3 "a tabstop set (sparse set of column indices)").

use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct TabStops {
    stops: BTreeSet<u16>,
    width: u16,
}

impl TabStops {
    /// Default stops every 8 columns, matching the classic hardware tab
    /// stride.
    pub fn new(width: u16) -> Self {
        let mut stops = BTreeSet::new();
        let mut col = 0u16;
        while col < width {
            stops.insert(col);
            col = col.saturating_add(8);
        }
        Self { stops, width }
    }

    pub fn resize(&mut self, width: u16) {
        if width > self.width {
            let mut col = (self.width / 8 + 1) * 8;
            while col < width {
                self.stops.insert(col);
                col = col.saturating_add(8);
            }
        } else {
            self.stops.retain(|&c| c < width);
        }
        self.width = width;
    }

    pub fn set(&mut self, col: u16) {
        self.stops.insert(col);
    }

    pub fn clear(&mut self, col: u16) {
        self.stops.remove(&col);
    }

    pub fn clear_all(&mut self) {
        self.stops.clear();
    }

    /// Next tab stop strictly after `col`, or the right margin if none.
    pub fn next_after(&self, col: u16) -> u16 {
        self.stops
            .range((col + 1)..)
            .next()
            .copied()
            .unwrap_or(self.width.saturating_sub(1))
    }

    /// Previous tab stop strictly before `col`, or column 0 if none.
    pub fn prev_before(&self, col: u16) -> u16 {
        self.stops.range(..col).next_back().copied().unwrap_or(0)
    }
}
