//! The composed terminal (§3 top-level state, §6 interfaces toward
//! collaborators): owns both screens, the incoming pipeline, the sequence
//! dispatch table, selection and match engines, and exposes the public
//! surface an embedder drives.
//!
//! Errors encountered while interpreting the incoming stream (unknown CSI
//! finals, malformed parameters) are never propagated to the caller — per
//! §7 they're logged at `debug` and the pass continues as far as it can.
//! Only operations the caller invokes directly (`set_encoding`,
//! `set_emulation`, `match_add`, …) return a [`Result`].

use crate::blink::BlinkState;
use crate::cell::{CellAttributes, CellFlags};
use crate::config::TerminalConfig;
use crate::cursor::Position;
use crate::decoder::Encoding;
use crate::error::{Error, Result};
use crate::events::Event;
use crate::insertion::{execute_tab, print_char};
use crate::matcher::Sequence;
use crate::matchtable::{MatchSpan, MatchTable};
use crate::modes::MouseModes;
use crate::palette::{Palette, Rgba};
use crate::pipeline::{Action, DirtyTracker, Pipeline};
use crate::row::Row;
use crate::screen::{Screen, ScrollRegion};
use crate::selection::{Selection, SelectionMode};
use crate::tabstops::TabStops;
use crate::text_projection::{dump_plain_text, get_text_range};

const KNOWN_EMULATIONS: &[&str] = &["xterm-256color", "vt100", "vt220", "screen-256color"];

pub struct Terminal {
    primary: Screen,
    alternate: Screen,
    using_alternate: bool,
    pipeline: Pipeline,
    tabstops: TabStops,
    palette: Palette,
    mouse_modes: MouseModes,
    selection: Selection,
    match_table: MatchTable,
    blink: BlinkState,
    config: TerminalConfig,
    dirty: DirtyTracker,
    events: Vec<Event>,
    pending_replies: Vec<u8>,
    window_title: String,
    icon_title: String,
    emulation: String,
    last_printed: Option<char>,
}

impl Terminal {
    pub fn new(rows: u16, cols: u16, config: TerminalConfig) -> Self {
        let encoding = Encoding::parse(&config.encoding).unwrap_or(Encoding::Utf8);
        let mut primary = Screen::new(rows, cols, config.scrollback_lines, true);
        primary.scroll_on_output = config.scroll_on_output;
        let alternate = Screen::new(rows, cols, 0, false);
        Self {
            primary,
            alternate,
            using_alternate: false,
            pipeline: Pipeline::new(encoding, config.pipeline_start_budget, config.pipeline_target_pass()),
            tabstops: TabStops::new(cols),
            palette: Palette::new(),
            mouse_modes: MouseModes::default(),
            selection: {
                let mut s = Selection::new();
                s.word_chars = config.word_chars.clone();
                s
            },
            match_table: MatchTable::new(),
            blink: {
                let mut blink = BlinkState::new(config.cursor_blink_interval(), config.cursor_blink_idle_timeout());
                if !config.cursor_blink {
                    blink.set_enabled(false);
                }
                blink
            },
            dirty: DirtyTracker::new(config.dirty_slack),
            events: Vec::new(),
            pending_replies: Vec::new(),
            window_title: String::new(),
            icon_title: String::new(),
            emulation: config.emulation.clone(),
            last_printed: None,
            config,
        }
    }

    // ---- screen access -----------------------------------------------

    pub fn screen(&self) -> &Screen {
        if self.using_alternate {
            &self.alternate
        } else {
            &self.primary
        }
    }

    fn screen_mut(&mut self) -> &mut Screen {
        if self.using_alternate {
            &mut self.alternate
        } else {
            &mut self.primary
        }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn cursor_position(&self) -> Position {
        self.screen().cursor.position
    }

    pub fn cursor_visible(&self) -> bool {
        self.screen().modes.cursor_visible && self.blink.visible()
    }

    // ---- ingestion -----------------------------------------------------

    /// Feed raw child-process bytes into the pipeline and run as many
    /// passes as the adaptive budget allows, returning the events produced.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Event> {
        self.pipeline.feed(bytes);
        while self.pipeline.has_buffered_chars() {
            self.run_pass();
        }
        self.flush_dirty();
        std::mem::take(&mut self.events)
    }

    /// Bytes queued for the child process (DSR/DA replies). The embedder is
    /// responsible for actually writing them to the pty.
    pub fn take_pending_replies(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.pending_replies)
    }

    fn run_pass(&mut self) {
        let actions = self.pipeline.process_incoming();
        for action in actions {
            match action {
                Action::PlainText(text) => self.apply_plain_text(&text),
                Action::Control(c) => self.dispatch_control(c),
                Action::Sequence(Sequence::Escape { intermediates, final_byte }) => {
                    self.dispatch_escape(&intermediates, final_byte)
                }
                Action::Sequence(Sequence::Csi {
                    params,
                    intermediates,
                    private,
                    final_byte,
                }) => self.dispatch_csi(&params, &intermediates, private, final_byte),
                Action::Sequence(Sequence::Osc { data }) => self.dispatch_osc(&data),
            }
        }
    }

    fn apply_plain_text(&mut self, text: &str) {
        let mut touched: Option<(u64, u64)> = None;
        for c in text.chars() {
            let row_before = self.screen().cursor_screen_row();
            let abs_before = self.screen().absolute(row_before);
            let outcome = print_char(self.screen_mut(), c);
            self.last_printed = Some(c);
            if let Some(scrolled) = outcome.scrolled {
                self.on_scrolled(scrolled);
            }
            let row_after = self.screen().cursor_screen_row();
            let abs_after = self.screen().absolute(row_after);
            let cols = self.screen().cols;
            self.dirty.mark_row(row_before, cols);
            self.dirty.mark_row(row_after, cols);
            touched = Some(match touched {
                Some((lo, hi)) => (lo.min(abs_before).min(abs_after), hi.max(abs_before).max(abs_after)),
                None => (abs_before.min(abs_after), abs_before.max(abs_after)),
            });
        }
        if !text.is_empty() {
            self.events.push(Event::TextModified);
        }
        if let Some((lo, hi)) = touched {
            self.invalidate_selection(lo, hi);
        }
        self.events.push(Event::CursorMoved);
    }

    fn on_scrolled(&mut self, row: Row) {
        let _ = row;
        self.events.push(Event::TextScrolled(1));
    }

    fn mark_cursor_row_dirty(&mut self) {
        let row = self.screen().cursor_screen_row();
        let cols = self.screen().cols;
        self.dirty.mark_row(row, cols);
        self.events.push(Event::CursorMoved);
    }

    /// Mark every row of a scrolling region dirty, for CSI ops (insert/
    /// delete/scroll rows) that shift more than just the cursor's row.
    fn mark_region_dirty(&mut self, region: ScrollRegion) {
        let cols = self.screen().cols;
        for row in region.start..=region.end {
            self.dirty.mark_row(row, cols);
        }
    }

    fn flush_dirty(&mut self) {
        let (rows, cols) = (self.screen().visible_rows, self.screen().cols);
        if let Some(rect) = self.dirty.take(rows.saturating_sub(1), cols.saturating_sub(1)) {
            self.events.push(Event::ContentsChanged(rect));
        }
    }

    // ---- control / escape / CSI / OSC dispatch --------------------------

    fn dispatch_control(&mut self, c: char) {
        match c {
            '\r' => {
                self.screen_mut().cursor.position.col = 0;
            }
            '\n' | '\u{0b}' | '\u{0c}' => {
                let linefeed_mode = self.screen().modes.linefeed_mode;
                let scrolled = self.screen_mut().cursor_down();
                if linefeed_mode {
                    self.screen_mut().cursor.position.col = 0;
                }
                if let Some(row) = scrolled {
                    self.on_scrolled(row);
                }
            }
            '\u{08}' => {
                let col = self.screen().cursor.position.col;
                self.screen_mut().cursor.position.col = col.saturating_sub(1);
            }
            '\t' => {
                execute_tab(self.screen_mut(), &self.tabstops);
            }
            '\u{07}' => self.events.push(Event::Bell),
            '\u{0e}' => self.screen_mut().modes.alternate_charset = true,
            '\u{0f}' => self.screen_mut().modes.alternate_charset = false,
            _ => tracing::debug!(code = c as u32, "unhandled control character"),
        }
        self.mark_cursor_row_dirty();
    }

    fn dispatch_escape(&mut self, intermediates: &[char], final_byte: char) {
        match (intermediates, final_byte) {
            ([], 'M') => self.screen_mut().cursor_up(),
            ([], 'D') => {
                if let Some(row) = self.screen_mut().cursor_down() {
                    self.on_scrolled(row);
                }
            }
            ([], 'E') => {
                if let Some(row) = self.screen_mut().cursor_down() {
                    self.on_scrolled(row);
                }
                self.screen_mut().cursor.position.col = 0;
            }
            ([], 'H') => {
                let col = self.screen().cursor.position.col;
                self.tabstops.set(col);
            }
            ([], '7') => {
                let origin_mode = self.screen().modes.origin_mode;
                self.screen_mut().cursor.save(origin_mode);
            }
            ([], '8') => {
                if let Some(origin_mode) = self.screen_mut().cursor.restore() {
                    self.screen_mut().modes.origin_mode = origin_mode;
                }
            }
            ([], 'c') => self.hard_reset(),
            (['('], '0') => self.screen_mut().modes.alternate_charset = true,
            (['('], 'B') => self.screen_mut().modes.alternate_charset = false,
            _ => tracing::debug!(?intermediates, final_byte, "unhandled escape sequence"),
        }
        self.mark_cursor_row_dirty();
    }

    fn dispatch_csi(&mut self, params: &[i64], intermediates: &[char], private: Option<char>, final_byte: char) {
        let _ = intermediates;
        let p1 = params.first().copied().filter(|&v| v != 0).unwrap_or(1);
        let p2 = params.get(1).copied().filter(|&v| v != 0).unwrap_or(1);

        match final_byte {
            'A' => self.move_cursor_rows(-p1),
            'B' | 'e' => self.move_cursor_rows(p1),
            'C' | 'a' => self.move_cursor_cols(p1),
            'D' => self.move_cursor_cols(-p1),
            'E' => {
                self.move_cursor_rows(p1);
                self.screen_mut().cursor.position.col = 0;
            }
            'F' => {
                self.move_cursor_rows(-p1);
                self.screen_mut().cursor.position.col = 0;
            }
            'G' | '`' => {
                let col = (p1 - 1).max(0) as u16;
                self.screen_mut().cursor.position.col = col.min(self.screen().cols.saturating_sub(1));
            }
            'd' => self.set_cursor_row(p1),
            'H' | 'f' => {
                self.set_cursor_row(p1);
                let col = (p2 - 1).max(0) as u16;
                self.screen_mut().cursor.position.col = col.min(self.screen().cols.saturating_sub(1));
            }
            'J' => self.erase_in_display(params.first().copied().unwrap_or(0)),
            'K' => self.erase_in_line(params.first().copied().unwrap_or(0)),
            'L' => {
                self.screen_mut().insert_rows_at_cursor(p1 as u16);
                self.mark_region_dirty(self.screen().effective_region());
            }
            'M' => {
                self.screen_mut().delete_rows_at_cursor(p1 as u16);
                self.mark_region_dirty(self.screen().effective_region());
            }
            '@' => self.insert_chars(p1 as usize),
            'P' => self.delete_chars(p1 as usize),
            'X' => self.erase_chars(p1 as usize),
            'S' => {
                let region = self.screen().effective_region();
                for _ in 0..p1 {
                    if let Some(row) = self.screen_mut().scroll_up(region) {
                        self.on_scrolled(row);
                    }
                }
                self.mark_region_dirty(region);
            }
            'T' => {
                let region = self.screen().effective_region();
                for _ in 0..p1 {
                    self.screen_mut().scroll_down(region);
                }
                self.events.push(Event::TextScrolled(-p1));
                self.mark_region_dirty(region);
            }
            'b' => self.repeat_last_printed(p1 as usize),
            'g' => self.clear_tabs(params.first().copied().unwrap_or(0)),
            'm' => self.apply_sgr(params),
            'n' => self.device_status_report(params.first().copied().unwrap_or(0)),
            'r' => self.set_scrolling_region(params),
            'h' => self.set_mode(params, private, true),
            'l' => self.set_mode(params, private, false),
            'c' if private == Some('?') => self.primary_device_attributes(),
            _ => tracing::debug!(final_byte, ?params, ?private, "unhandled CSI sequence"),
        }
        self.mark_cursor_row_dirty();
    }

    fn dispatch_osc(&mut self, data: &str) {
        let mut parts = data.splitn(2, ';');
        let code = parts.next().unwrap_or("");
        let arg = parts.next().unwrap_or("");
        match code {
            "0" => {
                self.window_title = arg.to_string();
                self.icon_title = arg.to_string();
                self.events.push(Event::WindowTitleChanged(arg.to_string()));
                self.events.push(Event::IconTitleChanged(arg.to_string()));
            }
            "1" => {
                self.icon_title = arg.to_string();
                self.events.push(Event::IconTitleChanged(arg.to_string()));
            }
            "2" => {
                self.window_title = arg.to_string();
                self.events.push(Event::WindowTitleChanged(arg.to_string()));
            }
            "4" => self.set_palette_entry(arg),
            _ => tracing::debug!(code, "unhandled OSC sequence"),
        }
    }

    // ---- CSI helpers -----------------------------------------------------

    fn move_cursor_rows(&mut self, delta: i64) {
        let screen = self.screen_mut();
        let min = screen.insert_delta as i64;
        let max = min + screen.visible_rows.saturating_sub(1) as i64;
        let new_row = (screen.cursor.position.row as i64 + delta).clamp(min, max);
        screen.cursor.position.row = new_row as u64;
    }

    fn move_cursor_cols(&mut self, delta: i64) {
        let screen = self.screen_mut();
        let max = screen.cols.saturating_sub(1) as i64;
        let new_col = (screen.cursor.position.col as i64 + delta).clamp(0, max);
        screen.cursor.position.col = new_col as u16;
    }

    fn set_cursor_row(&mut self, one_based: i64) {
        let screen = self.screen_mut();
        let base = if screen.modes.origin_mode {
            screen.effective_region().start as i64
        } else {
            0
        };
        let row = (base + one_based - 1).max(0) as u64;
        let max = screen.visible_rows.saturating_sub(1) as u64;
        screen.cursor.position.row = screen.insert_delta + row.min(max);
    }

    fn erase_in_display(&mut self, mode: i64) {
        let screen = self.screen_mut();
        let fill = screen.fill_defaults;
        let cursor_row = screen.cursor_screen_row();
        let rows = screen.visible_rows;
        let (touched_lo, touched_hi) = match mode {
            0 => (cursor_row, rows.saturating_sub(1)),
            1 => (0, cursor_row),
            _ => (0, rows.saturating_sub(1)),
        };
        match mode {
            0 => {
                let col = screen.cursor.position.col as usize;
                screen.visible_row_mut(cursor_row).erase_range(col, usize::MAX, fill);
                for r in (cursor_row + 1)..rows {
                    screen.visible_row_mut(r).erase_all(fill);
                }
            }
            1 => {
                for r in 0..cursor_row {
                    screen.visible_row_mut(r).erase_all(fill);
                }
                let col = screen.cursor.position.col as usize;
                screen.visible_row_mut(cursor_row).erase_range(0, col + 1, fill);
            }
            _ => {
                for r in 0..rows {
                    screen.visible_row_mut(r).erase_all(fill);
                }
            }
        }
        self.events.push(Event::TextDeleted);
        let abs_lo = self.screen().absolute(touched_lo);
        let abs_hi = self.screen().absolute(touched_hi);
        self.invalidate_selection(abs_lo, abs_hi);
    }

    fn erase_in_line(&mut self, mode: i64) {
        let screen = self.screen_mut();
        let fill = screen.fill_defaults;
        let row = screen.cursor_screen_row();
        let col = screen.cursor.position.col as usize;
        let r = screen.visible_row_mut(row);
        match mode {
            0 => r.erase_range(col, usize::MAX, fill),
            1 => r.erase_range(0, col + 1, fill),
            _ => r.erase_all(fill),
        }
        self.events.push(Event::TextDeleted);
        let abs_row = self.screen().absolute(row);
        self.invalidate_selection(abs_row, abs_row);
    }

    fn insert_chars(&mut self, n: usize) {
        let screen = self.screen_mut();
        let row_idx = screen.cursor_screen_row();
        let col = screen.cursor.position.col as usize;
        let color_defaults = screen.color_defaults;
        let row = screen.visible_row_mut(row_idx);
        for _ in 0..n {
            row.cells.pop();
            let at = col.min(row.cells.len());
            row.cells.insert(at, crate::cell::Cell::blank(color_defaults));
        }
        row.dirty = true;
        self.events.push(Event::TextInserted);
        let abs_row = self.screen().absolute(row_idx);
        self.invalidate_selection(abs_row, abs_row);
    }

    fn delete_chars(&mut self, n: usize) {
        let screen = self.screen_mut();
        let row_idx = screen.cursor_screen_row();
        let col = screen.cursor.position.col as usize;
        let fill = screen.fill_defaults;
        let row = screen.visible_row_mut(row_idx);
        let len = row.cells.len();
        for _ in 0..n.min(len.saturating_sub(col)) {
            if col < row.cells.len() {
                row.cells.remove(col);
            }
        }
        row.cells.resize(len, crate::cell::Cell::blank(fill));
        row.dirty = true;
        self.events.push(Event::TextDeleted);
        let abs_row = self.screen().absolute(row_idx);
        self.invalidate_selection(abs_row, abs_row);
    }

    fn erase_chars(&mut self, n: usize) {
        let screen = self.screen_mut();
        let row_idx = screen.cursor_screen_row();
        let col = screen.cursor.position.col as usize;
        let fill = screen.fill_defaults;
        screen.visible_row_mut(row_idx).erase_range(col, col + n, fill);
        self.events.push(Event::TextDeleted);
        let abs_row = self.screen().absolute(row_idx);
        self.invalidate_selection(abs_row, abs_row);
    }

    fn repeat_last_printed(&mut self, n: usize) {
        if let Some(c) = self.last_printed {
            for _ in 0..n {
                let outcome = print_char(self.screen_mut(), c);
                if let Some(row) = outcome.scrolled {
                    self.on_scrolled(row);
                }
            }
        }
    }

    fn clear_tabs(&mut self, mode: i64) {
        let col = self.screen().cursor.position.col;
        match mode {
            3 => self.tabstops.clear_all(),
            _ => self.tabstops.clear(col),
        }
    }

    fn set_scrolling_region(&mut self, params: &[i64]) {
        let screen = self.screen_mut();
        let rows = screen.visible_rows;
        let top = params.first().copied().unwrap_or(1).max(1) as u16 - 1;
        let bottom = params.get(1).copied().filter(|&v| v != 0).unwrap_or(rows as i64) as u16 - 1;
        if top >= bottom {
            screen.scrolling_restricted = false;
            screen.scrolling_region = ScrollRegion::full(rows);
        } else {
            screen.scrolling_restricted = true;
            screen.scrolling_region = ScrollRegion { start: top, end: bottom }.clamp(rows);
        }
        let home_row = if screen.modes.origin_mode {
            screen.effective_region().start
        } else {
            0
        };
        screen.cursor.position.row = screen.insert_delta + home_row as u64;
        screen.cursor.position.col = 0;
    }

    fn set_mode(&mut self, params: &[i64], private: Option<char>, set: bool) {
        if private == Some('?') {
            for &p in params {
                self.set_dec_private_mode(p, set);
            }
        } else {
            for &p in params {
                match p {
                    4 => self.screen_mut().modes.insert_mode = set,
                    12 => self.screen_mut().modes.sendrecv_mode = set,
                    20 => self.screen_mut().modes.linefeed_mode = set,
                    _ => tracing::debug!(mode = p, set, "unhandled ANSI mode"),
                }
            }
        }
    }

    fn set_dec_private_mode(&mut self, mode: i64, set: bool) {
        match mode {
            1 => self.screen_mut().modes.cursor_keys_application = set,
            5 => {
                self.screen_mut().modes.reverse_mode = set;
                self.screen_mut().mark_all_dirty();
            }
            6 => {
                self.screen_mut().modes.origin_mode = set;
                self.screen_mut().ensure_cursor();
            }
            7 => self.screen_mut().modes.autowrap = set,
            12 => self.blink.set_enabled(set),
            25 => self.screen_mut().modes.cursor_visible = set,
            1000 => self.mouse_modes.tracking = set,
            1002 => self.mouse_modes.motion = set,
            1003 => self.mouse_modes.all_motion = set,
            1004 => self.mouse_modes.focus_events = set,
            1005 => self.mouse_modes.utf8 = set,
            1006 => self.mouse_modes.sgr = set,
            47 | 1047 => self.set_alternate_screen(set, false),
            1048 => {
                if set {
                    let origin_mode = self.screen().modes.origin_mode;
                    self.screen_mut().cursor.save(origin_mode);
                } else if let Some(origin_mode) = self.screen_mut().cursor.restore() {
                    self.screen_mut().modes.origin_mode = origin_mode;
                }
            }
            1049 => self.set_alternate_screen(set, true),
            2004 => self.screen_mut().modes.bracketed_paste_mode = set,
            _ => tracing::debug!(mode, set, "unhandled DEC private mode"),
        }
    }

    fn set_alternate_screen(&mut self, enter: bool, save_cursor: bool) {
        if enter == self.using_alternate {
            return;
        }
        if enter {
            if save_cursor {
                let origin_mode = self.primary.modes.origin_mode;
                self.primary.cursor.save(origin_mode);
            }
            let (rows, cols) = (self.primary.visible_rows, self.primary.cols);
            self.alternate.resize(rows, cols, 0);
            self.alternate.mark_all_dirty();
            self.using_alternate = true;
        } else {
            self.using_alternate = false;
            if save_cursor {
                if let Some(origin_mode) = self.primary.cursor.restore() {
                    self.primary.modes.origin_mode = origin_mode;
                }
            }
            self.primary.mark_all_dirty();
        }
        self.events.push(Event::EmulationChanged(self.emulation.clone()));
    }

    fn apply_sgr(&mut self, params: &[i64]) {
        let mut attrs = if params.is_empty() {
            CellAttributes::default()
        } else {
            self.screen().defaults
        };
        let mut i = 0;
        while i < params.len() {
            match params[i] {
                0 => attrs = CellAttributes::default(),
                1 => attrs.flags.insert(CellFlags::BOLD),
                2 => attrs.flags.insert(CellFlags::HALF),
                3 => attrs.flags.insert(CellFlags::ITALIC),
                4 => attrs.flags.insert(CellFlags::UNDERLINE),
                5 | 6 => attrs.flags.insert(CellFlags::BLINK),
                7 => attrs.flags.insert(CellFlags::REVERSE),
                8 => attrs.flags.insert(CellFlags::INVISIBLE),
                9 => attrs.flags.insert(CellFlags::STRIKETHROUGH),
                22 => attrs.flags.remove(CellFlags::BOLD | CellFlags::HALF),
                23 => attrs.flags.remove(CellFlags::ITALIC),
                24 => attrs.flags.remove(CellFlags::UNDERLINE),
                25 => attrs.flags.remove(CellFlags::BLINK),
                27 => attrs.flags.remove(CellFlags::REVERSE),
                28 => attrs.flags.remove(CellFlags::INVISIBLE),
                29 => attrs.flags.remove(CellFlags::STRIKETHROUGH),
                30..=37 => attrs.fore = (params[i] - 30) as u16,
                39 => attrs.fore = crate::palette::DEFAULT_FG,
                40..=47 => attrs.back = (params[i] - 40) as u16,
                49 => attrs.back = crate::palette::DEFAULT_BG,
                90..=97 => attrs.fore = (params[i] - 90 + 8) as u16,
                100..=107 => attrs.back = (params[i] - 100 + 8) as u16,
                38 | 48 => {
                    let target_fore = params[i] == 38;
                    match params.get(i + 1) {
                        Some(&5) => {
                            if let Some(&idx) = params.get(i + 2) {
                                let idx = idx.clamp(0, 255) as u16;
                                if target_fore {
                                    attrs.fore = idx;
                                } else {
                                    attrs.back = idx;
                                }
                            }
                            i += 2;
                        }
                        Some(&2) => {
                            let r = params.get(i + 2).copied().unwrap_or(0).clamp(0, 255) as u8;
                            let g = params.get(i + 3).copied().unwrap_or(0).clamp(0, 255) as u8;
                            let b = params.get(i + 4).copied().unwrap_or(0).clamp(0, 255) as u8;
                            let idx = self.palette.intern_direct(Rgba::rgb(r, g, b));
                            if target_fore {
                                attrs.fore = idx;
                            } else {
                                attrs.back = idx;
                            }
                            i += 4;
                        }
                        _ => {}
                    }
                }
                _ => tracing::debug!(code = params[i], "unhandled SGR code"),
            }
            i += 1;
        }
        let screen = self.screen_mut();
        screen.defaults = attrs;
        screen.color_defaults = attrs;
        screen.fill_defaults = attrs;
    }

    fn device_status_report(&mut self, request: i64) {
        match request {
            5 => self.pending_replies.extend_from_slice(b"\x1b[0n"),
            6 => {
                let screen = self.screen();
                let row = screen.cursor_screen_row() + 1;
                let col = screen.cursor.position.col + 1;
                self.pending_replies
                    .extend_from_slice(format!("\x1b[{};{}R", row, col).as_bytes());
            }
            _ => tracing::debug!(request, "unhandled device status request"),
        }
    }

    fn primary_device_attributes(&mut self) {
        self.pending_replies.extend_from_slice(b"\x1b[?1;2c");
    }

    fn set_palette_entry(&mut self, arg: &str) {
        let mut parts = arg.splitn(2, ';');
        let Some(idx) = parts.next().and_then(|s| s.parse::<u16>().ok()) else {
            return;
        };
        let Some(spec) = parts.next() else { return };
        if let Some(rgb) = parse_hash_rgb(spec) {
            self.palette.set_override(idx, rgb);
        }
    }

    fn hard_reset(&mut self) {
        let (rows, cols) = (self.primary.visible_rows, self.primary.cols);
        let scrollback = self.config.scrollback_lines;
        self.primary = Screen::new(rows, cols, scrollback, true);
        self.alternate = Screen::new(rows, cols, 0, false);
        self.using_alternate = false;
        self.tabstops = TabStops::new(cols);
        self.palette = Palette::new();
        self.match_table.remove_all();
        self.window_title.clear();
        self.icon_title.clear();
        self.primary.mark_all_dirty();
    }

    // ---- public surface: resize / encoding / emulation -------------------

    pub fn resize(&mut self, rows: u16, cols: u16) {
        self.primary.resize(rows, cols, self.config.scrollback_lines);
        self.alternate.resize(rows, cols, 0);
        self.tabstops.resize(cols);
        self.events.push(Event::CharSizeChanged { rows, cols });
    }

    pub fn set_scrollback(&mut self, lines: usize) {
        self.config.scrollback_lines = lines;
        self.primary.set_scrollback(lines);
    }

    pub fn set_encoding(&mut self, name: &str) -> Result<()> {
        let encoding = Encoding::parse(name).ok_or_else(|| Error::UnknownEncoding(name.to_string()))?;
        self.pipeline.set_encoding(encoding);
        self.events.push(Event::EncodingChanged(encoding.name().to_string()));
        Ok(())
    }

    pub fn encoding(&self) -> &'static str {
        self.pipeline.encoding().name()
    }

    pub fn set_emulation(&mut self, name: &str) -> Result<()> {
        if !KNOWN_EMULATIONS.contains(&name) {
            return Err(Error::UnknownEmulation(name.to_string()));
        }
        self.emulation = name.to_string();
        self.events.push(Event::EmulationChanged(name.to_string()));
        Ok(())
    }

    pub fn emulation(&self) -> &str {
        &self.emulation
    }

    pub fn set_word_chars(&mut self, chars: &str) -> Result<()> {
        for c in chars.chars() {
            if c.is_alphanumeric() {
                return Err(Error::WordCharSpec {
                    spec: chars.to_string(),
                    reason: "letters and digits are implicitly word characters",
                });
            }
        }
        self.selection.word_chars = chars.to_string();
        Ok(())
    }

    // ---- match engine -----------------------------------------------------

    pub fn match_add(&mut self, pattern: &str) -> Result<i64> {
        self.match_table.add(pattern)
    }

    pub fn match_remove(&mut self, tag: i64) -> bool {
        self.match_table.remove(tag)
    }

    pub fn match_remove_all(&mut self) {
        self.match_table.remove_all();
    }

    pub fn match_check(&mut self, pos: Position) -> Option<MatchSpan> {
        let screen = if self.using_alternate { &self.alternate } else { &self.primary };
        self.match_table.match_check(screen, pos)
    }

    // ---- selection ----------------------------------------------------

    pub fn select_all(&mut self) {
        let screen = if self.using_alternate { &self.alternate } else { &self.primary };
        let start = Position::new(screen.row_data.delta(), 0);
        let end = Position::new(screen.row_data.next(), 0);
        self.selection.arm(start);
        self.selection.drag(end);
        self.selection.finalize(screen);
        self.events.push(Event::SelectionChanged);
    }

    pub fn select_none(&mut self) {
        self.selection.clear();
        self.events.push(Event::SelectionChanged);
    }

    pub fn start_selection(&mut self, at: Position, mode: SelectionMode) {
        self.selection.mode = mode;
        self.selection.arm(at);
        self.events.push(Event::SelectionChanged);
    }

    pub fn drag_selection(&mut self, to: Position) {
        self.selection.drag(to);
        self.events.push(Event::SelectionChanged);
    }

    pub fn end_selection(&mut self) {
        let screen = if self.using_alternate { &self.alternate } else { &self.primary };
        self.selection.finalize(screen);
        self.events.push(Event::SelectionChanged);
    }

    /// Clear the active selection if `touched` (an inclusive absolute row
    /// range) intersects it and its projected text no longer matches what
    /// was cached at `finalize` time (§4.7).
    fn invalidate_selection(&mut self, touched_start: u64, touched_end: u64) {
        let screen = if self.using_alternate { &self.alternate } else { &self.primary };
        if self.selection.invalidate_if_stale(screen, (touched_start, touched_end)) {
            self.events.push(Event::SelectionChanged);
        }
    }

    pub fn extend_selection(&mut self, to: Position) {
        self.selection.extend_selection(to);
        self.events.push(Event::SelectionChanged);
    }

    pub fn expand_selection_to_word(&mut self) {
        let screen = if self.using_alternate { &self.alternate } else { &self.primary };
        self.selection.expand_to_word(screen);
        self.events.push(Event::SelectionChanged);
    }

    pub fn expand_selection_to_line(&mut self) {
        let screen = if self.using_alternate { &self.alternate } else { &self.primary };
        self.selection.expand_to_line(screen);
        self.events.push(Event::SelectionChanged);
    }

    pub fn selected_text(&self) -> Option<String> {
        let (start, end) = self.selection.range()?;
        Some(get_text_range(self.screen(), (start.row, start.col), (end.row, end.col), false))
    }

    // ---- text access ----------------------------------------------------

    pub fn get_text_range(&self, start: Position, end: Position, trailing_blanks: bool) -> String {
        get_text_range(self.screen(), (start.row, start.col), (end.row, end.col), trailing_blanks)
    }

    /// The whole ring's visible-area text (scrollback plus the visible
    /// rows), one logical line per hard break.
    pub fn get_text(&self) -> String {
        let screen = self.screen();
        dump_plain_text(screen, screen.row_data.delta(), screen.row_data.next())
    }

    /// Write a plain-text reconstruction of the buffer (§6 "Persisted
    /// format"): unistr-decoded UTF-8, newlines at hard-wrap boundaries, no
    /// binary header. `include_trailing` keeps trailing blank cells on each
    /// line instead of eliding them.
    pub fn write_contents<W: std::io::Write>(&self, writer: &mut W, include_trailing: bool) -> std::io::Result<()> {
        let screen = self.screen();
        let text = if include_trailing {
            get_text_range(
                screen,
                (screen.row_data.delta(), 0),
                (screen.row_data.next(), 0),
                true,
            )
        } else {
            self.get_text()
        };
        writer.write_all(text.as_bytes())
    }

    // ---- outgoing byte path (local echo / keyboard / paste) --------------

    /// Queue bytes produced by an external keymap (keyboard/mouse/paste) for
    /// the collaborator that owns the pty write end to drain via
    /// [`Terminal::take_pending_replies`] (§6 "feed_child").
    pub fn feed_child(&mut self, bytes: &[u8]) {
        self.blink.restart();
        self.pending_replies.extend_from_slice(bytes);
    }

    /// Queue pasted text, bracketing it with `ESC [ 200 ~` / `ESC [ 201 ~`
    /// when bracketed-paste mode is active (§6 "Wire protocol").
    pub fn paste(&mut self, text: &str) {
        self.blink.restart();
        if self.screen().modes.bracketed_paste_mode {
            self.pending_replies.extend_from_slice(b"\x1b[200~");
            self.pending_replies.extend_from_slice(text.as_bytes());
            self.pending_replies.extend_from_slice(b"\x1b[201~");
        } else {
            self.pending_replies.extend_from_slice(text.as_bytes());
        }
    }

    pub fn window_title(&self) -> &str {
        &self.window_title
    }

    pub fn icon_title(&self) -> &str {
        &self.icon_title
    }

    pub fn tick_blink(&mut self, dt: std::time::Duration) -> bool {
        self.blink.tick(dt)
    }

    // ---- collaborator-reported lifecycle -------------------------------

    /// Record that the collaborator owning the byte source has seen EOF.
    /// The core never detects this itself (§1 Non-goals: pty ownership).
    pub fn report_eof(&mut self) {
        self.events.push(Event::Eof);
    }

    /// Record that the collaborator's child process exited with `status`.
    pub fn report_child_exited(&mut self, status: i32) {
        self.events.push(Event::ChildExited(status));
    }
}

fn parse_hash_rgb(spec: &str) -> Option<Rgba> {
    let spec = spec.strip_prefix('#')?;
    if spec.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&spec[0..2], 16).ok()?;
    let g = u8::from_str_radix(&spec[2..4], 16).ok()?;
    let b = u8::from_str_radix(&spec[4..6], 16).ok()?;
    Some(Rgba::rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terminal(rows: u16, cols: u16) -> Terminal {
        Terminal::new(rows, cols, TerminalConfig::default())
    }

    #[test]
    fn plain_text_lands_in_the_grid() {
        let mut term = terminal(5, 20);
        term.feed(b"hello");
        let row = term.screen().visible_row(0);
        assert_eq!(row.cells[0].unistr, crate::cell::UniStr::Scalar('h'));
        assert_eq!(term.cursor_position().col, 5);
    }

    #[test]
    fn csi_cursor_position_moves_the_cursor() {
        let mut term = terminal(10, 20);
        term.feed(b"\x1b[5;10H");
        assert_eq!(term.cursor_position().col, 9);
        assert_eq!(term.screen().cursor_screen_row(), 4);
    }

    #[test]
    fn scrolling_region_constrains_linefeeds() {
        let mut term = terminal(5, 10);
        term.feed(b"\x1b[2;4r");
        assert!(term.screen().scrolling_restricted);
        assert_eq!(term.screen().scrolling_region, ScrollRegion { start: 1, end: 3 });
    }

    #[test]
    fn alternate_screen_round_trips_without_touching_primary_history() {
        let mut term = terminal(5, 10);
        term.feed(b"primary");
        term.feed(b"\x1b[?1049h");
        assert!(term.using_alternate);
        term.feed(b"alt");
        term.feed(b"\x1b[?1049l");
        assert!(!term.using_alternate);
        let text = term.get_text_range(Position::new(term.screen().absolute(0), 0), Position::new(term.screen().absolute(0), 10), false);
        assert_eq!(text, "primary");
    }

    #[test]
    fn sgr_bold_sets_the_flag_on_subsequent_writes() {
        let mut term = terminal(3, 10);
        term.feed(b"\x1b[1mx");
        let cell = term.screen().visible_row(0).cells[0];
        assert!(cell.flags.contains(CellFlags::BOLD));
    }

    #[test]
    fn device_status_report_queues_a_reply() {
        let mut term = terminal(5, 10);
        term.feed(b"\x1b[6n");
        let replies = term.take_pending_replies();
        assert_eq!(replies, b"\x1b[1;1R");
    }

    #[test]
    fn match_check_finds_url_after_feeding_text() {
        let mut term = terminal(3, 40);
        term.feed(b"see https://example.com now");
        term.match_add(r"https?://\S+").unwrap();
        let pos = Position::new(term.screen().absolute(0), 8);
        let m = term.match_check(pos).expect("should match");
        assert_eq!(m.text, "https://example.com");
    }
}
