//! Mode flags (§3 "Mode flags") shared by both screens' housekeeping but
//! tracked per-screen since primary/alternate can diverge (e.g. a full-screen
//! app can leave insert-mode on when it exits to the shell, which should not
//! affect the shell's own modes).

#[derive(Debug, Clone)]
pub struct ScreenModes {
    pub insert_mode: bool,
    /// LF -> CRLF on output (LNM).
    pub linefeed_mode: bool,
    /// DECOM: cursor addressing relative to the scrolling region.
    pub origin_mode: bool,
    /// Global video reverse (DECSCNM).
    pub reverse_mode: bool,
    /// Local echo off when true (SRM).
    pub sendrecv_mode: bool,
    pub bracketed_paste_mode: bool,
    /// DEC Special Graphics (line-drawing) charset active in G0.
    pub alternate_charset: bool,
    pub status_line: bool,
    pub status_line_changed: bool,
    pub status_line_contents: String,
    /// DECAWM: autowrap.
    pub autowrap: bool,
    /// xterm-compat deferred wrap: wrap happens on the *next* character
    /// rather than the one that reached the margin.
    pub xn: bool,
    pub cursor_keys_application: bool,
    pub cursor_visible: bool,
}

impl Default for ScreenModes {
    fn default() -> Self {
        Self {
            insert_mode: false,
            linefeed_mode: false,
            origin_mode: false,
            reverse_mode: false,
            sendrecv_mode: false,
            bracketed_paste_mode: false,
            alternate_charset: false,
            status_line: false,
            status_line_changed: false,
            status_line_contents: String::new(),
            autowrap: true,
            xn: true,
            cursor_keys_application: false,
            cursor_visible: true,
        }
    }
}

/// Mouse-tracking related modes live at the terminal (not per-screen) level
/// since they describe the PTY wire protocol, not grid rendering.
#[derive(Debug, Clone, Default)]
pub struct MouseModes {
    pub tracking: bool,
    pub motion: bool,
    pub all_motion: bool,
    pub sgr: bool,
    pub utf8: bool,
    pub focus_events: bool,
    pub alternate_scroll: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEncoding {
    X10,
    Normal,
    ButtonEvent,
    AnyEvent,
}
