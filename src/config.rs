//! Terminal tunables (§2.3 configuration surface): scrollback depth, the
//! pipeline's pacing knobs, cursor blink interval and word-character set.
//! Loaded from TOML; a parse failure falls back to [`Default`] with a
//! warning rather than failing the caller outright.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub scrollback_lines: usize,
    pub cursor_blink: bool,
    pub cursor_blink_interval_ms: u64,
    /// Idle time with no reported keystroke/mouse activity after which the
    /// cursor stops blinking and pins solid (§4.7). Zero disables the
    /// feature entirely, leaving the cursor blinking forever.
    pub cursor_blink_idle_timeout_ms: u64,
    pub cursor_shape: String,
    /// Extra characters (beyond letters/digits) counted as part of a word
    /// for double-click selection, e.g. `_-./`.
    pub word_chars: String,
    /// Invalidation bounding-box slack margin, in cells (§4.1 step 4).
    pub dirty_slack: u16,
    pub encoding: String,
    pub emulation: String,
    pub scroll_on_output: bool,
    /// Starting/floor per-pass character budget the pipeline's adaptive
    /// pacing adapts from (§4.1).
    pub pipeline_start_budget: usize,
    /// Target wall-clock duration of a single pipeline pass; a pass that
    /// overruns it shrinks the next pass's budget back toward
    /// `pipeline_start_budget`.
    pub pipeline_target_pass_ms: u64,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            scrollback_lines: 10_000,
            cursor_blink: true,
            cursor_blink_interval_ms: 600,
            cursor_blink_idle_timeout_ms: 0,
            cursor_shape: "block".to_string(),
            word_chars: "_-./".to_string(),
            dirty_slack: 1,
            encoding: "UTF-8".to_string(),
            emulation: "xterm-256color".to_string(),
            scroll_on_output: true,
            pipeline_start_budget: 4096,
            pipeline_target_pass_ms: 25,
        }
    }
}

impl TerminalConfig {
    pub fn cursor_blink_interval(&self) -> Duration {
        Duration::from_millis(self.cursor_blink_interval_ms)
    }

    pub fn cursor_blink_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.cursor_blink_idle_timeout_ms)
    }

    pub fn pipeline_target_pass(&self) -> Duration {
        Duration::from_millis(self.pipeline_target_pass_ms)
    }

    pub fn load_from_str(toml_text: &str) -> Result<Self> {
        Ok(toml::from_str(toml_text)?)
    }

    /// Load from a path, falling back to defaults (with a `tracing::warn!`)
    /// if the file is missing, unreadable, or fails to parse.
    pub fn load_from_path(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read terminal config, using defaults");
                return Self::default();
            }
        };
        match Self::load_from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to parse terminal config, using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = TerminalConfig::default();
        assert!(cfg.scrollback_lines > 0);
        assert!(cfg.cursor_blink);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let cfg = TerminalConfig::load_from_str("scrollback_lines = 500\n").unwrap();
        assert_eq!(cfg.scrollback_lines, 500);
        assert!(cfg.cursor_blink); // untouched field keeps its default
    }

    #[test]
    fn malformed_toml_falls_back_to_defaults() {
        let dir = std::env::temp_dir().join(format!("vtcore-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "not valid toml [[[").unwrap();
        let cfg = TerminalConfig::load_from_path(&path);
        assert_eq!(cfg.scrollback_lines, TerminalConfig::default().scrollback_lines);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
