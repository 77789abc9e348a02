//! Sequence matcher (§4.3): turns a stream of decoded characters into a
//! stream of outcomes — plain printable characters, C0 controls executed
//! immediately, and fully recognized ESC/CSI/OSC sequences.
//!
//! Hand-rolled rather than built on a byte-level VT parser crate: those
//! crates commit to a callback-per-final-byte API, not the
//! complete/plain-run/incomplete-prefix contract this module needs to
//! expose to the pipeline. The state table below (Ground / Escape /
//! CsiParam / Osc) is the same shape as the classic VT500 parser every
//! serious terminal emulator converges on.

use std::mem;

#[derive(Debug, Clone, PartialEq)]
pub enum Sequence {
    Escape {
        intermediates: Vec<char>,
        final_byte: char,
    },
    Csi {
        params: Vec<i64>,
        intermediates: Vec<char>,
        private: Option<char>,
        final_byte: char,
    },
    Osc {
        data: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// An ordinary printable character, no sequence involved.
    Print(char),
    /// A C0 control character, executed immediately even if it interrupted
    /// an in-progress sequence (§4.3 "control-character permutation"). The
    /// interrupted sequence's state is untouched and resumes on the next
    /// `push`.
    Control(char),
    /// A sequence completed with this character.
    Sequence(Sequence),
    /// The character was consumed into an in-progress sequence; no action
    /// yet, more input needed.
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    CsiParam,
    Osc,
    OscEscape,
}

#[derive(Debug)]
pub struct SequenceMatcher {
    state: State,
    intermediates: Vec<char>,
    params_raw: String,
    private: Option<char>,
    osc_buf: String,
}

impl Default for SequenceMatcher {
    fn default() -> Self {
        Self {
            state: State::Ground,
            intermediates: Vec::new(),
            params_raw: String::new(),
            private: None,
            osc_buf: String::new(),
        }
    }
}

impl SequenceMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a sequence is buffered but not yet complete.
    pub fn in_progress(&self) -> bool {
        self.state != State::Ground
    }

    pub fn push(&mut self, c: char) -> MatchOutcome {
        match self.state {
            State::Osc => return self.push_osc(c),
            State::OscEscape => return self.push_osc_escape(c),
            _ => {}
        }

        if is_c0_control(c) && c != '\u{1b}' {
            return MatchOutcome::Control(c);
        }

        match self.state {
            State::Ground => {
                if c == '\u{1b}' {
                    self.state = State::Escape;
                    self.intermediates.clear();
                    MatchOutcome::Pending
                } else {
                    MatchOutcome::Print(c)
                }
            }
            State::Escape => self.push_escape(c),
            State::CsiParam => self.push_csi(c),
            State::Osc | State::OscEscape => unreachable!(),
        }
    }

    fn push_escape(&mut self, c: char) -> MatchOutcome {
        match c {
            '[' => {
                self.state = State::CsiParam;
                self.params_raw.clear();
                self.private = None;
                self.intermediates.clear();
                MatchOutcome::Pending
            }
            ']' => {
                self.state = State::Osc;
                self.osc_buf.clear();
                MatchOutcome::Pending
            }
            '\u{20}'..='\u{2f}' => {
                self.intermediates.push(c);
                MatchOutcome::Pending
            }
            '\u{30}'..='\u{7e}' => {
                let seq = Sequence::Escape {
                    intermediates: mem::take(&mut self.intermediates),
                    final_byte: c,
                };
                self.reset();
                MatchOutcome::Sequence(seq)
            }
            _ => {
                self.reset();
                MatchOutcome::Print(c)
            }
        }
    }

    fn push_csi(&mut self, c: char) -> MatchOutcome {
        match c {
            '0'..='9' | ';' => {
                self.params_raw.push(c);
                MatchOutcome::Pending
            }
            '<' | '=' | '>' | '?' if self.params_raw.is_empty() && self.private.is_none() => {
                self.private = Some(c);
                MatchOutcome::Pending
            }
            '\u{20}'..='\u{2f}' => {
                self.intermediates.push(c);
                MatchOutcome::Pending
            }
            '\u{40}'..='\u{7e}' => {
                let params: Vec<i64> = if self.params_raw.is_empty() {
                    Vec::new()
                } else {
                    self.params_raw
                        .split(';')
                        .map(|p| p.parse::<i64>().unwrap_or(0))
                        .collect()
                };
                let seq = Sequence::Csi {
                    params,
                    intermediates: mem::take(&mut self.intermediates),
                    private: self.private.take(),
                    final_byte: c,
                };
                self.reset();
                MatchOutcome::Sequence(seq)
            }
            _ => {
                self.reset();
                MatchOutcome::Print(c)
            }
        }
    }

    fn push_osc(&mut self, c: char) -> MatchOutcome {
        match c {
            '\u{07}' => {
                let seq = Sequence::Osc {
                    data: mem::take(&mut self.osc_buf),
                };
                self.reset();
                MatchOutcome::Sequence(seq)
            }
            '\u{1b}' => {
                self.state = State::OscEscape;
                MatchOutcome::Pending
            }
            _ => {
                self.osc_buf.push(c);
                MatchOutcome::Pending
            }
        }
    }

    fn push_osc_escape(&mut self, c: char) -> MatchOutcome {
        if c == '\\' {
            let seq = Sequence::Osc {
                data: mem::take(&mut self.osc_buf),
            };
            self.reset();
            MatchOutcome::Sequence(seq)
        } else {
            // Not a valid ST after all; the OSC is abandoned and `c` is
            // reprocessed from Ground (it may itself start a new sequence).
            self.reset();
            self.push(c)
        }
    }

    fn reset(&mut self) {
        self.state = State::Ground;
        self.intermediates.clear();
        self.params_raw.clear();
        self.private = None;
        self.osc_buf.clear();
    }
}

fn is_c0_control(c: char) -> bool {
    (c as u32) < 0x20 || c as u32 == 0x7f
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(m: &mut SequenceMatcher, s: &str) -> Vec<MatchOutcome> {
        s.chars().map(|c| m.push(c)).collect()
    }

    #[test]
    fn plain_text_prints_each_character() {
        let mut m = SequenceMatcher::new();
        let outcomes = feed(&mut m, "hi");
        assert_eq!(outcomes, vec![MatchOutcome::Print('h'), MatchOutcome::Print('i')]);
    }

    #[test]
    fn csi_sequence_completes_on_final_byte() {
        let mut m = SequenceMatcher::new();
        let outcomes = feed(&mut m, "\u{1b}[1;2H");
        let last = outcomes.last().unwrap().clone();
        assert_eq!(
            last,
            MatchOutcome::Sequence(Sequence::Csi {
                params: vec![1, 2],
                intermediates: vec![],
                private: None,
                final_byte: 'H',
            })
        );
        assert!(!m.in_progress());
    }

    #[test]
    fn private_marker_is_captured_once() {
        let mut m = SequenceMatcher::new();
        let outcomes = feed(&mut m, "\u{1b}[?25h");
        let last = outcomes.last().unwrap().clone();
        assert_eq!(
            last,
            MatchOutcome::Sequence(Sequence::Csi {
                params: vec![25],
                intermediates: vec![],
                private: Some('?'),
                final_byte: 'h',
            })
        );
    }

    #[test]
    fn control_character_permutes_mid_sequence_and_resumes() {
        let mut m = SequenceMatcher::new();
        assert_eq!(m.push('\u{1b}'), MatchOutcome::Pending);
        assert_eq!(m.push('['), MatchOutcome::Pending);
        assert_eq!(m.push('1'), MatchOutcome::Pending);
        // A bare LF arrives mid-sequence; it executes immediately...
        assert_eq!(m.push('\n'), MatchOutcome::Control('\n'));
        assert!(m.in_progress());
        // ...and the CSI sequence resumes exactly where it left off.
        assert_eq!(m.push(';'), MatchOutcome::Pending);
        assert_eq!(m.push('2'), MatchOutcome::Pending);
        let last = m.push('H');
        assert_eq!(
            last,
            MatchOutcome::Sequence(Sequence::Csi {
                params: vec![1, 2],
                intermediates: vec![],
                private: None,
                final_byte: 'H',
            })
        );
    }

    #[test]
    fn osc_terminates_on_bel_or_string_terminator() {
        let mut m = SequenceMatcher::new();
        let outcomes = feed(&mut m, "\u{1b}]0;title\u{07}");
        assert_eq!(
            outcomes.last().unwrap().clone(),
            MatchOutcome::Sequence(Sequence::Osc {
                data: "0;title".to_string()
            })
        );

        let mut m2 = SequenceMatcher::new();
        let outcomes = feed(&mut m2, "\u{1b}]0;title\u{1b}\\");
        assert_eq!(
            outcomes.last().unwrap().clone(),
            MatchOutcome::Sequence(Sequence::Osc {
                data: "0;title".to_string()
            })
        );
    }

    #[test]
    fn escape_sequence_without_csi_completes() {
        let mut m = SequenceMatcher::new();
        let outcomes = feed(&mut m, "\u{1b}M");
        assert_eq!(
            outcomes.last().unwrap().clone(),
            MatchOutcome::Sequence(Sequence::Escape {
                intermediates: vec![],
                final_byte: 'M',
            })
        );
    }
}
