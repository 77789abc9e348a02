//! The incoming byte pipeline (§4.1): chunked reads feed a decoder, decoded
//! characters feed the sequence matcher, and matched actions are coalesced
//! for the dispatch layer with an adaptive per-pass budget and a
//! bounding-box invalidation tracker.

use std::collections::VecDeque;
use std::mem;
use std::time::{Duration, Instant};

use crate::chunk::{ChunkPool, CHUNK_SIZE};
use crate::decoder::{Decoder, Encoding};
use crate::events::DirtyRect;
use crate::matcher::{MatchOutcome, Sequence, SequenceMatcher};

/// Absolute floor under any configured starting budget, so a misconfigured
/// zero or tiny value can't stall the drain loop.
const ABSOLUTE_MIN_BUDGET: usize = 256;
/// Ceiling so a single pathological pass can't block the caller's event
/// loop indefinitely, regardless of configuration.
const MAX_BUDGET: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A run of consecutive printable characters, coalesced from
    /// individual [`MatchOutcome::Print`]s.
    PlainText(String),
    Control(char),
    Sequence(Sequence),
}

/// Drives chunking, decoding and matching; owns the adaptive pacing budget
/// a caller (the terminal's dispatch loop) uses to target roughly 40Hz
/// processing passes under steady load.
pub struct Pipeline {
    pool: ChunkPool,
    decoder: Decoder,
    matcher: SequenceMatcher,
    pending_chars: VecDeque<char>,
    budget: usize,
    start_budget: usize,
    target_pass: Duration,
}

impl Pipeline {
    /// `start_budget` is the floor the adaptive budget grows from and
    /// shrinks back to; `target_pass` is the wall-clock duration a single
    /// [`Pipeline::process_incoming`] pass aims to stay under (§2.3). A
    /// `target_pass` of `Duration::ZERO` disables the overrun-shrink check.
    pub fn new(encoding: Encoding, start_budget: usize, target_pass: Duration) -> Self {
        let start_budget = start_budget.max(ABSOLUTE_MIN_BUDGET);
        Self {
            pool: ChunkPool::new(),
            decoder: Decoder::new(encoding),
            matcher: SequenceMatcher::new(),
            pending_chars: VecDeque::new(),
            budget: start_budget,
            start_budget,
            target_pass,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.decoder.encoding()
    }

    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.decoder.set_encoding(encoding);
    }

    /// Chunk, decode and buffer raw bytes. Does not itself run the matcher —
    /// call [`Pipeline::process_incoming`] to drain a pass.
    pub fn feed(&mut self, bytes: &[u8]) {
        for slice in bytes.chunks(CHUNK_SIZE) {
            let mut chunk = self.pool.acquire();
            chunk.data[..slice.len()].copy_from_slice(slice);
            chunk.len = slice.len();
            let mut decoded = Vec::new();
            self.decoder.feed(chunk.as_slice(), &mut decoded);
            self.pending_chars.extend(decoded);
            self.pool.release(chunk);
        }
        self.adapt_budget();
        self.pool.prune(8);
    }

    /// Grow the per-pass budget with the backlog so a burst drains in fewer,
    /// larger passes, and shrink it back down once the backlog clears so
    /// steady typing stays on a responsive per-pass cadence.
    fn adapt_budget(&mut self) {
        let backlog = self.pending_chars.len();
        self.budget = backlog.max(self.start_budget).min(MAX_BUDGET);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending_chars.is_empty() || self.matcher.in_progress()
    }

    /// Whether a further [`Pipeline::process_incoming`] call would have any
    /// decoded characters to consume. Unlike [`Pipeline::has_pending`], this
    /// excludes an in-progress sequence waiting on more bytes — a caller
    /// draining passes in a loop must stop on this, not on `has_pending`,
    /// or an incomplete sequence at end-of-input spins forever.
    pub fn has_buffered_chars(&self) -> bool {
        !self.pending_chars.is_empty()
    }

    /// Run the matcher over up to one pass's worth of buffered characters,
    /// coalescing consecutive plain characters into single [`Action::PlainText`]
    /// runs.
    pub fn process_incoming(&mut self) -> Vec<Action> {
        let started = Instant::now();
        let mut actions = Vec::new();
        let mut run = String::new();
        let mut consumed = 0usize;

        while consumed < self.budget {
            let Some(c) = self.pending_chars.pop_front() else {
                break;
            };
            consumed += 1;
            match self.matcher.push(c) {
                MatchOutcome::Print(p) => run.push(p),
                MatchOutcome::Pending => {}
                MatchOutcome::Control(ctrl) => {
                    flush_run(&mut run, &mut actions);
                    actions.push(Action::Control(ctrl));
                }
                MatchOutcome::Sequence(seq) => {
                    flush_run(&mut run, &mut actions);
                    actions.push(Action::Sequence(seq));
                }
            }
        }
        flush_run(&mut run, &mut actions);
        if self.target_pass > Duration::ZERO && started.elapsed() > self.target_pass {
            self.budget = (self.budget / 2).max(self.start_budget);
        }
        actions
    }
}

fn flush_run(run: &mut String, actions: &mut Vec<Action>) {
    if !run.is_empty() {
        actions.push(Action::PlainText(mem::take(run)));
    }
}

/// Coalesces per-mutation dirty rectangles across a pass into a single
/// bounding box, expanded by a slack margin on flush so neighbouring
/// small updates don't each trigger their own repaint region (§4.1 step 4).
pub struct DirtyTracker {
    rect: Option<DirtyRect>,
    slack: u16,
}

impl DirtyTracker {
    pub fn new(slack: u16) -> Self {
        Self { rect: None, slack }
    }

    pub fn mark(&mut self, rect: DirtyRect) {
        self.rect = Some(match self.rect.take() {
            Some(existing) => existing.union(rect),
            None => rect,
        });
    }

    pub fn mark_row(&mut self, row: u16, cols: u16) {
        self.mark(DirtyRect::rows(row, row, cols));
    }

    pub fn is_dirty(&self) -> bool {
        self.rect.is_some()
    }

    /// Take the accumulated rectangle, expanded by the slack margin and
    /// clamped to the visible grid, clearing state for the next pass.
    pub fn take(&mut self, max_row: u16, max_col: u16) -> Option<DirtyRect> {
        self.rect.take().map(|r| DirtyRect {
            row_start: r.row_start.saturating_sub(self.slack),
            row_end: r.row_end.saturating_add(self.slack).min(max_row),
            col_start: r.col_start.saturating_sub(self.slack),
            col_end: r.col_end.saturating_add(self.slack).min(max_col),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_START_BUDGET: usize = 4096;

    fn pipeline() -> Pipeline {
        Pipeline::new(Encoding::Utf8, TEST_START_BUDGET, Duration::from_millis(25))
    }

    #[test]
    fn plain_bytes_coalesce_into_one_run() {
        let mut p = pipeline();
        p.feed(b"hello");
        let actions = p.process_incoming();
        assert_eq!(actions, vec![Action::PlainText("hello".to_string())]);
    }

    #[test]
    fn sequence_splits_surrounding_plain_text_runs() {
        let mut p = pipeline();
        p.feed(b"ab\x1b[2Jcd");
        let actions = p.process_incoming();
        assert_eq!(actions.len(), 3);
        assert_eq!(actions[0], Action::PlainText("ab".to_string()));
        assert!(matches!(actions[1], Action::Sequence(_)));
        assert_eq!(actions[2], Action::PlainText("cd".to_string()));
    }

    #[test]
    fn budget_grows_with_backlog_and_shrinks_once_drained() {
        let mut p = pipeline();
        let burst = vec![b'x'; TEST_START_BUDGET * 3];
        p.feed(&burst);
        assert!(p.budget >= TEST_START_BUDGET * 3 || p.budget == MAX_BUDGET);
        p.process_incoming();
        p.feed(b"y");
        assert_eq!(p.budget, TEST_START_BUDGET);
    }

    #[test]
    fn dirty_tracker_expands_by_slack_and_clamps() {
        let mut t = DirtyTracker::new(2);
        t.mark(DirtyRect::rows(5, 5, 10));
        let rect = t.take(20, 20).unwrap();
        assert_eq!(rect.row_start, 3);
        assert_eq!(rect.row_end, 7);
        assert!(!t.is_dirty());
    }
}
