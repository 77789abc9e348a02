//! Process-wide shared runtime (§4.1 "Chunk pool" note on cross-terminal
//! reuse, §9 design notes on thread-safety). A single [`Runtime`], wrapped
//! in an `Arc`, can be shared by every [`crate::terminal::Terminal`] a
//! process hosts so their chunk pools draw from one free list instead of
//! each maintaining its own.

use parking_lot::Mutex;

use crate::chunk::{Chunk, ChunkPool};

pub struct Runtime {
    pool: Mutex<ChunkPool>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self {
            pool: Mutex::new(ChunkPool::new()),
        }
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire_chunk(&self) -> Chunk {
        self.pool.lock().acquire()
    }

    pub fn release_chunk(&self, chunk: Chunk) {
        self.pool.lock().release(chunk);
    }

    pub fn prune_chunks(&self, keep_n: usize) {
        self.pool.lock().prune(keep_n);
    }

    pub fn idle_chunk_count(&self) -> usize {
        self.pool.lock().idle_count()
    }
}
