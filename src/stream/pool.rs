//! Reusable byte buffers shared between parses.
//!
//! A tokenizer's look-ahead buffer is a few kilobytes that live exactly as
//! long as one parse. Callers running many parses can hand one shared
//! [`BufferPool`] to `TokenStream::with_pool` so the allocation is recycled
//! instead of repeated per message. The pool holds no per-parse state and
//! is safe to share across threads; acquisition and release are explicit.

use std::sync::{Mutex, MutexGuard};

pub struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
    /// Buffers grown past this are dropped on release instead of retained,
    /// so one pathological message cannot pin memory indefinitely.
    max_retained: usize,
    max_idle: usize,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::with_limits(64 * 1024, 16)
    }

    pub fn with_limits(max_retained: usize, max_idle: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_retained,
            max_idle,
        }
    }

    fn free(&self) -> MutexGuard<'_, Vec<Vec<u8>>> {
        // a poisoning panic cannot leave the free list inconsistent
        self.free.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Take a buffer, zeroed to `len` bytes. Falls back to a fresh
    /// allocation when the free list is empty.
    pub fn acquire(&self, len: usize) -> Vec<u8> {
        let mut buf = self.free().pop().unwrap_or_default();
        buf.clear();
        buf.resize(len, 0);
        buf
    }

    /// Hand a buffer back for reuse.
    pub fn release(&self, buf: Vec<u8>) {
        if buf.capacity() == 0 || buf.capacity() > self.max_retained {
            return;
        }
        let mut free = self.free();
        if free.len() < self.max_idle {
            free.push(buf);
        }
    }

    /// Buffers currently idle in the pool.
    pub fn idle(&self) -> usize {
        self.free().len()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}
