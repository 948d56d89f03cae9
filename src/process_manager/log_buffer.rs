use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;

use super::lock;

pub const DEFAULT_LOG_BUFFER_BYTES: usize = 8 * 1024 * 1024;
pub const TRUNCATED_MARKER: &str = "[truncated]\n";

/// Append-only byte log shared between a runner's readers and the UI.
///
/// Offsets are logical: `size()` counts every byte ever appended, so it never
/// decreases even after the oldest bytes are evicted to respect the capacity.
#[derive(Debug)]
pub struct LogBuffer {
    capacity: usize,
    inner: Mutex<LogBufferInner>,
}

#[derive(Debug, Default)]
struct LogBufferInner {
    data: VecDeque<u8>,
    evicted: usize,
    first_write_at: Option<Instant>,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_BUFFER_BYTES)
    }
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(LogBufferInner::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn append(&self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let mut inner = lock(&self.inner);
        inner.push(bytes, self.capacity);
    }

    /// Appends `line` as one whole line, starting a fresh line first when the
    /// buffer ends mid-line.
    pub fn append_line(&self, line: &str) {
        let mut inner = lock(&self.inner);
        if inner.data.back().is_some_and(|last| *last != b'\n') {
            inner.push(b"\n", self.capacity);
        }
        inner.push(line.as_bytes(), self.capacity);
        inner.push(b"\n", self.capacity);
    }

    pub fn size(&self) -> usize {
        let inner = lock(&self.inner);
        inner.evicted + inner.data.len()
    }

    /// Copies the logical range `[from, to)`. Bounds past `size()` are
    /// clamped. When `from` falls before the retained window the copy starts
    /// with [`TRUNCATED_MARKER`] followed by the oldest retained byte.
    pub fn slice(&self, from: usize, to: usize) -> Vec<u8> {
        let inner = lock(&self.inner);
        let size = inner.evicted + inner.data.len();
        let to = to.min(size);
        let from = from.min(to);
        if from >= inner.evicted {
            return inner
                .data
                .range(from - inner.evicted..to - inner.evicted)
                .copied()
                .collect();
        }
        let mut out = TRUNCATED_MARKER.as_bytes().to_vec();
        let retained_end = to.saturating_sub(inner.evicted);
        out.extend(inner.data.range(..retained_end).copied());
        out
    }

    pub fn contents(&self) -> Vec<u8> {
        self.slice(0, usize::MAX)
    }

    pub fn first_write_at(&self) -> Option<Instant> {
        lock(&self.inner).first_write_at
    }
}

impl LogBufferInner {
    fn push(&mut self, bytes: &[u8], capacity: usize) {
        if self.first_write_at.is_none() {
            self.first_write_at = Some(Instant::now());
        }
        self.data.extend(bytes.iter().copied());
        if self.data.len() > capacity {
            let excess = self.data.len() - capacity;
            self.data.drain(..excess);
            self.evicted += excess;
        }
    }
}
