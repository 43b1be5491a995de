//! Bounded in-memory diagnostic sink.
//!
//! Keeps the most recent reports in a fixed-size ring with FIFO eviction, so
//! a burst of failures cannot grow memory without bound.
//!
//! # Design Principles
//!
//! - **Bounded memory**: fixed entry count and a per-entry byte cap
//! - **FIFO eviction**: the oldest report is dropped first
//! - **RwLock-based**: concurrent readers, exclusive writers; poisoning is recovered
//! - **Cheap reads**: entries hold `Arc<str>`, so cloning is a refcount bump
//!
//! # Example
//!
//! ```rust
//! use failchain_diagnostics::{DiagnosticReport, DiagnosticSink, Failure, RingBufferSink};
//!
//! let sink = RingBufferSink::new(100, 2048);
//!
//! let failure = Failure::new("FileNotFound", "missing");
//! sink.record(&DiagnosticReport::new(&failure).unwrap());
//!
//! let recent = sink.get_recent(10);
//! assert_eq!(recent[0].kind.as_ref(), "FileNotFound");
//! ```

use crate::{Category, DiagnosticReport, DiagnosticSink, LogLevel};
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

/// One stored report with bounded size.
#[derive(Clone, Debug)]
pub struct ReportEntry {
    /// Unix timestamp of recording
    pub timestamp: u64,
    /// Logging action selected by the category
    pub level: LogLevel,
    /// Category of the outermost level
    pub category: Category,
    /// Kind of the outermost level
    pub kind: Arc<str>,
    /// User-facing explanation, including the flattened chain
    pub explanation: Arc<str>,
    /// Collected annotations
    pub data: Arc<str>,
    /// Number of levels in the reported chain
    pub depth: usize,
    /// Approximate size in bytes
    pub size_bytes: usize,
}

/// Fixed-size ring with exact allocation (no growth).
struct RingBuffer {
    entries: Box<[Option<ReportEntry>]>,
    tail: usize,
    head: usize,
    len: usize,
}

impl RingBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            entries: std::iter::repeat_with(|| None)
                .take(capacity)
                .collect::<Box<[Option<ReportEntry>]>>(),
            tail: 0,
            head: 0,
            len: 0,
        }
    }

    fn push(&mut self, entry: ReportEntry) -> Option<ReportEntry> {
        let evicted = self.entries[self.tail].replace(entry);
        self.tail = (self.tail + 1) % self.entries.len();

        if self.len < self.entries.len() {
            self.len += 1;
        } else {
            self.head = (self.head + 1) % self.entries.len();
        }

        evicted
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    fn iter(&self) -> impl DoubleEndedIterator<Item = &ReportEntry> {
        let head = self.head;
        let len = self.len;
        let cap = self.entries.len();

        (0..len).filter_map(move |i| {
            let idx = (head + i) % cap;
            self.entries[idx].as_ref()
        })
    }

    fn clear(&mut self) {
        for entry in self.entries.iter_mut() {
            *entry = None;
        }
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }
}

/// Ring buffer sink with bounded memory usage.
///
/// Clones share the same buffer.
pub struct RingBufferSink {
    buffer: Arc<RwLock<RingBuffer>>,
    max_entries: usize,
    max_entry_bytes: usize,
    eviction_count: Arc<AtomicU64>,
}

impl RingBufferSink {
    /// Create a sink holding at most `max_entries` reports (minimum 1) of at
    /// most `max_entry_bytes` payload bytes each.
    pub fn new(max_entries: usize, max_entry_bytes: usize) -> Self {
        let bounded_entries = max_entries.max(1);
        Self {
            buffer: Arc::new(RwLock::new(RingBuffer::new(bounded_entries))),
            max_entries: bounded_entries,
            max_entry_bytes,
            eviction_count: Arc::new(AtomicU64::new(0)),
        }
    }

    #[inline]
    fn read_buffer(&self) -> RwLockReadGuard<'_, RingBuffer> {
        match self.buffer.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[inline]
    fn write_buffer(&self) -> RwLockWriteGuard<'_, RingBuffer> {
        match self.buffer.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Copy a report into a bounded entry.
    ///
    /// Budget order: kind (cap 128), explanation (cap 512), data (rest).
    fn create_entry(&self, report: &DiagnosticReport<'_>) -> ReportEntry {
        let mut size = 0usize;
        let mut remaining = self.max_entry_bytes;

        let kind = truncate_to_bytes(report.kind(), remaining.min(128));
        size += kind.len();
        remaining = remaining.saturating_sub(kind.len());

        let explanation = truncate_to_bytes(report.explanation(), remaining.min(512));
        size += explanation.len();
        remaining = remaining.saturating_sub(explanation.len());

        let data = truncate_to_bytes(report.data(), remaining);
        size += data.len();

        ReportEntry {
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_secs()),
            level: report.log_level(),
            category: report.category(),
            kind: Arc::from(kind.as_ref()),
            explanation: Arc::from(explanation.as_ref()),
            data: Arc::from(data.as_ref()),
            depth: report.failure().depth(),
            size_bytes: size,
        }
    }

    /// Get the N most recent entries, newest first.
    pub fn get_recent(&self, count: usize) -> Vec<ReportEntry> {
        let buffer = self.read_buffer();
        buffer.iter().rev().take(count).cloned().collect()
    }

    /// Get all entries, newest first.
    pub fn get_all(&self) -> Vec<ReportEntry> {
        let buffer = self.read_buffer();
        buffer.iter().rev().cloned().collect()
    }

    /// Get entries matching a predicate, oldest first.
    ///
    /// ```rust
    /// # use failchain_diagnostics::{Category, RingBufferSink};
    /// # let sink = RingBufferSink::new(100, 1024);
    /// let denied = sink.get_filtered(|entry| entry.category == Category::AccessDenied);
    /// # assert!(denied.is_empty());
    /// ```
    pub fn get_filtered<F>(&self, predicate: F) -> Vec<ReportEntry>
    where
        F: Fn(&ReportEntry) -> bool,
    {
        let buffer = self.read_buffer();
        buffer.iter().filter(|e| predicate(e)).cloned().collect()
    }

    /// Number of stored entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.read_buffer().len()
    }

    /// Whether no entry is stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total payload bytes held (lower-bound estimate).
    pub fn payload_bytes(&self) -> usize {
        let buffer = self.read_buffer();
        buffer.iter().map(|e| e.size_bytes).sum()
    }

    /// Total number of evictions since creation.
    #[inline]
    pub fn eviction_count(&self) -> u64 {
        self.eviction_count.load(Ordering::Relaxed)
    }

    /// Drop every entry. The eviction count is kept.
    pub fn clear(&self) {
        self.write_buffer().clear();
    }

    /// Maximum number of entries.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Whether the next record evicts an entry.
    pub fn is_full(&self) -> bool {
        self.len() >= self.max_entries
    }
}

impl DiagnosticSink for RingBufferSink {
    fn record(&self, report: &DiagnosticReport<'_>) {
        let entry = self.create_entry(report);
        let mut buffer = self.write_buffer();
        if buffer.push(entry).is_some() {
            self.eviction_count.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Clone for RingBufferSink {
    fn clone(&self) -> Self {
        Self {
            buffer: Arc::clone(&self.buffer),
            max_entries: self.max_entries,
            max_entry_bytes: self.max_entry_bytes,
            eviction_count: Arc::clone(&self.eviction_count),
        }
    }
}

/// Truncate to at most `max_bytes`, respecting UTF-8 boundaries.
fn truncate_to_bytes(s: &str, max_bytes: usize) -> Cow<'_, str> {
    if max_bytes == 0 {
        return Cow::Borrowed("");
    }
    if s.len() <= max_bytes {
        return Cow::Borrowed(s);
    }

    let indicator = "...[TRUNC]";
    if max_bytes <= indicator.len() {
        return Cow::Borrowed(&indicator[..max_bytes]);
    }
    let max_content = max_bytes - indicator.len();

    let mut idx = max_content;
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }

    if idx == 0 {
        return Cow::Borrowed(indicator);
    }

    let mut out = String::with_capacity(idx + indicator.len());
    out.push_str(&s[..idx]);
    out.push_str(indicator);
    Cow::Owned(out)
}
