//! Chunk events delivered by the transport layer.
//!
//! A multipart body arrives as an ordered sequence of [`ChunkEvent`]s. Each event names the
//! field it belongs to, carries a (possibly empty) payload and tells whether it is the last
//! chunk of that field.
//!
//! Payloads are held in a [`ChunkBuf`]. A `ChunkBuf` is released exactly once: either when
//! [`ChunkBuf::release`] consumes it or when it is dropped on any other path. Attaching a
//! [`BufferTracker`] makes that lifecycle observable, which is how tests and diagnostics
//! assert that no buffer leaks and none is released twice.

use bytes::Bytes;
use mime::Mime;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Observes the acquire/release lifecycle of chunk buffers.
pub trait BufferTracker: Send + Sync {
    fn acquired(&self, len: usize);

    fn released(&self, len: usize);
}

/// A [`BufferTracker`] counting acquisitions and releases.
#[derive(Debug, Default)]
pub struct CountingTracker {
    acquired: AtomicUsize,
    released: AtomicUsize,
    outstanding_bytes: AtomicU64,
}

impl CountingTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn acquired_count(&self) -> usize {
        self.acquired.load(Ordering::Acquire)
    }

    pub fn released_count(&self) -> usize {
        self.released.load(Ordering::Acquire)
    }

    /// bytes acquired but not yet released
    pub fn outstanding_bytes(&self) -> u64 {
        self.outstanding_bytes.load(Ordering::Acquire)
    }

    /// Returns true when every acquired buffer has been released.
    pub fn is_balanced(&self) -> bool {
        self.acquired_count() == self.released_count() && self.outstanding_bytes() == 0
    }
}

impl BufferTracker for CountingTracker {
    fn acquired(&self, len: usize) {
        self.acquired.fetch_add(1, Ordering::AcqRel);
        self.outstanding_bytes.fetch_add(len as u64, Ordering::AcqRel);
    }

    fn released(&self, len: usize) {
        self.released.fetch_add(1, Ordering::AcqRel);
        self.outstanding_bytes.fetch_sub(len as u64, Ordering::AcqRel);
    }
}

/// The raw payload of one chunk.
pub struct ChunkBuf {
    bytes: Bytes,
    tracker: Option<Arc<dyn BufferTracker>>,
}

impl ChunkBuf {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self { bytes: bytes.into(), tracker: None }
    }

    /// Creates a buffer whose acquisition and release are reported to `tracker`.
    pub fn tracked(bytes: impl Into<Bytes>, tracker: Arc<dyn BufferTracker>) -> Self {
        let bytes = bytes.into();
        tracker.acquired(bytes.len());
        Self { bytes, tracker: Some(tracker) }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Gives the buffer back. Consuming `self` makes a second release impossible.
    #[inline]
    pub fn release(self) {}
}

impl Drop for ChunkBuf {
    fn drop(&mut self) {
        if let Some(tracker) = self.tracker.take() {
            tracker.released(self.bytes.len());
        }
    }
}

impl fmt::Debug for ChunkBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkBuf").field("len", &self.bytes.len()).field("tracked", &self.tracker.is_some()).finish()
    }
}

/// What kind of field a chunk belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartKind {
    /// a simple form value
    Attribute,
    /// an uploaded file
    File { filename: String, content_type: Mime },
}

/// Field metadata repeated on every chunk of the field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartHeader {
    name: String,
    kind: PartKind,
}

impl PartHeader {
    pub fn attribute(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: PartKind::Attribute }
    }

    pub fn file(name: impl Into<String>, filename: impl Into<String>, content_type: Mime) -> Self {
        Self { name: name.into(), kind: PartKind::File { filename: filename.into(), content_type } }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &PartKind {
        &self.kind
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, PartKind::File { .. })
    }
}

/// One chunk of one multipart field.
#[derive(Debug)]
pub struct ChunkEvent {
    header: PartHeader,
    data: ChunkBuf,
    last: bool,
}

impl ChunkEvent {
    pub fn new(header: PartHeader, data: ChunkBuf, last: bool) -> Self {
        Self { header, data, last }
    }

    pub fn attribute(name: impl Into<String>, data: ChunkBuf, last: bool) -> Self {
        Self::new(PartHeader::attribute(name), data, last)
    }

    pub fn file(name: impl Into<String>, filename: impl Into<String>, content_type: Mime, data: ChunkBuf, last: bool) -> Self {
        Self::new(PartHeader::file(name, filename, content_type), data, last)
    }

    pub fn header(&self) -> &PartHeader {
        &self.header
    }

    pub fn name(&self) -> &str {
        self.header.name()
    }

    pub fn data(&self) -> &ChunkBuf {
        &self.data
    }

    /// whether this is the final chunk of its field
    pub fn is_last(&self) -> bool {
        self.last
    }

    pub fn into_parts(self) -> (PartHeader, ChunkBuf, bool) {
        (self.header, self.data, self.last)
    }
}
