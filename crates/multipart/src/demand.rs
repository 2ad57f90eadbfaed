//! Translates part demand into chunk demand.
//!
//! The consumer asks for parts, the upstream delivers chunks, and one part may span an
//! unbounded number of chunks. [`DemandBridge`] keeps two counters:
//!
//! - `parts_owed`: parts the consumer asked for and has not received yet
//! - `upstream_outstanding`: chunks requested upstream and not delivered yet
//!
//! It keeps `upstream_outstanding <= parts_owed` at all times. Since a chunk completes at
//! most one part, the bridge can never receive more completed parts than it owes, and no
//! chunk is outstanding while nothing is owed. After every chunk it requests exactly one
//! more if that is needed to keep the consumer's outstanding demand moving.

use tracing::debug;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DemandBridge {
    parts_owed: u64,
    upstream_outstanding: u64,
}

impl DemandBridge {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn parts_owed(&self) -> u64 {
        self.parts_owed
    }

    #[inline]
    pub fn upstream_outstanding(&self) -> u64 {
        self.upstream_outstanding
    }

    /// Records consumer demand for `n` more parts.
    ///
    /// Returns the number of chunks to request upstream. Only demand that arrives while the
    /// bridge owes nothing is forwarded, seeded as one chunk per part; demand arriving while
    /// parts are still owed is picked up by [`after_chunk`](Self::after_chunk).
    /// `request(0)` is a no-op.
    pub fn on_demand(&mut self, n: u64) -> u64 {
        if n == 0 {
            return 0;
        }

        let previous = self.parts_owed;
        self.parts_owed = self.parts_owed.saturating_add(n);
        if previous > 0 {
            debug!(owed = self.parts_owed, "demand added while parts are still owed");
            return 0;
        }

        self.upstream_outstanding = self.upstream_outstanding.saturating_add(n);
        n
    }

    /// Records the arrival of one upstream chunk.
    ///
    /// Returns false when the chunk was never requested.
    #[must_use]
    pub fn on_chunk(&mut self) -> bool {
        if self.upstream_outstanding == 0 {
            return false;
        }
        self.upstream_outstanding -= 1;
        true
    }

    /// Records the emission of one completed part.
    ///
    /// Returns false when no part is owed.
    #[must_use]
    pub fn on_part(&mut self) -> bool {
        if self.parts_owed == 0 {
            return false;
        }
        self.parts_owed -= 1;
        true
    }

    /// Returns the number of chunks (0 or 1) to request after a chunk was processed.
    pub fn after_chunk(&mut self) -> u64 {
        if self.parts_owed > self.upstream_outstanding {
            self.upstream_outstanding += 1;
            1
        } else {
            0
        }
    }
}
