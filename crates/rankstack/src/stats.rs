//! Point-in-time arena introspection.
//!
//! [`ArenaStats`] is a plain snapshot of an arena's counters, cheap to copy
//! and safe to keep after the arena changes.

use std::fmt;

/// Counters describing one arena at the moment it was sampled.
///
/// Element counts are in units of `T`; the `*_bytes` helpers convert
/// using [`elem_size`](ArenaStats::elem_size).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Elements currently claimed (including deferred, not yet reclaimed
    /// ranges).
    pub used: usize,
    /// Elements the buffer can hold without growing.
    pub capacity: usize,
    /// Number of live blocks.
    pub live_blocks: usize,
    /// Blocks dropped out of order whose range is still reserved.
    pub deferred_blocks: usize,
    /// Highest `used` value seen since the arena was created.
    pub peak_used: usize,
    /// Number of growth events. Each performs at most one reallocation.
    pub reallocations: u64,
    /// Growth events that moved the buffer to a new base address.
    pub relocations: u64,
    /// `size_of::<T>()`.
    pub elem_size: usize,
}

impl ArenaStats {
    /// Claimed bytes.
    pub fn used_bytes(&self) -> usize {
        self.used * self.elem_size
    }

    /// Bytes held by the backing buffer.
    pub fn capacity_bytes(&self) -> usize {
        self.capacity * self.elem_size
    }

    /// Unclaimed elements available before the next growth.
    pub fn spare(&self) -> usize {
        self.capacity - self.used
    }
}

impl fmt::Display for ArenaStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} elements ({} B/elem), {} live, {} deferred, peak {}, {} reallocs ({} moved)",
            self.used,
            self.capacity,
            self.elem_size,
            self.live_blocks,
            self.deferred_blocks,
            self.peak_used,
            self.reallocations,
            self.relocations,
        )
    }
}
