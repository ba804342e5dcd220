//! Arena-specific error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur during arena and block operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The backing buffer could not grow to satisfy a request.
    ///
    /// Raised when the system allocator refuses the reallocation, when the
    /// new capacity is not representable, or when the configured
    /// `max_capacity` ceiling would be exceeded. The arena is unchanged.
    OutOfMemory {
        /// Number of elements requested.
        requested: usize,
        /// Capacity of the arena (in elements) when the request failed.
        capacity: usize,
    },
    /// Element access outside `[0, len)` of a block.
    IndexOutOfBounds {
        /// The index that was requested.
        index: usize,
        /// Length of the block.
        len: usize,
    },
    /// A block was accessed or released after it had already been released.
    UseAfterRelease {
        /// Rank of the released block.
        rank: usize,
    },
    /// A block that is not on top of the stack was explicitly released
    /// under [`LifoPolicy::Strict`](crate::config::LifoPolicy::Strict).
    ///
    /// The block stays live; release the blocks above it first.
    NonLifoViolation {
        /// Rank of the block whose release was rejected.
        rank: usize,
        /// Rank of the block currently on top of the stack.
        top_rank: usize,
    },
    /// A frame was handed to a stack other than the one that claimed it.
    ForeignFrame {
        /// Rank of the frame in its own stack.
        rank: usize,
    },
    /// The arena's buffer is already borrowed in a conflicting way, e.g. a
    /// block was allocated while an element reference was still held.
    Borrowed,
    /// Configuration rejected by [`ArenaConfig::validate`](crate::ArenaConfig::validate).
    InvalidConfig {
        /// Description of which constraint was violated.
        reason: &'static str,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "out of memory: requested {requested} elements, capacity {capacity} elements"
                )
            }
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for block of length {len}")
            }
            Self::UseAfterRelease { rank } => {
                write!(f, "block rank {rank} used after release")
            }
            Self::NonLifoViolation { rank, top_rank } => {
                write!(
                    f,
                    "block rank {rank} released out of order (top of stack is rank {top_rank})"
                )
            }
            Self::ForeignFrame { rank } => {
                write!(f, "frame rank {rank} belongs to a different arena")
            }
            Self::Borrowed => write!(f, "arena buffer is already borrowed"),
            Self::InvalidConfig { reason } => {
                write!(f, "invalid arena config: {reason}")
            }
        }
    }
}

impl Error for ArenaError {}
