//! Growth policies for the arena's backing buffer.
//!
//! The arena never decides on its own how much to grow. When a claim does
//! not fit in the spare capacity it asks a [`GrowthPolicy`] for the new
//! capacity and performs exactly one reallocation to that size.
//!
//! Three built-in policies are provided through [`Growth`]:
//!
//! - [`Growth::Elements`]: add a fixed number of elements per step.
//! - [`Growth::Bytes`]: same, with the step given in bytes and translated
//!   through `size_of::<T>()`.
//! - [`Growth::Chunk`]: round the whole capacity up to a multiple of one
//!   large fixed-size chunk, trading headroom for fewer reallocations.

use std::fmt;

use crate::error::ArenaError;

/// Computes the capacity an arena should grow to.
///
/// Implementations must return a capacity `>= required`, or `None` if no
/// such capacity is representable. Returning less than `required` is
/// treated by the arena as an allocation failure.
///
/// Policies are `Send + Sync` so a [`StackCore`](crate::StackCore) can be
/// moved behind a lock.
pub trait GrowthPolicy: fmt::Debug + Send + Sync {
    /// New capacity (in elements) for an arena currently holding
    /// `capacity` elements that needs room for at least `required`.
    ///
    /// `elem_size` is `size_of::<T>()` and may be zero.
    fn grow(&self, capacity: usize, required: usize, elem_size: usize) -> Option<usize>;
}

/// Built-in growth policies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Growth {
    /// Grow by this many elements, repeatedly, until the request fits.
    Elements(usize),
    /// Grow by this many bytes' worth of elements per step. The step is
    /// `bytes / size_of::<T>()`, never less than one element.
    Bytes(usize),
    /// Grow the total capacity to the next multiple of a chunk of this
    /// many bytes.
    Chunk(usize),
}

impl Growth {
    /// Default element increment.
    pub const DEFAULT_ELEMENTS: usize = 1024;

    /// Default chunk size for [`Growth::Chunk`]: 1 GiB.
    pub const DEFAULT_CHUNK_BYTES: usize = 1 << 30;

    /// The growth step expressed in elements of size `elem_size`.
    pub fn step_elements(&self, elem_size: usize) -> usize {
        match *self {
            Self::Elements(n) => n,
            Self::Bytes(bytes) | Self::Chunk(bytes) => (bytes / elem_size.max(1)).max(1),
        }
    }

    /// Reject zero-sized steps.
    pub fn validate(&self) -> Result<(), ArenaError> {
        match *self {
            Self::Elements(0) => Err(ArenaError::InvalidConfig {
                reason: "growth increment must be at least one element",
            }),
            Self::Bytes(0) => Err(ArenaError::InvalidConfig {
                reason: "growth increment must be at least one byte",
            }),
            Self::Chunk(0) => Err(ArenaError::InvalidConfig {
                reason: "chunk size must be at least one byte",
            }),
            _ => Ok(()),
        }
    }
}

impl Default for Growth {
    fn default() -> Self {
        Self::Elements(Self::DEFAULT_ELEMENTS)
    }
}

impl GrowthPolicy for Growth {
    fn grow(&self, capacity: usize, required: usize, elem_size: usize) -> Option<usize> {
        if required <= capacity {
            return Some(capacity);
        }
        let step = self.step_elements(elem_size);
        match self {
            Self::Elements(_) | Self::Bytes(_) => {
                let steps = (required - capacity).div_ceil(step);
                capacity.checked_add(steps.checked_mul(step)?)
            }
            Self::Chunk(_) => required.div_ceil(step).checked_mul(step),
        }
    }
}

impl fmt::Display for Growth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elements(n) => write!(f, "+{n} elements"),
            Self::Bytes(n) => write!(f, "+{n} bytes"),
            Self::Chunk(n) => write!(f, "{n}-byte chunks"),
        }
    }
}
