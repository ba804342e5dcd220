//! Frame descriptors.
//!
//! A [`Frame`] records where a claimed block lives inside the arena: an
//! element offset and a length, plus its creation rank. Frames hold no
//! pointer, so they stay valid when the backing buffer relocates.

use std::fmt;
use std::ops::Range;

/// Identity of the stack that issued a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct StackId(pub(crate) u64);

/// Unique identity of a claim within one arena.
///
/// Ranks are reused once blocks are released; ids never are.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub(crate) u64);

/// Location of a claimed range within the arena's buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub struct Frame {
    pub(crate) stack: StackId,
    pub(crate) id: FrameId,
    pub(crate) rank: usize,
    pub(crate) offset: usize,
    pub(crate) len: usize,
}

impl Frame {
    /// Unique id of this claim.
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// Live-block count immediately after this frame was claimed (1-based).
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// First element index in the arena buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this frame holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the last element index.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Element index range in the arena buffer.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame(rank={}, off={}, len={})",
            self.rank, self.offset, self.len
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_accessors() {
        let f = Frame {
            stack: StackId(1),
            id: FrameId(7),
            rank: 2,
            offset: 16,
            len: 4,
        };
        assert_eq!(f.id(), FrameId(7));
        assert_eq!(f.rank(), 2);
        assert_eq!(f.end(), 20);
        assert_eq!(f.range(), 16..20);
        assert!(!f.is_empty());
        assert_eq!(f.to_string(), "Frame(rank=2, off=16, len=4)");
    }

    #[test]
    fn empty_frame() {
        let f = Frame {
            stack: StackId(1),
            id: FrameId(1),
            rank: 1,
            offset: 3,
            len: 0,
        };
        assert!(f.is_empty());
        assert_eq!(f.range(), 3..3);
    }
}
