//! Block handles.
//!
//! A [`Block`] is one caller's reservation inside an [`Arena`]: a
//! [`Frame`] (offset, length, rank) plus a shared reference to the arena.
//! All element access goes through `offset + index` on every call, never
//! through a cached pointer, so a block stays valid across any number of
//! buffer relocations.

use std::cell::{Ref, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::arena::{Arena, SharedCore};
use crate::error::ArenaError;
use crate::frame::Frame;

/// Lifecycle of a [`Block`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockState {
    /// Holding its range in the arena.
    Live,
    /// Released. Terminal; every access fails with
    /// [`ArenaError::UseAfterRelease`].
    Released,
}

/// A fixed-size, fixed-offset range of elements in an [`Arena`].
///
/// Released explicitly with [`release`](Block::release) or implicitly when
/// dropped. Dropping a block that is not on top of its stack defers its
/// release (see [`LifoPolicy`](crate::LifoPolicy)).
#[must_use]
pub struct Block<T> {
    core: SharedCore<T>,
    frame: Frame,
    state: BlockState,
}

impl<T> Block<T> {
    pub(crate) fn new(core: SharedCore<T>, frame: Frame) -> Self {
        Self {
            core,
            frame,
            state: BlockState::Live,
        }
    }

    /// Creation rank, 1-based.
    pub fn rank(&self) -> usize {
        self.frame.rank
    }

    /// First element index in the arena buffer.
    pub fn offset(&self) -> usize {
        self.frame.offset
    }

    /// Number of elements reserved.
    pub fn len(&self) -> usize {
        self.frame.len
    }

    /// Whether the block reserves no elements.
    pub fn is_empty(&self) -> bool {
        self.frame.len == 0
    }

    /// The block's frame descriptor.
    pub fn frame(&self) -> Frame {
        self.frame
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BlockState {
        self.state
    }

    /// Whether the block still holds its range.
    pub fn is_live(&self) -> bool {
        self.state == BlockState::Live
    }

    /// The arena this block was allocated from.
    pub fn arena(&self) -> Arena<T> {
        Arena::from_shared(Rc::clone(&self.core))
    }

    /// Whether this block was the most recently created live block.
    ///
    /// Decided by rank, so it is exact only while no later block has been
    /// released. `false` once released.
    pub fn is_topmost(&self) -> bool {
        self.is_live()
            && self
                .core
                .ledger()
                .is_ok_and(|ledger| ledger.is_topmost(&self.frame))
    }

    /// Whether this block was created first in its stack. `false` once
    /// released.
    pub fn is_bottommost(&self) -> bool {
        self.is_live() && self.frame.rank == 1
    }

    fn check_live(&self) -> Result<(), ArenaError> {
        match self.state {
            BlockState::Live => Ok(()),
            BlockState::Released => Err(ArenaError::UseAfterRelease {
                rank: self.frame.rank,
            }),
        }
    }

    fn check_index(&self, index: usize) -> Result<(), ArenaError> {
        self.check_live()?;
        if index >= self.frame.len {
            return Err(self.out_of_bounds(index));
        }
        Ok(())
    }

    fn out_of_bounds(&self, index: usize) -> ArenaError {
        ArenaError::IndexOutOfBounds {
            index,
            len: self.frame.len,
        }
    }

    /// Shared reference to element `index`.
    ///
    /// The returned guard borrows the whole arena buffer: allocating from
    /// the arena while it is held fails with [`ArenaError::Borrowed`].
    /// Releasing or dropping other blocks does not.
    pub fn at(&self, index: usize) -> Result<Ref<'_, T>, ArenaError> {
        self.check_index(index)?;
        let buffer = self.core.buffer()?;
        Ref::filter_map(buffer, |b| b.get(self.frame.offset + index))
            .map_err(|_| self.out_of_bounds(index))
    }

    /// Mutable reference to element `index`.
    pub fn at_mut(&self, index: usize) -> Result<RefMut<'_, T>, ArenaError> {
        self.check_index(index)?;
        let buffer = self.core.buffer_mut()?;
        RefMut::filter_map(buffer, |b| b.get_mut(self.frame.offset + index))
            .map_err(|_| self.out_of_bounds(index))
    }

    /// Overwrite element `index`.
    pub fn set(&self, index: usize, value: T) -> Result<(), ArenaError> {
        *self.at_mut(index)? = value;
        Ok(())
    }

    /// Run `f` over the block's elements.
    pub fn with_slice<R>(&self, f: impl FnOnce(&[T]) -> R) -> Result<R, ArenaError> {
        self.check_live()?;
        let buffer = self.core.buffer()?;
        let slice = buffer
            .get(self.frame.range())
            .ok_or_else(|| self.out_of_bounds(0))?;
        Ok(f(slice))
    }

    /// Run `f` over the block's elements mutably.
    pub fn with_slice_mut<R>(&self, f: impl FnOnce(&mut [T]) -> R) -> Result<R, ArenaError> {
        self.check_live()?;
        let mut buffer = self.core.buffer_mut()?;
        let slice = buffer
            .get_mut(self.frame.range())
            .ok_or_else(|| self.out_of_bounds(0))?;
        Ok(f(slice))
    }

    /// Release the block's range back to the arena.
    ///
    /// Fails with [`ArenaError::NonLifoViolation`] under the strict policy
    /// if a later block is still live; the block then stays live and can be
    /// released again once the blocks above it are gone. A second release
    /// fails with [`ArenaError::UseAfterRelease`].
    pub fn release(&mut self) -> Result<(), ArenaError> {
        self.check_live()?;
        self.core.release(&self.frame, true)?;
        self.state = BlockState::Released;
        Ok(())
    }
}

impl<T: Clone> Block<T> {
    /// Clone element `index` out of the arena.
    pub fn get(&self, index: usize) -> Result<T, ArenaError> {
        self.at(index).map(|v| (*v).clone())
    }

    /// Assign `value` to every element of the block.
    pub fn fill(&self, value: T) -> Result<(), ArenaError> {
        self.with_slice_mut(|s| s.fill(value))
    }

    /// Copy the block's elements into a new `Vec`.
    pub fn to_vec(&self) -> Result<Vec<T>, ArenaError> {
        self.with_slice(<[T]>::to_vec)
    }
}

impl<T> Drop for Block<T> {
    fn drop(&mut self) {
        if self.state == BlockState::Released {
            return;
        }
        if let Err(err) = self.core.release(&self.frame, false) {
            log::error!("{} dropped during an arena call: {err}", self.frame);
        }
        self.state = BlockState::Released;
    }
}

impl<T> fmt::Debug for Block<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("rank", &self.frame.rank)
            .field("offset", &self.frame.offset)
            .field("len", &self.frame.len)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ArenaConfig, LifoPolicy};
    use crate::growth::Growth;

    fn arena_with(step: usize, lifo: LifoPolicy) -> Arena<u32> {
        Arena::with_config(ArenaConfig {
            growth: Growth::Elements(step),
            lifo,
            ..ArenaConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn index_within_block_only() {
        let arena = arena_with(8, LifoPolicy::Strict);
        let _a = arena.alloc(2).unwrap();
        let b = arena.alloc(3).unwrap();
        b.set(2, 11).unwrap();
        assert_eq!(b.get(2).unwrap(), 11);
        assert_eq!(
            b.get(3),
            Err(ArenaError::IndexOutOfBounds { index: 3, len: 3 })
        );
    }

    #[test]
    fn blocks_do_not_alias() {
        let arena = arena_with(8, LifoPolicy::Strict);
        let a = arena.alloc(2).unwrap();
        let b = arena.alloc(2).unwrap();
        a.fill(1).unwrap();
        b.fill(2).unwrap();
        assert_eq!(a.to_vec().unwrap(), vec![1, 1]);
        assert_eq!(b.to_vec().unwrap(), vec![2, 2]);
    }

    #[test]
    fn release_then_use_fails() {
        let arena = arena_with(4, LifoPolicy::Strict);
        let mut a = arena.alloc(2).unwrap();
        a.release().unwrap();
        assert_eq!(a.state(), BlockState::Released);
        assert_eq!(a.get(0), Err(ArenaError::UseAfterRelease { rank: 1 }));
        assert_eq!(a.fill(3), Err(ArenaError::UseAfterRelease { rank: 1 }));
        assert_eq!(a.release(), Err(ArenaError::UseAfterRelease { rank: 1 }));
        assert!(!a.is_topmost());
        assert!(!a.is_bottommost());
    }

    #[test]
    fn strict_release_out_of_order_keeps_block_live() {
        let arena = arena_with(4, LifoPolicy::Strict);
        let mut a = arena.alloc(1).unwrap();
        let mut b = arena.alloc(1).unwrap();
        assert_eq!(
            a.release(),
            Err(ArenaError::NonLifoViolation {
                rank: 1,
                top_rank: 2
            })
        );
        assert!(a.is_live());
        b.release().unwrap();
        a.release().unwrap();
        assert_eq!(arena.capacity(), 0);
    }

    #[test]
    fn topmost_follows_rank() {
        let arena = arena_with(4, LifoPolicy::Strict);
        let a = arena.alloc(1).unwrap();
        assert!(a.is_topmost() && a.is_bottommost());
        let b = arena.alloc(1).unwrap();
        assert!(!a.is_topmost());
        assert!(b.is_topmost());
        drop(b);
        assert!(a.is_topmost());
    }

    #[test]
    fn at_is_stable_across_reads() {
        let arena = arena_with(4, LifoPolicy::Strict);
        let a = arena.alloc(4).unwrap();
        let first = &*a.at(1).unwrap() as *const u32;
        let second = &*a.at(1).unwrap() as *const u32;
        assert_eq!(first, second);
        assert_eq!(arena.stats().reallocations, 1);
    }

    #[test]
    fn mutable_borrow_blocks_reads() {
        let arena = arena_with(4, LifoPolicy::Strict);
        let a = arena.alloc(2).unwrap();
        let mut guard = a.at_mut(0).unwrap();
        *guard = 5;
        assert_eq!(a.get(1), Err(ArenaError::Borrowed));
        drop(guard);
        assert_eq!(a.get(0).unwrap(), 5);
    }

    #[test]
    fn drop_under_element_borrow_still_releases() {
        let arena = arena_with(8, LifoPolicy::Strict);
        let mut a = arena.alloc(2).unwrap();
        let b = arena.alloc(2).unwrap();
        {
            let guard = a.at(0).unwrap();
            drop(b);
            assert_eq!(*guard, 0);
            assert_eq!(arena.live_blocks(), 1);
            assert_eq!(arena.used(), 2);
            assert!(a.is_topmost());
        }
        a.release().unwrap();
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.capacity(), 0);
    }

    #[test]
    fn release_inside_mutable_slice_closure() {
        let arena = arena_with(8, LifoPolicy::Strict);
        let a = arena.alloc(2).unwrap();
        let mut b = arena.alloc(1).unwrap();
        a.with_slice_mut(|s| {
            s.fill(4);
            b.release().unwrap();
        })
        .unwrap();
        assert_eq!(a.to_vec().unwrap(), vec![4, 4]);
        assert_eq!(arena.live_blocks(), 1);
    }

    #[test]
    fn topmost_while_mutably_borrowed() {
        let arena = arena_with(4, LifoPolicy::Strict);
        let a = arena.alloc(1).unwrap();
        let _guard = a.at_mut(0).unwrap();
        assert!(a.is_topmost());
    }

    #[test]
    fn empty_block_has_no_elements() {
        let arena = arena_with(4, LifoPolicy::Strict);
        let a = arena.alloc(0).unwrap();
        assert!(a.is_empty());
        assert_eq!(a.to_vec().unwrap(), Vec::<u32>::new());
        assert!(matches!(a.at(0), Err(ArenaError::IndexOutOfBounds { .. })));
    }

    #[test]
    fn block_reports_its_arena() {
        let arena = arena_with(4, LifoPolicy::Strict);
        let a = arena.alloc(1).unwrap();
        assert!(a.arena().ptr_eq(&arena));
        assert_eq!(
            format!("{a:?}"),
            "Block { rank: 1, offset: 0, len: 1, state: Live }"
        );
    }
}
