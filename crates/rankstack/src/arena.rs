//! Shared, single-threaded arena handle.
//!
//! [`Arena<T>`] is a cheap-to-clone reference to one stack. Every
//! [`Block`] allocated from it keeps the stack alive, so the buffer is
//! co-owned by the arena value and all live blocks. The buffer itself is
//! released as soon as the last block goes away; the (empty) arena can be
//! grown again afterwards.
//!
//! The stack's accounting and its elements sit in separate cells. Element
//! guards borrow only the buffer, so counters, `is_topmost` and block
//! release keep working while a guard is held.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::mem;
use std::rc::Rc;

use crate::block::Block;
use crate::config::{ArenaConfig, LifoPolicy};
use crate::error::ArenaError;
use crate::frame::Frame;
use crate::growth::{Growth, GrowthPolicy};
use crate::stack::{Ledger, StackCore};
use crate::stats::ArenaStats;

/// Ledger and buffer of one arena, shared by the arena and its blocks.
pub(crate) struct Shared<T> {
    ledger: RefCell<Ledger>,
    buffer: RefCell<Vec<T>>,
}

pub(crate) type SharedCore<T> = Rc<Shared<T>>;

impl<T> Shared<T> {
    fn ledger_mut(&self) -> Result<RefMut<'_, Ledger>, ArenaError> {
        self.ledger.try_borrow_mut().map_err(|_| ArenaError::Borrowed)
    }

    pub(crate) fn ledger(&self) -> Result<Ref<'_, Ledger>, ArenaError> {
        self.ledger.try_borrow().map_err(|_| ArenaError::Borrowed)
    }

    pub(crate) fn buffer(&self) -> Result<Ref<'_, Vec<T>>, ArenaError> {
        self.buffer.try_borrow().map_err(|_| ArenaError::Borrowed)
    }

    pub(crate) fn buffer_mut(&self) -> Result<RefMut<'_, Vec<T>>, ArenaError> {
        self.buffer.try_borrow_mut().map_err(|_| ArenaError::Borrowed)
    }

    /// Release `frame`, rejecting out-of-order frames under the strict
    /// policy when `explicit`. Frees the buffer once the stack is empty.
    ///
    /// Only fails with [`ArenaError::Borrowed`] when called re-entrantly
    /// from an element's `Default` or `Drop`.
    pub(crate) fn release(&self, frame: &Frame, explicit: bool) -> Result<(), ArenaError> {
        let emptied = {
            let mut ledger = self.ledger_mut()?;
            if explicit {
                ledger.release(frame)?
            } else {
                ledger.abandon(frame)
            }
        };
        if emptied {
            self.release_buffer();
        }
        Ok(())
    }

    fn release_buffer(&self) {
        let (Ok(mut ledger), Ok(mut buffer)) =
            (self.ledger.try_borrow_mut(), self.buffer.try_borrow_mut())
        else {
            // Unreachable through blocks: guards only come from live ones.
            log::debug!("arena emptied while borrowed; keeping its buffer");
            return;
        };
        let old = mem::take(&mut *buffer);
        ledger.buffer_released();
        drop(buffer);
        drop(ledger);
        // Element destructors run with no borrow held.
        drop(old);
    }
}

/// A growable stack arena of `T`.
///
/// ```
/// use rankstack::{Arena, ArenaConfig, Growth};
///
/// let arena = Arena::<u32>::with_config(ArenaConfig {
///     growth: Growth::Elements(8),
///     ..ArenaConfig::default()
/// })?;
///
/// let mut stages = arena.alloc(3)?;
/// stages.fill(7)?;
/// assert_eq!(*stages.at(2)?, 7);
/// stages.release()?;
/// assert_eq!(arena.capacity(), 0);
/// # Ok::<(), rankstack::ArenaError>(())
/// ```
pub struct Arena<T> {
    core: SharedCore<T>,
}

impl<T: Default> Arena<T> {
    /// Create an arena with the default config.
    pub fn new() -> Self {
        Self::from_validated(ArenaConfig::default())
    }

    pub(crate) fn from_validated(config: ArenaConfig) -> Self {
        Self::from_core(StackCore::from_validated(config))
    }

    /// Create an arena with the given config.
    pub fn with_config(config: ArenaConfig) -> Result<Self, ArenaError> {
        StackCore::new(config).map(Self::from_core)
    }

    /// Create an arena with a custom growth policy.
    pub fn with_policy(
        config: ArenaConfig,
        policy: Box<dyn GrowthPolicy>,
    ) -> Result<Self, ArenaError> {
        StackCore::with_policy(config, policy).map(Self::from_core)
    }

    fn from_core(core: StackCore<T>) -> Self {
        let (ledger, buffer) = core.into_parts();
        Self {
            core: Rc::new(Shared {
                ledger: RefCell::new(ledger),
                buffer: RefCell::new(buffer),
            }),
        }
    }

    /// Allocate a block of `len` default-initialised elements.
    ///
    /// Slots reused from a released block keep their previous contents;
    /// call [`Block::fill`] or use [`alloc_filled`](Self::alloc_filled)
    /// when a known starting value matters.
    ///
    /// Fails with [`ArenaError::Borrowed`] while an element guard is held,
    /// since growing may move the buffer.
    pub fn alloc(&self, len: usize) -> Result<Block<T>, ArenaError> {
        let frame = {
            let mut buffer = self.core.buffer_mut()?;
            self.core.ledger_mut()?.claim(&mut buffer, len)?
        };
        Ok(Block::new(Rc::clone(&self.core), frame))
    }

    /// Allocate a block with every element set to `value`.
    pub fn alloc_filled(&self, len: usize, value: T) -> Result<Block<T>, ArenaError>
    where
        T: Clone,
    {
        let block = self.alloc(len)?;
        block.fill(value)?;
        Ok(block)
    }

    /// Make sure `additional` elements can be allocated without growing.
    pub fn reserve(&self, additional: usize) -> Result<(), ArenaError> {
        let mut buffer = self.core.buffer_mut()?;
        self.core
            .ledger_mut()?
            .ensure_capacity(&mut buffer, additional)
    }
}

impl<T> Arena<T> {
    fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        f(&*self.core.ledger.borrow())
    }

    /// Drop spare tail capacity without moving any claimed element.
    pub fn shrink_to_fit(&self) -> Result<(), ArenaError> {
        let mut buffer = self.core.buffer_mut()?;
        self.core.ledger_mut()?.shrink_to_fit(&mut buffer);
        Ok(())
    }

    /// Change the growth step for future growth.
    pub fn set_growth(&self, growth: Growth) -> Result<(), ArenaError> {
        self.core.ledger_mut()?.set_growth(growth)
    }

    /// Replace the growth policy for future growth.
    pub fn set_policy(&self, policy: Box<dyn GrowthPolicy>) -> Result<(), ArenaError> {
        self.core.ledger_mut()?.set_policy(policy);
        Ok(())
    }

    /// Elements claimed by live blocks.
    pub fn used(&self) -> usize {
        self.read(Ledger::used)
    }

    /// Elements the buffer holds.
    pub fn capacity(&self) -> usize {
        self.read(Ledger::capacity)
    }

    /// Claimed bytes.
    pub fn used_bytes(&self) -> usize {
        self.used() * Self::type_size()
    }

    /// Bytes held by the buffer.
    pub fn capacity_bytes(&self) -> usize {
        self.capacity() * Self::type_size()
    }

    /// `size_of::<T>()`.
    pub fn type_size() -> usize {
        std::mem::size_of::<T>()
    }

    /// Number of live blocks.
    pub fn live_blocks(&self) -> usize {
        self.read(Ledger::live_blocks)
    }

    /// `used / capacity` as a fraction or percentage, per config.
    /// `0.0` when the arena holds no buffer.
    pub fn usage(&self) -> f64 {
        self.read(Ledger::usage)
    }

    /// Out-of-order release policy.
    pub fn lifo_policy(&self) -> LifoPolicy {
        self.read(Ledger::lifo_policy)
    }

    /// Snapshot of the arena's counters.
    pub fn stats(&self) -> ArenaStats {
        self.read(Ledger::stats)
    }

    /// Whether two handles refer to the same arena.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }

    pub(crate) fn from_shared(core: SharedCore<T>) -> Self {
        Self { core }
    }
}

impl<T: Default> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Arena<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T> fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.core.ledger() {
            Ok(ledger) => f.debug_tuple("Arena").field(&ledger.stats()).finish(),
            Err(_) => f.write_str("Arena(<borrowed>)"),
        }
    }
}
