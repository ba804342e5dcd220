//! The arena's buffer and its stack accounting.
//!
//! [`StackCore`] owns one contiguous `Vec<T>` and bump-allocates
//! [`Frame`]s from it. It is a plain value with `&mut self` methods:
//! a caller that needs cross-thread access can wrap it in a `Mutex`.
//! Claim and release must then go through the same lock, since detecting
//! the last release is a read-modify-write of the live count.
//!
//! The accounting lives in a separate `Ledger` that never touches
//! elements except to grow the buffer. [`Arena`](crate::Arena) keeps the
//! ledger and the buffer in two cells, so releasing a block never
//! conflicts with an element borrow held elsewhere.
//!
//! Layout invariants:
//!
//! - `buffer.len()` is the ledger's capacity; every slot is initialised
//!   (new slots are filled with `T::default()`).
//! - `used <= capacity`.
//! - Under `Strict`/`Deferred`, the frame stack is ordered by offset and
//!   `used` is the end of the topmost frame.
//! - The buffer is dropped as soon as the live count returns to zero.
//! - A frame is only ever accepted by the stack that issued it.

use std::any::type_name;
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, trace, warn};
use smallvec::SmallVec;

use crate::config::{ArenaConfig, LifoPolicy, UsageUnit};
use crate::error::ArenaError;
use crate::frame::{Frame, FrameId, StackId};
use crate::growth::{Growth, GrowthPolicy};
use crate::stats::ArenaStats;

static NEXT_STACK: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug)]
struct Slot {
    frame: Frame,
    /// Dropped out of order; range stays reserved until it reaches the top.
    deferred: bool,
}

/// Everything a stack tracks except the elements themselves.
pub(crate) struct Ledger {
    stack: StackId,
    elem: &'static str,
    elem_size: usize,
    capacity: usize,
    used: usize,
    live: usize,
    slots: SmallVec<[Slot; 8]>,
    next_id: u64,
    policy: Box<dyn GrowthPolicy>,
    lifo: LifoPolicy,
    usage_unit: UsageUnit,
    max_capacity: Option<usize>,
    peak_used: usize,
    reallocations: u64,
    relocations: u64,
}

impl Ledger {
    fn for_type<T>(config: ArenaConfig, policy: Box<dyn GrowthPolicy>) -> Self {
        Self {
            stack: StackId(NEXT_STACK.fetch_add(1, Ordering::Relaxed)),
            elem: type_name::<T>(),
            elem_size: mem::size_of::<T>(),
            capacity: 0,
            used: 0,
            live: 0,
            slots: SmallVec::new(),
            next_id: 0,
            policy,
            lifo: config.lifo,
            usage_unit: config.usage_unit,
            max_capacity: config.max_capacity,
            peak_used: 0,
            reallocations: 0,
            relocations: 0,
        }
    }

    pub(crate) fn ensure_capacity<T: Default>(
        &mut self,
        buffer: &mut Vec<T>,
        additional: usize,
    ) -> Result<(), ArenaError> {
        debug_assert_eq!(buffer.len(), self.capacity);
        let capacity = self.capacity;
        let oom = ArenaError::OutOfMemory {
            requested: additional,
            capacity,
        };
        let required = match self.used.checked_add(additional) {
            Some(required) => required,
            None => return Err(oom),
        };
        if required <= capacity {
            return Ok(());
        }
        if self.max_capacity.is_some_and(|max| required > max) {
            return Err(oom);
        }

        let grown = self
            .policy
            .grow(capacity, required, self.elem_size)
            .filter(|&grown| grown >= required);
        let mut new_capacity = match grown {
            Some(grown) => grown,
            None => return Err(oom),
        };
        if let Some(max) = self.max_capacity {
            new_capacity = new_capacity.min(max);
        }

        let old_base = buffer.as_ptr();
        if buffer.try_reserve_exact(new_capacity - capacity).is_err() {
            return Err(oom);
        }
        buffer.resize_with(new_capacity, T::default);
        self.capacity = new_capacity;
        self.reallocations += 1;

        let moved = capacity > 0 && !ptr::eq(old_base, buffer.as_ptr());
        if moved {
            self.relocations += 1;
        }
        debug!(
            "arena<{}> grew {capacity} -> {new_capacity} elements{}",
            self.elem,
            if moved { " (relocated)" } else { "" }
        );
        Ok(())
    }

    pub(crate) fn claim<T: Default>(
        &mut self,
        buffer: &mut Vec<T>,
        len: usize,
    ) -> Result<Frame, ArenaError> {
        self.ensure_capacity(buffer, len)?;

        let offset = self.used;
        self.used += len;
        self.live += 1;
        self.next_id += 1;
        self.peak_used = self.peak_used.max(self.used);

        let frame = Frame {
            stack: self.stack,
            id: FrameId(self.next_id),
            rank: self.live,
            offset,
            len,
        };
        self.slots.push(Slot {
            frame,
            deferred: false,
        });
        trace!(
            "arena<{}> claimed {len} at offset {offset} (rank {})",
            self.elem,
            frame.rank
        );
        Ok(frame)
    }

    /// Explicit release. `Ok(true)` when the stack just became empty and
    /// the buffer should be freed.
    pub(crate) fn release(&mut self, frame: &Frame) -> Result<bool, ArenaError> {
        self.release_frame(frame, self.lifo == LifoPolicy::Strict)
    }

    /// Infallible release for `Drop`. Same return as `release`.
    pub(crate) fn abandon(&mut self, frame: &Frame) -> bool {
        self.release_frame(frame, false).unwrap_or_else(|err| {
            warn!("arena<{}> could not abandon {frame}: {err}", self.elem);
            false
        })
    }

    fn release_frame(
        &mut self,
        frame: &Frame,
        reject_out_of_order: bool,
    ) -> Result<bool, ArenaError> {
        if !self.owns(frame) {
            return Err(ArenaError::ForeignFrame { rank: frame.rank });
        }
        // Ids are pushed in increasing order and removals keep order.
        let pos = self
            .slots
            .binary_search_by_key(&frame.id, |s| s.frame.id)
            .ok()
            .filter(|&pos| !self.slots[pos].deferred)
            .ok_or(ArenaError::UseAfterRelease { rank: frame.rank })?;
        let on_top = pos + 1 == self.slots.len();

        match self.lifo {
            LifoPolicy::Permissive => {
                self.slots.remove(pos);
                self.used = self.used.saturating_sub(frame.len);
                if !on_top {
                    warn!(
                        "arena<{}> released {frame} out of order; used is now {} but offsets up to {} are live",
                        self.elem,
                        self.used,
                        self.high_water()
                    );
                }
            }
            _ if on_top => {
                self.slots.pop();
                while self.slots.last().is_some_and(|s| s.deferred) {
                    self.slots.pop();
                }
                self.used = self.slots.last().map_or(0, |s| s.frame.end());
            }
            _ if reject_out_of_order => {
                return Err(ArenaError::NonLifoViolation {
                    rank: frame.rank,
                    top_rank: self.top_rank(),
                });
            }
            _ => {
                self.slots[pos].deferred = true;
                debug!(
                    "arena<{}> deferred release of {frame} until rank {} is gone",
                    self.elem,
                    self.top_rank()
                );
            }
        }

        self.live -= 1;
        trace!("arena<{}> released {frame}", self.elem);
        if self.live > 0 {
            return Ok(false);
        }
        if self.used != 0 {
            warn!(
                "arena<{}> emptied with used = {}; resetting",
                self.elem, self.used
            );
        }
        self.used = 0;
        self.slots.clear();
        Ok(true)
    }

    /// Record that the buffer was handed back to the allocator.
    pub(crate) fn buffer_released(&mut self) {
        debug!(
            "arena<{}> released buffer of {} elements",
            self.elem, self.capacity
        );
        self.capacity = 0;
    }

    pub(crate) fn shrink_to_fit<T>(&mut self, buffer: &mut Vec<T>) {
        let keep = self.high_water();
        let capacity = self.capacity;
        if keep < capacity {
            buffer.truncate(keep);
            buffer.shrink_to_fit();
            self.capacity = keep;
            debug!("arena<{}> shrank {capacity} -> {keep} elements", self.elem);
        }
    }

    pub(crate) fn set_growth(&mut self, growth: Growth) -> Result<(), ArenaError> {
        growth.validate()?;
        self.policy = Box::new(growth);
        Ok(())
    }

    pub(crate) fn set_policy(&mut self, policy: Box<dyn GrowthPolicy>) {
        self.policy = policy;
    }

    pub(crate) fn owns(&self, frame: &Frame) -> bool {
        frame.stack == self.stack
    }

    pub(crate) fn is_topmost(&self, frame: &Frame) -> bool {
        self.owns(frame) && frame.rank == self.live
    }

    pub(crate) fn is_bottommost(&self, frame: &Frame) -> bool {
        self.owns(frame) && frame.rank == 1
    }

    pub(crate) fn top_rank(&self) -> usize {
        self.slots.last().map_or(0, |s| s.frame.rank)
    }

    pub(crate) fn used(&self) -> usize {
        self.used
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn live_blocks(&self) -> usize {
        self.live
    }

    pub(crate) fn usage(&self) -> f64 {
        match self.capacity {
            0 => 0.0,
            capacity => self.usage_unit.scale(self.used as f64 / capacity as f64),
        }
    }

    pub(crate) fn lifo_policy(&self) -> LifoPolicy {
        self.lifo
    }

    pub(crate) fn stats(&self) -> ArenaStats {
        ArenaStats {
            used: self.used,
            capacity: self.capacity,
            live_blocks: self.live,
            deferred_blocks: self.slots.iter().filter(|s| s.deferred).count(),
            peak_used: self.peak_used,
            reallocations: self.reallocations,
            relocations: self.relocations,
            elem_size: self.elem_size,
        }
    }

    /// End of the furthest claimed range, live or deferred.
    fn high_water(&self) -> usize {
        self.slots
            .iter()
            .map(|s| s.frame.end())
            .max()
            .unwrap_or(0)
            .max(self.used)
    }
}

/// Growable buffer with ranked, offset-addressed frames.
pub struct StackCore<T> {
    ledger: Ledger,
    buffer: Vec<T>,
}

impl<T: Default> StackCore<T> {
    /// Create an empty core. No memory is allocated until the first claim.
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    pub(crate) fn from_validated(config: ArenaConfig) -> Self {
        let growth = config.growth;
        Self::from_parts(config, Box::new(growth))
    }

    /// Create an empty core with a custom growth policy.
    ///
    /// `config.growth` is ignored in favour of `policy`.
    pub fn with_policy(
        config: ArenaConfig,
        policy: Box<dyn GrowthPolicy>,
    ) -> Result<Self, ArenaError> {
        config.validate()?;
        Ok(Self::from_parts(config, policy))
    }

    fn from_parts(config: ArenaConfig, policy: Box<dyn GrowthPolicy>) -> Self {
        Self {
            ledger: Ledger::for_type::<T>(config, policy),
            buffer: Vec::new(),
        }
    }

    /// Make sure `additional` more elements fit without growing.
    ///
    /// Grows the buffer at most once, to the capacity chosen by the growth
    /// policy. Existing elements keep their indices; the base address may
    /// change. On failure the core is left untouched.
    pub fn ensure_capacity(&mut self, additional: usize) -> Result<(), ArenaError> {
        self.ledger.ensure_capacity(&mut self.buffer, additional)
    }

    /// Claim `len` elements on top of the stack.
    ///
    /// The returned frame's offset is the previous `used`; its rank is the
    /// live-block count after this claim.
    pub fn claim(&mut self, len: usize) -> Result<Frame, ArenaError> {
        self.ledger.claim(&mut self.buffer, len)
    }
}

impl<T> StackCore<T> {
    pub(crate) fn into_parts(self) -> (Ledger, Vec<T>) {
        (self.ledger, self.buffer)
    }

    /// Release a frame explicitly.
    ///
    /// Under [`LifoPolicy::Strict`] a frame that is not on top is rejected
    /// with [`ArenaError::NonLifoViolation`] and stays live. A frame that
    /// was already released yields [`ArenaError::UseAfterRelease`]; one
    /// claimed from another core yields [`ArenaError::ForeignFrame`].
    pub fn release(&mut self, frame: &Frame) -> Result<(), ArenaError> {
        if self.ledger.release(frame)? {
            self.release_buffer();
        }
        Ok(())
    }

    /// Release a frame from a context that cannot fail, such as `Drop`.
    ///
    /// Out-of-order frames are deferred rather than rejected, except under
    /// [`LifoPolicy::Permissive`] where they are subtracted immediately.
    /// Stale and foreign frames are logged and ignored.
    pub fn abandon(&mut self, frame: &Frame) {
        if self.ledger.abandon(frame) {
            self.release_buffer();
        }
    }

    fn release_buffer(&mut self) {
        let old = mem::take(&mut self.buffer);
        self.ledger.buffer_released();
        drop(old);
    }

    /// Drop unclaimed tail capacity.
    ///
    /// Never cuts into a claimed range, so every frame's offset stays
    /// valid.
    pub fn shrink_to_fit(&mut self) {
        self.ledger.shrink_to_fit(&mut self.buffer);
    }

    /// Replace the growth step. Applies to future growth only.
    pub fn set_growth(&mut self, growth: Growth) -> Result<(), ArenaError> {
        self.ledger.set_growth(growth)
    }

    /// Replace the growth policy. Applies to future growth only.
    pub fn set_policy(&mut self, policy: Box<dyn GrowthPolicy>) {
        self.ledger.set_policy(policy);
    }

    /// The frame's elements, or `None` if the frame belongs to another
    /// core or its range is not backed.
    ///
    /// The frame must still be live; a stale frame may alias a newer claim.
    pub fn slice(&self, frame: &Frame) -> Option<&[T]> {
        if !self.ledger.owns(frame) {
            return None;
        }
        self.buffer.get(frame.range())
    }

    /// Mutable counterpart of [`slice`](Self::slice).
    pub fn slice_mut(&mut self, frame: &Frame) -> Option<&mut [T]> {
        if !self.ledger.owns(frame) {
            return None;
        }
        self.buffer.get_mut(frame.range())
    }

    /// Whether `frame` was the most recent claim among those still live.
    ///
    /// Compares ranks, so it is exact only while no block created after
    /// `frame` has been released.
    pub fn is_topmost(&self, frame: &Frame) -> bool {
        self.ledger.is_topmost(frame)
    }

    /// Whether `frame` was the first claim of its stack.
    pub fn is_bottommost(&self, frame: &Frame) -> bool {
        self.ledger.is_bottommost(frame)
    }

    /// Rank of the frame on top of the stack, or 0 when empty.
    pub fn top_rank(&self) -> usize {
        self.ledger.top_rank()
    }

    /// Elements currently claimed.
    pub fn used(&self) -> usize {
        self.ledger.used()
    }

    /// Elements the buffer holds.
    pub fn capacity(&self) -> usize {
        self.ledger.capacity()
    }

    /// Number of live frames.
    pub fn live_blocks(&self) -> usize {
        self.ledger.live_blocks()
    }

    /// `used / capacity` in the configured unit; `0.0` with no buffer.
    pub fn usage(&self) -> f64 {
        self.ledger.usage()
    }

    /// Out-of-order policy in effect.
    pub fn lifo_policy(&self) -> LifoPolicy {
        self.ledger.lifo_policy()
    }

    /// Snapshot of every counter.
    pub fn stats(&self) -> ArenaStats {
        self.ledger.stats()
    }
}
