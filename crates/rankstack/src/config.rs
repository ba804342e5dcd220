//! Arena configuration parameters.

use crate::error::ArenaError;
use crate::growth::Growth;

/// How the arena treats a block released while other blocks sit above it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LifoPolicy {
    /// Explicit out-of-order release fails with
    /// [`ArenaError::NonLifoViolation`] and the block stays live.
    ///
    /// Dropping cannot fail, so an out-of-order drop is deferred: the
    /// block's range stays reserved until every block above it is gone.
    #[default]
    Strict,
    /// Out-of-order releases and drops are both deferred.
    Deferred,
    /// Release subtracts the block's length from `used` wherever it sits.
    ///
    /// Only sound under LIFO usage. Out of order, later claims can be
    /// handed ranges that overlap blocks that are still live.
    Permissive,
}

/// Unit used by [`Arena::usage`](crate::Arena::usage).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UsageUnit {
    /// `used / capacity` in `[0.0, 1.0]`.
    Fraction,
    /// `100 * used / capacity` in `[0.0, 100.0]`.
    #[default]
    Percent,
}

impl UsageUnit {
    /// Scale a `[0, 1]` ratio into this unit.
    pub fn scale(self, ratio: f64) -> f64 {
        match self {
            Self::Fraction => ratio,
            Self::Percent => ratio * 100.0,
        }
    }
}

/// Configuration for a single arena.
///
/// Validated at construction; the growth step can be changed afterwards
/// through [`Arena::set_growth`](crate::Arena::set_growth).
#[derive(Clone, Debug, PartialEq)]
pub struct ArenaConfig {
    /// How much the buffer grows when a claim does not fit.
    ///
    /// Default: [`Growth::Elements`] with 1024 elements per step.
    pub growth: Growth,

    /// Handling of out-of-order releases.
    ///
    /// Default: [`LifoPolicy::Strict`].
    pub lifo: LifoPolicy,

    /// Unit reported by `usage()`.
    ///
    /// Default: [`UsageUnit::Percent`].
    pub usage_unit: UsageUnit,

    /// Hard ceiling on capacity in elements. Growth past it fails with
    /// [`ArenaError::OutOfMemory`]; growth that would overshoot it is
    /// clamped to it.
    ///
    /// Default: `None` (bounded only by the system allocator).
    pub max_capacity: Option<usize>,
}

impl ArenaConfig {
    /// Default growth step, in elements.
    pub const DEFAULT_GROWTH: Growth = Growth::Elements(Growth::DEFAULT_ELEMENTS);

    /// Create a config with default values for every parameter.
    pub fn new() -> Self {
        Self {
            growth: Self::DEFAULT_GROWTH,
            lifo: LifoPolicy::default(),
            usage_unit: UsageUnit::default(),
            max_capacity: None,
        }
    }

    /// Check that every parameter is usable.
    pub fn validate(&self) -> Result<(), ArenaError> {
        self.growth.validate()?;
        if self.max_capacity == Some(0) {
            return Err(ArenaError::InvalidConfig {
                reason: "max_capacity must be at least one element",
            });
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new()
    }
}
