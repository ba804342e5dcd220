//! Test utilities and fixture types for rankstack development.
//!
//! Provides element types that mimic what the arena stores in practice
//! ([`Vertex`], [`StageInfo`]), a [`Tracked`] element that counts its
//! live instances, and helpers to write and verify deterministic patterns
//! in blocks.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use rankstack::{Arena, ArenaConfig, ArenaError, Block, Growth, LifoPolicy};

pub use fixtures::{LiveCounter, Stage, StageInfo, Tracked, Vertex};

/// Arena growing by `step` elements with the given release policy.
pub fn arena_with<T: Default>(step: usize, lifo: LifoPolicy) -> Arena<T> {
    Arena::with_config(ArenaConfig {
        growth: Growth::Elements(step),
        lifo,
        ..ArenaConfig::default()
    })
    .expect("step must be non-zero")
}

/// Strict arena growing by `step` elements.
pub fn small_step_arena<T: Default>(step: usize) -> Arena<T> {
    arena_with(step, LifoPolicy::Strict)
}

/// Deterministic value for position `i` of a pattern seeded by `seed`.
pub fn pattern_value(seed: u64, i: usize) -> u64 {
    // splitmix64 step
    let mut z = seed
        .wrapping_add(0x9E37_79B9_7F4A_7C15)
        .wrapping_mul(i as u64 + 1);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Fill `block` with the pattern for `seed`.
pub fn write_pattern(block: &Block<u64>, seed: u64) -> Result<(), ArenaError> {
    block.with_slice_mut(|s| {
        for (i, v) in s.iter_mut().enumerate() {
            *v = pattern_value(seed, i);
        }
    })
}

/// Whether `block` still holds the pattern for `seed`.
pub fn has_pattern(block: &Block<u64>, seed: u64) -> Result<bool, ArenaError> {
    block.with_slice(|s| {
        s.iter()
            .enumerate()
            .all(|(i, &v)| v == pattern_value(seed, i))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_is_deterministic_and_seed_dependent() {
        assert_eq!(pattern_value(1, 5), pattern_value(1, 5));
        assert_ne!(pattern_value(1, 5), pattern_value(2, 5));
        assert_ne!(pattern_value(1, 5), pattern_value(1, 6));
    }
}
