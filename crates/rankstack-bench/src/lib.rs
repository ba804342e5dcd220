//! Workload profiles for benchmarking rankstack arenas.
//!
//! - [`frame_sizes`]: deterministic per-frame list sizes, mimicking the
//!   variable-length command and stage lists a renderer builds per frame.
//! - [`run_nested_frames`]: push a stack of blocks, touch every element,
//!   and unwind in LIFO order.
//! - [`growth_profiles`]: the growth policies compared by the benches.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rankstack::{Arena, ArenaConfig, ArenaError, Growth};

/// Deterministic block sizes in `1..=max`, seeded by `seed`.
pub fn frame_sizes(count: usize, max: usize, seed: u64) -> Vec<usize> {
    let mut state = seed | 1;
    (0..count)
        .map(|_| {
            // xorshift64
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % max as u64) as usize + 1
        })
        .collect()
}

/// Allocate one block per size, write every element, then release all
/// blocks top-down. Returns the sum of written values.
pub fn run_nested_frames(arena: &Arena<u64>, sizes: &[usize]) -> Result<u64, ArenaError> {
    let mut blocks = Vec::with_capacity(sizes.len());
    for (i, &n) in sizes.iter().enumerate() {
        let block = arena.alloc(n)?;
        block.fill(i as u64)?;
        blocks.push(block);
    }

    let mut sum = 0u64;
    while let Some(mut block) = blocks.pop() {
        sum += block.with_slice(|s| s.iter().sum::<u64>())?;
        block.release()?;
    }
    Ok(sum)
}

/// Named growth policies compared in the benches.
pub fn growth_profiles() -> Vec<(&'static str, Growth)> {
    vec![
        ("elements_64", Growth::Elements(64)),
        ("elements_1024", Growth::Elements(Growth::DEFAULT_ELEMENTS)),
        ("bytes_64k", Growth::Bytes(64 * 1024)),
        ("chunk_16m", Growth::Chunk(16 * 1024 * 1024)),
    ]
}

/// Arena of `u64` using `growth`.
pub fn profile_arena(growth: Growth) -> Result<Arena<u64>, ArenaError> {
    Arena::with_config(ArenaConfig {
        growth,
        ..ArenaConfig::default()
    })
}
