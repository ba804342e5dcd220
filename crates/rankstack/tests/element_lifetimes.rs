//! Integration test: element values and their destructors.
//!
//! The arena default-initialises fresh slots, keeps values alive while any
//! block is live (even across relocation), and drops everything it stored
//! once the last block is released.

use rankstack::{ArenaRegistry, LifoPolicy};
use rankstack_test_utils::{
    arena_with, small_step_arena, LiveCounter, Stage, StageInfo, Tracked, Vertex,
};

#[test]
fn fresh_slots_are_default() {
    let arena = small_step_arena::<Vertex>(4);
    let a = arena.alloc(3).unwrap();
    assert_eq!(a.to_vec().unwrap(), vec![Vertex::default(); 3]);
}

#[test]
fn stored_values_dropped_with_buffer() {
    let counter = LiveCounter::new();
    let arena = small_step_arena::<Tracked>(2);
    let a = arena.alloc(3).unwrap();
    for i in 0..3 {
        a.set(i, counter.track(i as u32)).unwrap();
    }
    assert_eq!(counter.live(), 3);

    // Relocation moves values without dropping or duplicating them.
    let b = arena.alloc(64).unwrap();
    assert_eq!(counter.live(), 3);
    assert_eq!(a.at(2).unwrap().value, 2);

    drop(b);
    assert_eq!(counter.live(), 3);
    drop(a);
    assert_eq!(counter.live(), 0);
}

#[test]
fn fill_clones_into_every_slot() {
    let counter = LiveCounter::new();
    let arena = small_step_arena::<Tracked>(8);
    let a = arena.alloc(5).unwrap();
    a.fill(counter.track(9)).unwrap();
    assert_eq!(counter.live(), 5);
    assert!(a.with_slice(|s| s.iter().all(|t| t.value == 9)).unwrap());
    drop(a);
    assert_eq!(counter.live(), 0);
}

#[test]
fn overwritten_values_are_dropped() {
    let counter = LiveCounter::new();
    let arena = small_step_arena::<Tracked>(4);
    let a = arena.alloc(1).unwrap();
    a.set(0, counter.track(1)).unwrap();
    a.set(0, counter.track(2)).unwrap();
    assert_eq!(counter.live(), 1);
    assert_eq!(a.get(0).unwrap().value, 2);
    assert_eq!(counter.live(), 1);
}

#[test]
fn deferred_block_values_live_until_reclaimed() {
    let counter = LiveCounter::new();
    let arena = arena_with::<Tracked>(8, LifoPolicy::Strict);
    let a = arena.alloc(2).unwrap();
    a.fill(counter.track(1)).unwrap();
    let b = arena.alloc(1).unwrap();

    drop(a);
    // Slots are reclaimed logically, but the buffer only goes with the last block.
    assert_eq!(counter.live(), 2);
    drop(b);
    assert_eq!(counter.live(), 0);
}

#[test]
fn shader_stage_list_per_type_registry() {
    let mut registry = ArenaRegistry::default();
    let stages = registry.alloc::<StageInfo>(2).unwrap();
    stages
        .set(0, StageInfo::new(Stage::Vertex, "main", 1))
        .unwrap();
    stages
        .set(1, StageInfo::new(Stage::Fragment, "main", 2))
        .unwrap();

    let verts = registry.alloc::<Vertex>(3).unwrap();
    verts
        .fill(Vertex::new([0.0, 1.0, 0.0], [0.5, 0.5]))
        .unwrap();

    assert_eq!(stages.get(1).unwrap().stage, Stage::Fragment);
    assert_eq!(registry.len(), 2);
    let stats = registry.stats();
    assert_eq!(stats[0].1.used, 2);
    assert_eq!(stats[1].1.used, 3);

    drop(stages);
    drop(verts);
    assert_eq!(registry.capacity_bytes(), 0);
}
