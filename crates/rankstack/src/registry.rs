//! One arena per element type, created on first use.
//!
//! [`ArenaRegistry`] is the explicit replacement for a process-wide
//! per-type allocator: callers that want "one stack per `T`" hold a
//! registry and ask it for `Arena<T>`; two registries never share state.
//! Arenas are kept in creation order so reports are deterministic.

use std::any::{type_name, Any, TypeId};

use indexmap::IndexMap;

use crate::arena::Arena;
use crate::block::Block;
use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::stats::ArenaStats;

/// Type-erased view used for reporting.
trait ErasedArena {
    fn type_name(&self) -> &'static str;
    fn stats(&self) -> ArenaStats;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Default + 'static> ErasedArena for Arena<T> {
    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn stats(&self) -> ArenaStats {
        Arena::stats(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Lazily-populated map from element type to its [`Arena`].
pub struct ArenaRegistry {
    config: ArenaConfig,
    arenas: IndexMap<TypeId, Box<dyn ErasedArena>>,
}

impl ArenaRegistry {
    /// Create an empty registry whose arenas all use `config`.
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        Ok(Self {
            config,
            arenas: IndexMap::new(),
        })
    }

    /// The arena for `T`, creating it on first request.
    pub fn arena<T: Default + 'static>(&mut self) -> Arena<T> {
        let config = &self.config;
        self.arenas
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Arena::<T>::from_validated(config.clone())))
            .as_any()
            .downcast_ref::<Arena<T>>()
            .expect("registry entries are keyed by their element TypeId")
            .clone()
    }

    /// Allocate `len` elements from `T`'s arena.
    pub fn alloc<T: Default + 'static>(&mut self, len: usize) -> Result<Block<T>, ArenaError> {
        self.arena::<T>().alloc(len)
    }

    /// The arena for `T` if one has been created.
    pub fn get<T: Default + 'static>(&self) -> Option<Arena<T>> {
        self.arenas
            .get(&TypeId::of::<T>())
            .and_then(|a| a.as_any().downcast_ref::<Arena<T>>())
            .cloned()
    }

    /// Number of element types with an arena.
    pub fn len(&self) -> usize {
        self.arenas.len()
    }

    /// Whether no arena has been created yet.
    pub fn is_empty(&self) -> bool {
        self.arenas.is_empty()
    }

    /// `(type name, stats)` for every arena, in creation order.
    pub fn stats(&self) -> Vec<(&'static str, ArenaStats)> {
        self.arenas
            .values()
            .map(|a| (a.type_name(), a.stats()))
            .collect()
    }

    /// Total bytes held by all arenas' buffers.
    pub fn capacity_bytes(&self) -> usize {
        self.arenas.values().map(|a| a.stats().capacity_bytes()).sum()
    }
}

impl Default for ArenaRegistry {
    fn default() -> Self {
        Self {
            config: ArenaConfig::default(),
            arenas: IndexMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::growth::Growth;

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Vertex {
        pos: [f32; 3],
    }

    #[test]
    fn same_type_shares_one_arena() {
        let mut reg = ArenaRegistry::default();
        let a = reg.arena::<u32>();
        let b = reg.arena::<u32>();
        assert!(a.ptr_eq(&b));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn distinct_types_are_independent() {
        let mut reg = ArenaRegistry::new(ArenaConfig {
            growth: Growth::Elements(4),
            ..ArenaConfig::default()
        })
        .unwrap();
        let ints = reg.alloc::<u32>(3).unwrap();
        let verts = reg.alloc::<Vertex>(2).unwrap();
        assert_eq!(ints.offset(), 0);
        assert_eq!(verts.offset(), 0);
        assert_eq!(reg.get::<u32>().unwrap().used(), 3);
        assert_eq!(reg.get::<Vertex>().unwrap().used(), 2);
        assert!(reg.get::<u8>().is_none());
    }

    #[test]
    fn stats_in_creation_order() {
        let mut reg = ArenaRegistry::new(ArenaConfig {
            growth: Growth::Elements(4),
            ..ArenaConfig::default()
        })
        .unwrap();
        let _v = reg.alloc::<Vertex>(1).unwrap();
        let _i = reg.alloc::<u64>(1).unwrap();
        let stats = reg.stats();
        assert_eq!(stats.len(), 2);
        assert!(stats[0].0.ends_with("Vertex"));
        assert_eq!(stats[1].0, "u64");
        assert_eq!(stats[1].1.capacity, 4);
        assert_eq!(reg.capacity_bytes(), 4 * 12 + 4 * 8);
    }

    #[test]
    fn invalid_config_rejected() {
        assert!(ArenaRegistry::new(ArenaConfig {
            max_capacity: Some(0),
            ..ArenaConfig::default()
        })
        .is_err());
    }
}
