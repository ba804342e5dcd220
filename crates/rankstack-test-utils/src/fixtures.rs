//! Element types for arena tests and benches.
//!
//! - [`Vertex`]: a fixed-layout, `Copy` element like a vertex buffer entry.
//! - [`StageInfo`]: a shader-stage descriptor, the kind of list the arena
//!   backs in a renderer.
//! - [`Tracked`]: counts live instances through a shared [`LiveCounter`],
//!   to check that releasing the arena drops what it stored.

use std::cell::Cell;
use std::rc::Rc;

/// Interleaved position/uv vertex.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(pos: [f32; 3], uv: [f32; 2]) -> Self {
        Self { pos, uv }
    }
}

/// Pipeline stage a [`StageInfo`] describes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Vertex,
    Fragment,
    Compute,
}

/// Minimal shader-stage create info.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StageInfo {
    pub stage: Stage,
    pub entry_point: String,
    pub module: u64,
}

impl StageInfo {
    pub fn new(stage: Stage, entry_point: impl Into<String>, module: u64) -> Self {
        Self {
            stage,
            entry_point: entry_point.into(),
            module,
        }
    }
}

/// Shared count of live [`Tracked`] values.
#[derive(Clone, Debug, Default)]
pub struct LiveCounter(Rc<Cell<isize>>);

impl LiveCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked values currently alive.
    pub fn live(&self) -> isize {
        self.0.get()
    }

    /// Create a tracked value attached to this counter.
    pub fn track(&self, value: u32) -> Tracked {
        self.0.set(self.0.get() + 1);
        Tracked {
            value,
            counter: Some(self.clone()),
        }
    }
}

/// Element that reports its lifetime to a [`LiveCounter`].
///
/// `Default` yields an untracked value, which is what the arena uses to
/// initialise fresh slots.
#[derive(Debug, Default)]
pub struct Tracked {
    pub value: u32,
    counter: Option<LiveCounter>,
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        match &self.counter {
            Some(counter) => counter.track(self.value),
            None => Self {
                value: self.value,
                counter: None,
            },
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        if let Some(counter) = &self.counter {
            counter.0.set(counter.0.get() - 1);
        }
    }
}
