//! Ranked, growable stack arenas with offset-addressed blocks.
//!
//! An [`Arena<T>`] owns one contiguous buffer of `T` that many
//! differently-sized [`Block`]s share. Blocks are handed out bump-style on
//! top of a stack, addressed by element offset rather than pointer, and
//! given away again (normally in LIFO order) when released or dropped.
//! When a block does not fit, the buffer grows once according to a
//! [`GrowthPolicy`]; it may move, but every offset already issued stays
//! valid. When the last block goes away the buffer is freed.
//!
//! # Architecture
//!
//! ```text
//! ArenaRegistry (optional, one arena per element type)
//! └── Arena<T>  (Rc to two cells, cloned into every block)
//!     ├── RefCell<Ledger>
//!     │   ├── frame stack (rank, offset, len, deferred?)
//!     │   ├── used / live / capacity counters
//!     │   └── Box<dyn GrowthPolicy>
//!     └── RefCell<Vec<T>> buffer (len == capacity)
//! StackCore<T> = Ledger + Vec<T> as one plain value
//! Block<T> = shared cells + Frame + Live/Released state
//! ```
//!
//! # Release order
//!
//! Blocks are meant to be released last-in, first-out. What happens
//! otherwise is chosen per arena by [`LifoPolicy`]: reject (default),
//! defer until the blocks above are gone, or subtract in place.
//!
//! # Threading
//!
//! `Arena` and `Block` are single-threaded. [`StackCore`] is a plain owned
//! value and can be put behind a `Mutex` when a stack must be shared.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod arena;
pub mod block;
pub mod config;
pub mod error;
pub mod frame;
pub mod growth;
pub mod registry;
pub mod stack;
pub mod stats;

// Public re-exports for the primary API surface.
pub use arena::Arena;
pub use block::{Block, BlockState};
pub use config::{ArenaConfig, LifoPolicy, UsageUnit};
pub use error::ArenaError;
pub use frame::{Frame, FrameId};
pub use growth::{Growth, GrowthPolicy};
pub use registry::ArenaRegistry;
pub use stack::StackCore;
pub use stats::ArenaStats;
