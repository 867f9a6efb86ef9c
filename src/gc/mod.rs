//! Memory management: a pluggable allocator contract, the object model
//! built on top of it, a non-moving arena, and an incremental generational
//! collector (spec.md §§3–4).

pub mod allocator;
pub mod arena;
pub mod error;
pub mod generational;
pub mod object;
pub mod stats;
pub mod types;

pub use allocator::{CollectingAllocator, GcAddr, GcAllocator, TrivialDeallocation};
pub use arena::ArenaAllocator;
pub use error::{GcError, IndexError, ParseError};
pub use generational::{GcConfig, GenerationalGc};
pub use crate::object_vtable;
pub use object::{Forwarder, ManagedObject, ObjectHeader, ObjectVtable};
pub use stats::{GcStatistics, PerGenerationStatistics};
