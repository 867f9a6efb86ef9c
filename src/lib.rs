//! # `ordinal-gc` — pluggable allocation and allocator-aware ordered indices
//!
//! A memory-management toolkit built around one narrow contract,
//! [`gc::GcAllocator`], satisfied by both a non-moving bump arena
//! ([`gc::ArenaAllocator`]) and an incremental, generational, evacuating
//! collector ([`gc::GenerationalGc`]). Ordered containers —
//! [`collections::BPlusTree`] and [`collections::RedBlackTree`] — are
//! written once against values that can live in either kind of storage.
//!
//! ## Architecture
//!
//! - **`gc`** — the allocator trait, the object model ([`gc::ObjectHeader`],
//!   [`gc::ManagedObject`]) every managed type satisfies, the arena, and
//!   the generational collector.
//! - **`collections`** — the B+-tree and red/black tree, the
//!   [`collections::Reduce`] trait for associative reductions maintained
//!   incrementally over a red/black tree's in-order sequence, and
//!   [`collections::GcAssocList`], a small association list built
//!   directly over [`gc::GcAllocator`] to exercise the allocator's
//!   traits adaptor end to end.
//! - **`tokenizer`** — a small illustrative character-stream tokenizer,
//!   built to exercise the collections above (keyword lookup via a
//!   [`collections::BPlusTree`]).
//!
//! ## Example
//!
//! ```rust
//! use ordinal_gc::gc::{GcConfig, GenerationalGc};
//! use ordinal_gc::gc::types::GcString;
//!
//! let mut gc = GenerationalGc::new("example", GcConfig::default());
//! let mut root = GcString::new(&mut gc, "hello").unwrap();
//! unsafe { gc.add_root(&mut root as *mut usize); }
//! gc.request_minor_gc().unwrap();
//! assert_eq!(unsafe { GcString::as_str(root) }, "hello");
//! ```

#![warn(missing_docs, clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod collections;
pub mod gc;
pub mod tokenizer;

pub use gc::{GcAddr, GcAllocator, GcConfig, GenerationalGc};
