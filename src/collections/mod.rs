//! Ordered indices built over the crate's allocator abstraction
//! (spec.md §4.3–§4.4).

pub mod bplus_tree;
pub mod gc_assoc_list;
pub mod red_black_tree;
pub mod reduction;

pub use bplus_tree::BPlusTree;
pub use gc_assoc_list::GcAssocList;
pub use red_black_tree::RedBlackTree;
pub use reduction::{CountReduce, NullReduce, Reduce, SumReduce};
