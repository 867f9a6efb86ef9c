//! A key-ordered singly-linked list of GC-managed nodes.
//!
//! Generalizes `GcPair`'s cons-cell shape (`gc::types`) from an opaque
//! two-field cell to a three-field, key-ordered node, and gives the
//! allocator's traits adaptor an actual container to flow through:
//! every `next` pointer here is written through
//! [`GcAllocator::assign_member`], never as a bare field store, and
//! [`GcAssocList::insert_if_idle`]/[`GcAssocList::clear_with`] are
//! bounded on [`CollectingAllocator`]/[`TrivialDeallocation`]
//! respectively so both halves of that adaptor see real use beyond
//! their own unit tests.
//!
//! Node fields are read and written through [`GcAllocator::bytes`]/
//! [`GcAllocator::bytes_mut`] rather than by casting a `GcAddr` straight
//! to a pointer: `GenerationalGc` hands out real pointer values, but
//! `ArenaAllocator` hands out offsets into its own backing buffer, and
//! this list is meant to sit over either one.
//!
//! `BPlusTree` and `RedBlackTree` stay allocator-agnostic (`Vec`-backed,
//! per `DESIGN.md`) because their node counts and access patterns don't
//! suit a bump/collecting allocator; this list is the crate's
//! demonstration that a container *can* be built directly over
//! [`GcAllocator`] when it wants to.

use crate::gc::allocator::{CollectingAllocator, GcAddr, GcAllocator, TrivialDeallocation};
use crate::gc::error::GcError;
use crate::gc::object::{Forwarder, ManagedObject, ObjectHeader};
use std::cmp::Ordering;

const NODE_SIZE: usize = core::mem::size_of::<GcListNode>();

/// A single `key -> value` link. `value` is itself a [`GcAddr`] (the
/// payload is some other managed object), so both `value` and `next`
/// are child pointers the collector must forward.
#[repr(C)]
pub struct GcListNode {
    header: ObjectHeader,
    key: i64,
    value: GcAddr,
    next: GcAddr,
}

crate::object_vtable!(GcListNode);

impl GcListNode {
    fn alloc_node(
        alloc: &mut dyn GcAllocator,
        key: i64,
        value: GcAddr,
        next: GcAddr,
    ) -> Result<GcAddr, GcError> {
        let addr = alloc.alloc(NODE_SIZE)?;
        let node = GcListNode {
            header: <Self as ManagedObject>::header(),
            key,
            value,
            next,
        };
        unsafe {
            let dest = alloc.bytes_mut(addr, NODE_SIZE).as_mut_ptr() as *mut GcListNode;
            dest.write(node);
        }
        Ok(addr)
    }

    fn key(alloc: &dyn GcAllocator, addr: GcAddr) -> i64 {
        unsafe { (*(alloc.bytes(addr, NODE_SIZE).as_ptr() as *const GcListNode)).key }
    }

    fn value(alloc: &dyn GcAllocator, addr: GcAddr) -> GcAddr {
        unsafe { (*(alloc.bytes(addr, NODE_SIZE).as_ptr() as *const GcListNode)).value }
    }

    fn next(alloc: &dyn GcAllocator, addr: GcAddr) -> GcAddr {
        unsafe { (*(alloc.bytes(addr, NODE_SIZE).as_ptr() as *const GcListNode)).next }
    }

    /// Address of the `next` field, for use with [`GcAllocator::assign_member`].
    fn next_slot(alloc: &mut dyn GcAllocator, addr: GcAddr) -> *mut GcAddr {
        unsafe {
            let node = alloc.bytes_mut(addr, NODE_SIZE).as_mut_ptr() as *mut GcListNode;
            &mut (*node).next as *mut GcAddr
        }
    }

    fn shallow_size(&self) -> usize {
        NODE_SIZE
    }

    unsafe fn shallow_copy_into(&self, alloc: &mut dyn GcAllocator) -> Result<usize, GcError> {
        let size = self.shallow_size();
        let src = self as *const GcListNode as usize;
        let dest = alloc.alloc_gc_copy(size, src)?;
        core::ptr::copy_nonoverlapping(src as *const u8, dest as *mut u8, size);
        Ok(dest)
    }

    fn forward_children(&mut self, fwd: &mut dyn Forwarder) -> usize {
        self.value = fwd.forward(self.value);
        self.next = fwd.forward(self.next);
        self.shallow_size()
    }
}

/// An ordered association list kept sorted by key, entirely inside
/// whatever [`GcAllocator`] it's given. `head` is a plain `GcAddr`, not
/// itself managed memory, so callers that want it to survive collection
/// must root it with [`GcAssocList::head_slot`] the same way `GcPair`'s
/// tests root a pair.
#[derive(Default)]
pub struct GcAssocList {
    head: GcAddr,
}

impl GcAssocList {
    /// An empty list.
    pub fn new() -> Self {
        Self { head: 0 }
    }

    /// True once `head` is the null address (`0`, the crate's "no node"
    /// convention, mirrored by `GenerationalGc::forward`'s `addr == 0`
    /// passthrough).
    pub fn is_empty(&self) -> bool {
        self.head == 0
    }

    /// Address of the `head` field, for rooting with the owning
    /// collector (see `GcPair::car_slot` for the same pattern).
    pub fn head_slot(&mut self) -> *mut GcAddr {
        &mut self.head as *mut GcAddr
    }

    /// Inserts `key -> value`, keeping the list sorted by key and
    /// overwriting in place if `key` is already present. Every write to
    /// a `next` field — splicing in the new node, or relinking around an
    /// overwritten one — goes through `assign_member`, never a direct
    /// store, so a collecting allocator sees every link change.
    pub fn insert(
        &mut self,
        alloc: &mut dyn GcAllocator,
        key: i64,
        value: GcAddr,
    ) -> Result<(), GcError> {
        let mut parent: GcAddr = 0;
        let mut slot = self.head_slot();
        let mut cur = self.head;
        while cur != 0 {
            match key.cmp(&GcListNode::key(alloc, cur)) {
                Ordering::Equal => {
                    let next = GcListNode::next(alloc, cur);
                    let new_node = GcListNode::alloc_node(alloc, key, value, next)?;
                    unsafe {
                        alloc.assign_member(parent, slot, new_node);
                    }
                    return Ok(());
                }
                Ordering::Greater => {
                    parent = cur;
                    slot = GcListNode::next_slot(alloc, cur);
                    cur = GcListNode::next(alloc, cur);
                }
                Ordering::Less => break,
            }
        }
        let new_node = GcListNode::alloc_node(alloc, key, value, cur)?;
        unsafe {
            alloc.assign_member(parent, slot, new_node);
        }
        Ok(())
    }

    /// Like [`GcAssocList::insert`], but refuses to mutate while a
    /// collection cycle is in flight, for allocators that can tell us
    /// (the `CollectingAllocator` half of the traits adaptor). Arenas
    /// have no such notion and just use [`GcAssocList::insert`] directly.
    pub fn insert_if_idle<A: GcAllocator + CollectingAllocator>(
        &mut self,
        alloc: &mut A,
        key: i64,
        value: GcAddr,
    ) -> Result<(), GcError> {
        if alloc.cycle_in_progress() {
            return Err(GcError::InvariantViolation(format!(
                "{} has a collection cycle in progress",
                alloc.name()
            )));
        }
        self.insert(alloc, key, value)
    }

    /// Looks up `key`, returning the value address if present.
    pub fn find(&self, alloc: &dyn GcAllocator, key: i64) -> Option<GcAddr> {
        let mut cur = self.head;
        while cur != 0 {
            match key.cmp(&GcListNode::key(alloc, cur)) {
                Ordering::Equal => return Some(GcListNode::value(alloc, cur)),
                Ordering::Greater => cur = GcListNode::next(alloc, cur),
                Ordering::Less => return None,
            }
        }
        None
    }

    /// Resets the list to empty by resetting the whole allocator in one
    /// shot rather than unlinking nodes one at a time. Only sound when
    /// nothing else is still relying on memory this allocator owns,
    /// which is exactly what [`TrivialDeallocation`] promises.
    pub fn clear_with<A: GcAllocator + TrivialDeallocation>(&mut self, alloc: &mut A) {
        alloc.clear();
        self.head = 0;
    }

    /// In-order iterator over `(key, value)` pairs.
    pub fn iter<'a>(&self, alloc: &'a dyn GcAllocator) -> GcAssocListIter<'a> {
        GcAssocListIter { alloc, cur: self.head }
    }
}

/// Yields `(key, value)` pairs in ascending key order.
pub struct GcAssocListIter<'a> {
    alloc: &'a dyn GcAllocator,
    cur: GcAddr,
}

impl<'a> Iterator for GcAssocListIter<'a> {
    type Item = (i64, GcAddr);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur == 0 {
            return None;
        }
        let key = GcListNode::key(self.alloc, self.cur);
        let value = GcListNode::value(self.alloc, self.cur);
        self.cur = GcListNode::next(self.alloc, self.cur);
        Some((key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gc::generational::{GcConfig, GenerationalGc};
    use crate::gc::types::GcString;
    use crate::gc::ArenaAllocator;

    #[test]
    fn insert_keeps_keys_sorted_over_an_arena() {
        let mut alloc = ArenaAllocator::new("test", 1 << 16);
        let mut list = GcAssocList::new();
        for key in [5, 1, 4, 2, 3] {
            list.insert(&mut alloc, key, key as GcAddr * 100).unwrap();
        }
        let keys: Vec<i64> = list.iter(&alloc).map(|(k, _)| k).collect();
        assert_eq!(keys, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn find_overwrite_and_clear_with_work_over_an_arena() {
        let mut alloc = ArenaAllocator::new("test", 1 << 16);
        let mut list = GcAssocList::new();
        list.insert(&mut alloc, 1, 10).unwrap();
        list.insert(&mut alloc, 1, 20).unwrap();
        assert_eq!(list.find(&alloc, 1), Some(20));
        assert_eq!(list.find(&alloc, 2), None);

        list.clear_with(&mut alloc);
        assert!(list.is_empty());
        assert_eq!(alloc.allocated(), 0);
    }

    #[test]
    fn nodes_and_their_values_survive_a_minor_collection_when_rooted() {
        let mut gc = GenerationalGc::new("test", GcConfig::default());
        let mut list = GcAssocList::new();
        unsafe {
            gc.add_root(list.head_slot());
        }
        let a = GcString::new(&mut gc, "a").unwrap();
        let b = GcString::new(&mut gc, "b").unwrap();
        list.insert(&mut gc, 2, b).unwrap();
        list.insert(&mut gc, 1, a).unwrap();

        gc.request_minor_gc().unwrap();

        let found_a = list.find(&gc, 1).unwrap();
        let found_b = list.find(&gc, 2).unwrap();
        unsafe {
            assert_eq!(GcString::as_str(found_a), "a");
            assert_eq!(GcString::as_str(found_b), "b");
        }
        let keys: Vec<i64> = list.iter(&gc).map(|(k, _)| k).collect();
        assert_eq!(keys, vec![1, 2]);
    }

    #[test]
    fn insert_if_idle_succeeds_between_cycles() {
        let mut gc = GenerationalGc::new("test", GcConfig::default());
        let mut list = GcAssocList::new();
        unsafe {
            gc.add_root(list.head_slot());
        }
        let a = GcString::new(&mut gc, "a").unwrap();
        assert!(!gc.cycle_in_progress());
        list.insert_if_idle(&mut gc, 1, a).unwrap();

        gc.request_minor_gc().unwrap();
        assert!(!gc.cycle_in_progress());

        let b = GcString::new(&mut gc, "b").unwrap();
        list.insert_if_idle(&mut gc, 2, b).unwrap();
        assert!(list.find(&gc, 1).is_some());
        assert!(list.find(&gc, 2).is_some());
    }
}
