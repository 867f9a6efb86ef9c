//! A bump-pointer allocator that never moves what it allocates.
//!
//! Directly generalizes `halo`'s `BrandedBumpAllocator` chunk-growth
//! strategy (`src/alloc/bump.rs`) from a brand-scoped, typed API to the
//! crate's byte-addressed [`GcAllocator`] trait, and serves as the "plain
//! allocator" half of spec.md's C3 traits adaptor: containers built over
//! `ArenaAllocator` pay nothing for GC participation because it never
//! implements [`CollectingAllocator`].

use super::allocator::{GcAddr, GcAllocator, TrivialDeallocation};
use super::error::GcError;

fn align_up(n: usize, align: usize) -> usize {
    (n + align - 1) & !(align - 1)
}

const WORD: usize = core::mem::size_of::<usize>();

/// A single contiguous, growable byte region with a bump cursor.
pub struct ArenaAllocator {
    name: String,
    storage: Vec<u8>,
    cursor: usize,
    checkpoint: usize,
    reserved: usize,
}

impl ArenaAllocator {
    /// Creates an arena that reserves up to `reserved` bytes.
    pub fn new(name: impl Into<String>, reserved: usize) -> Self {
        Self {
            name: name.into(),
            storage: Vec::with_capacity(reserved.min(1 << 20)),
            cursor: 0,
            checkpoint: 0,
            reserved,
        }
    }
}

impl GcAllocator for ArenaAllocator {
    fn name(&self) -> &str {
        &self.name
    }

    fn alloc(&mut self, nbytes: usize) -> Result<GcAddr, GcError> {
        let nbytes = align_up(nbytes, WORD);
        let end = self.cursor + nbytes;
        if end > self.reserved {
            return Err(GcError::AllocatorExhausted {
                allocator: self.name.clone(),
                requested: nbytes,
                available: self.reserved - self.cursor,
            });
        }
        if end > self.storage.len() {
            self.storage.resize(end, 0);
        }
        let addr = self.cursor;
        self.cursor = end;
        Ok(addr)
    }

    fn available(&self) -> usize {
        self.reserved - self.cursor
    }

    fn allocated(&self) -> usize {
        self.cursor
    }

    fn committed(&self) -> usize {
        self.storage.len()
    }

    fn size(&self) -> usize {
        self.reserved
    }

    fn contains(&self, addr: GcAddr) -> bool {
        addr < self.cursor
    }

    fn is_before_checkpoint(&self, addr: GcAddr) -> bool {
        addr < self.checkpoint
    }

    fn checkpoint(&mut self) {
        self.checkpoint = self.cursor;
    }

    fn clear(&mut self) {
        self.storage.clear();
        self.cursor = 0;
        self.checkpoint = 0;
    }

    unsafe fn bytes(&self, addr: GcAddr, len: usize) -> &[u8] {
        &self.storage[addr..addr + len]
    }

    unsafe fn bytes_mut(&mut self, addr: GcAddr, len: usize) -> &mut [u8] {
        &mut self.storage[addr..addr + len]
    }
}

impl TrivialDeallocation for ArenaAllocator {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_allocates_word_aligned_disjoint_regions() {
        let mut a = ArenaAllocator::new("test", 4096);
        let x = a.alloc(3).unwrap();
        let y = a.alloc(5).unwrap();
        assert_eq!(x % WORD, 0);
        assert_eq!(y % WORD, 0);
        assert!(y >= x + 8);
        assert_eq!(a.allocated(), a.allocated());
        assert!(a.allocated() <= a.committed());
        assert!(a.committed() <= a.size());
    }

    #[test]
    fn checkpoint_splits_before_after() {
        let mut a = ArenaAllocator::new("test", 4096);
        let before = a.alloc(8).unwrap();
        a.checkpoint();
        let after = a.alloc(8).unwrap();
        assert!(a.is_before_checkpoint(before));
        assert!(!a.is_before_checkpoint(after));
    }

    #[test]
    fn exhaustion_reports_allocator_exhausted() {
        let mut a = ArenaAllocator::new("tiny", 8);
        a.alloc(8).unwrap();
        match a.alloc(8) {
            Err(GcError::AllocatorExhausted { .. }) => {}
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn clear_invalidates_prior_addresses() {
        let mut a = ArenaAllocator::new("test", 4096);
        let addr = a.alloc(8).unwrap();
        assert!(a.contains(addr));
        a.clear();
        assert!(!a.contains(addr));
        assert_eq!(a.allocated(), 0);
    }
}
