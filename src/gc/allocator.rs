//! The allocator trait every container and the collector itself is built
//! against (spec.md §4.1).

use super::error::GcError;

/// Byte address into an allocator's managed region. Opaque on purpose:
/// containers never do arithmetic on it directly, only compare it, store
/// it, and hand it back to the allocator that produced it.
pub type GcAddr = usize;

/// Narrow interface every allocator — arena or collecting — satisfies.
///
/// Non-collecting allocators trivialize `checkpoint`, `assign_member`, and
/// `alloc_gc_copy` (spec.md §4.1): `checkpoint` is a no-op, `assign_member`
/// degenerates to a plain store, and `alloc_gc_copy` is simply `alloc`.
/// `GenerationalGc` is the only implementor that gives these real meaning.
pub trait GcAllocator {
    /// Diagnostic name.
    fn name(&self) -> &str;

    /// Allocate `nbytes`, rounded up to word alignment. Returns raw,
    /// uninitialized storage; placement-construction is the caller's duty.
    fn alloc(&mut self, nbytes: usize) -> Result<GcAddr, GcError>;

    /// Bytes still available before the next `alloc` would fail.
    fn available(&self) -> usize;
    /// Bytes handed out by `alloc`/`alloc_gc_copy` so far.
    fn allocated(&self) -> usize;
    /// Bytes committed from the OS (>= allocated).
    fn committed(&self) -> usize;
    /// Total reserved size (>= committed).
    fn size(&self) -> usize;

    /// True if `addr` was returned by a prior `alloc`/`alloc_gc_copy` on
    /// this allocator and has not since been invalidated by `clear`.
    fn contains(&self, addr: GcAddr) -> bool;

    /// True if `addr` was allocated before the most recent `checkpoint`.
    fn is_before_checkpoint(&self, addr: GcAddr) -> bool;

    /// Marks the current allocation cursor. Subsequent allocations are
    /// "after-checkpoint" until the next call. Non-collecting allocators
    /// may ignore this.
    fn checkpoint(&mut self) {}

    /// Resets the allocator to empty, invalidating every prior address.
    fn clear(&mut self);

    /// Byte-level view of raw storage, for the collector and for object
    /// placement. Bounds are the caller's responsibility; `addr` must come
    /// from this allocator and `len` must not run past its allocation.
    ///
    /// # Safety
    /// See above.
    unsafe fn bytes(&self, addr: GcAddr, len: usize) -> &[u8];
    /// # Safety
    /// See [`GcAllocator::bytes`].
    unsafe fn bytes_mut(&mut self, addr: GcAddr, len: usize) -> &mut [u8];

    /// The write barrier: semantically `*lhs = rhs`, plus whatever
    /// bookkeeping the allocator needs. `parent` is the address of the
    /// object that owns the field at `lhs`; `non_collecting` allocators
    /// ignore it.
    ///
    /// # Safety
    /// `lhs` must be a valid, properly aligned pointer to a `GcAddr`-sized
    /// field inside an object owned by `parent`.
    unsafe fn assign_member(&mut self, parent: GcAddr, lhs: *mut GcAddr, rhs: GcAddr) {
        *lhs = rhs;
    }

    /// Used only by the collector during evacuation: place a copy of
    /// `nbytes` sourced from `src` (in the *from*-space of whichever
    /// allocator owns `src`) into the correct destination space of *this*
    /// allocator. For non-collecting allocators this is `alloc`.
    fn alloc_gc_copy(&mut self, nbytes: usize, _src: GcAddr) -> Result<GcAddr, GcError> {
        self.alloc(nbytes)
    }
}

/// Compile-time capability query (spec.md §4.1 "Traits adaptor").
///
/// `GcAllocator` implementors that participate in collection (only
/// [`super::generational::GenerationalGc`], currently) additionally
/// implement this trait; containers use [`IsCollecting`] as a bound to
/// decide, at compile time and with zero runtime cost for non-GC callers,
/// whether pointer stores must route through `assign_member`'s logging
/// path and whether nodes need to expose `forward_children`.
///
/// This is the crate's stand-in for the source's `void_t`-style SFINAE:
/// instead of detecting an optional method, non-collecting allocators
/// simply don't implement the marker, and generic code that needs GC
/// participation requires it as an explicit bound.
pub trait CollectingAllocator: GcAllocator {
    /// True while a collection cycle is in progress (Rooting/Scanning/Fixup).
    fn cycle_in_progress(&self) -> bool;
}

/// Allocators with trivial deallocation (arenas, bump allocators) can
/// answer this to let containers skip explicit node recycling — the
/// teacher's `src/alloc/bump.rs` documents the same "freed on
/// allocator drop" discipline in its `deallocate` no-op.
pub trait TrivialDeallocation: GcAllocator {}
