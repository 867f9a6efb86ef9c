//! The incremental, evacuating, generational collector (spec.md §4.2).
//!
//! Each generation is a pair of fixed-capacity byte buffers (`live`, the
//! space the mutator currently bump-allocates into, and `reserve`, an
//! empty twin), generalizing `halo`'s `src/alloc/bump.rs` `Chunk` bump
//! cursor from a single growing arena to a pair of same-sized semi-spaces
//! that swap roles every cycle. Root rewriting and the write-barrier log
//! borrow the generation-tagged-slot bookkeeping style of
//! `src/alloc/generational_pool.rs`'s `PoolState`, adapted from index
//! reuse (ABA protection) to address forwarding (evacuation).

use super::allocator::{CollectingAllocator, GcAddr, GcAllocator};
use super::error::GcError;
use super::object::{Forwarder, ObjectHeader};
use super::stats::{GcStatistics, PerGenerationStatistics};

#[cfg(feature = "tracing")]
use tracing::trace;

fn align_up(n: usize, align: usize) -> usize {
    (n + align - 1) & !(align - 1)
}

const WORD: usize = core::mem::size_of::<usize>();

/// Sizing knobs for a [`GenerationalGc`]. No field is read from the
/// environment (spec.md §6: "Environment variables: none required").
#[derive(Debug, Clone, Copy)]
pub struct GcConfig {
    /// Capacity, in bytes, of each nursery semi-space.
    pub nursery_capacity: usize,
    /// Capacity, in bytes, of each tenured semi-space.
    pub tenured_capacity: usize,
    /// Maximum number of pending write-barrier log entries before a
    /// synchronous collection is forced.
    pub write_barrier_log_capacity: usize,
    /// Bytes of scanning work `step_incremental` performs per call.
    pub incremental_step_bytes: usize,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            nursery_capacity: 1 << 20,
            tenured_capacity: 8 << 20,
            write_barrier_log_capacity: 4096,
            incremental_step_bytes: 4096,
        }
    }
}

/// Which generation an address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gen {
    Nursery,
    Tenured,
}

struct SemiSpace {
    storage: Vec<u8>,
    cursor: usize,
    capacity: usize,
}

impl SemiSpace {
    fn new(capacity: usize) -> Self {
        Self {
            storage: vec![0u8; capacity],
            cursor: 0,
            capacity,
        }
    }

    fn base(&self) -> usize {
        self.storage.as_ptr() as usize
    }

    fn contains(&self, addr: GcAddr) -> bool {
        let base = self.base();
        addr >= base && addr < base + self.capacity
    }

    fn offset_of(&self, addr: GcAddr) -> usize {
        addr - self.base()
    }

    fn bump(&mut self, nbytes: usize) -> Option<GcAddr> {
        let end = self.cursor + nbytes;
        if end > self.capacity {
            return None;
        }
        let addr = self.base() + self.cursor;
        self.cursor = end;
        Some(addr)
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}

/// A generation's pair of semi-spaces plus its observable counters.
///
/// `live` is always where the mutator's `alloc` lands and where the
/// collector evacuates survivors *into*. `reserve` is an idle, empty
/// twin outside a cycle; during a cycle touching this generation the two
/// swap roles, so `reserve` becomes the from-space being scanned.
struct Generation {
    live: SemiSpace,
    reserve: SemiSpace,
    stats: PerGenerationStatistics,
}

impl Generation {
    fn new(capacity: usize) -> Self {
        Self {
            live: SemiSpace::new(capacity),
            reserve: SemiSpace::new(capacity),
            stats: PerGenerationStatistics::default(),
        }
    }

    fn contains_any(&self, addr: GcAddr) -> bool {
        self.live.contains(addr) || self.reserve.contains(addr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleState {
    Idle,
    Scanning,
    Fixup,
    Done,
}

struct CycleCtx {
    state: CycleState,
    major: bool,
    nursery_scan: usize,
    tenured_scan: usize,
}

/// The generational, incremental, evacuating collector.
pub struct GenerationalGc {
    name: String,
    nursery: Generation,
    tenured: Generation,
    nursery_checkpoint: usize,
    tenured_checkpoint: usize,
    roots: Vec<*mut GcAddr>,
    write_barrier_log: Vec<(GcAddr, *mut GcAddr)>,
    config: GcConfig,
    cycle: CycleCtx,
    stats: GcStatistics,
}

// SAFETY: the raw pointers this type stores (roots, write-barrier log
// entries) always point into byte buffers owned by `self` or registered
// explicitly by the embedder; `GenerationalGc` never shares those buffers
// across threads (spec.md §5: single-mutator cooperative).
unsafe impl Send for GenerationalGc {}

impl GenerationalGc {
    /// Creates a collector with the given sizing configuration.
    pub fn new(name: impl Into<String>, config: GcConfig) -> Self {
        Self {
            name: name.into(),
            nursery: Generation::new(config.nursery_capacity),
            tenured: Generation::new(config.tenured_capacity),
            nursery_checkpoint: 0,
            tenured_checkpoint: 0,
            roots: Vec::new(),
            write_barrier_log: Vec::with_capacity(config.write_barrier_log_capacity),
            config,
            cycle: CycleCtx {
                state: CycleState::Idle,
                major: false,
                nursery_scan: 0,
                tenured_scan: 0,
            },
            stats: GcStatistics::default(),
        }
    }

    /// Registers a mutator-owned slot as a GC root. The slot is rewritten
    /// in place by every subsequent cycle for as long as it stays registered.
    ///
    /// # Safety
    /// `slot` must remain valid (dereferenceable, not aliased elsewhere in
    /// a conflicting way) for as long as it is registered.
    pub unsafe fn add_root(&mut self, slot: *mut GcAddr) {
        self.roots.push(slot);
    }

    /// Unregisters a previously-added root.
    pub fn remove_root(&mut self, slot: *mut GcAddr) {
        self.roots.retain(|&s| s != slot);
    }

    /// A read-only snapshot of the collector's counters.
    pub fn statistics(&self) -> GcStatistics {
        self.stats
    }

    /// True while the write-barrier log holds entries for a generation
    /// pairing that is not currently being collected (debugging aid).
    pub fn pending_write_barrier_entries(&self) -> usize {
        self.write_barrier_log.len()
    }

    /// `(generation, is_from_space)` for a live address, or `None` if
    /// `addr` lies outside this collector's managed region entirely.
    fn locate(&self, addr: GcAddr) -> Option<(Gen, bool)> {
        if self.nursery.reserve.contains(addr) {
            return Some((Gen::Nursery, true));
        }
        if self.nursery.live.contains(addr) {
            return Some((Gen::Nursery, false));
        }
        if self.tenured.reserve.contains(addr) {
            return Some((Gen::Tenured, true));
        }
        if self.tenured.live.contains(addr) {
            return Some((Gen::Tenured, false));
        }
        None
    }

    /// # Safety
    /// `addr` must be a live object header previously returned by this
    /// collector's allocation, or zero (null).
    unsafe fn header_at(&self, addr: GcAddr) -> &ObjectHeader {
        &*(addr as *const ObjectHeader)
    }

    /// # Safety
    /// See [`GenerationalGc::header_at`].
    unsafe fn header_at_mut(&mut self, addr: GcAddr) -> &mut ObjectHeader {
        &mut *(addr as *mut ObjectHeader)
    }

    /// Forwards a single address during Rooting/Scanning/Fixup: follows an
    /// existing forwarding stub, evacuates a not-yet-forwarded live
    /// object, or passes through addresses outside this collector's space
    /// (spec.md's "stray reference" tolerance for external statics).
    fn forward(&mut self, addr: GcAddr) -> Result<GcAddr, GcError> {
        if addr == 0 {
            return Ok(0);
        }
        let Some((gen, is_from)) = self.locate(addr) else {
            return Ok(addr);
        };
        if !is_from {
            // Already relocated into a live/to-space this cycle, or a
            // generation this cycle doesn't touch at all.
            return Ok(addr);
        }

        let header = unsafe { self.header_at(addr) };
        if header.is_forwarded() {
            return Ok(unsafe { header.destination() });
        }

        let vtable = unsafe { header.vtable() };
        let dest = unsafe { (vtable.shallow_copy)(addr as *const u8, self)? };
        let shallow_size = unsafe { (vtable.shallow_size)(addr as *const u8) };
        unsafe {
            self.header_at_mut(addr).forward_to(dest);
        }

        let promoted = gen == Gen::Nursery && self.tenured.contains_any(dest);
        match gen {
            Gen::Nursery => {
                self.nursery.stats.survive_z += shallow_size as u64;
                if promoted {
                    self.nursery.stats.promote_z += shallow_size as u64;
                    self.stats.total_promoted_sab += shallow_size as u64;
                    self.stats.total_promoted += shallow_size as u64;
                }
            }
            Gen::Tenured => {
                self.tenured.stats.survive_z += shallow_size as u64;
            }
        }

        Ok(dest)
    }

    fn begin_cycle(&mut self, major: bool) {
        core::mem::swap(&mut self.nursery.live, &mut self.nursery.reserve);
        self.nursery.live.reset();
        if major {
            core::mem::swap(&mut self.tenured.live, &mut self.tenured.reserve);
            self.tenured.live.reset();
        }
        self.cycle = CycleCtx {
            state: CycleState::Scanning,
            major,
            nursery_scan: 0,
            tenured_scan: 0,
        };
        #[cfg(feature = "tracing")]
        trace!(major, "gc cycle begin");

        let roots = core::mem::take(&mut self.roots);
        for &slot in &roots {
            unsafe {
                let old = *slot;
                let new = self
                    .forward(old)
                    .expect("root forwarding must not exhaust to-space sized for live data");
                *slot = new;
            }
        }
        self.roots = roots;
    }

    /// Advances the current cycle by roughly `budget` bytes of scanning
    /// work, or completes whatever phase remains once scanning catches
    /// up to the allocation cursor. Returns `true` once the cycle has
    /// fully finished (the collector is back to `Idle`).
    pub fn step_incremental(&mut self, budget: usize) -> bool {
        match self.cycle.state {
            CycleState::Idle => true,
            CycleState::Scanning => {
                let mut advanced = 0;
                while advanced < budget {
                    if self.cycle.nursery_scan < self.nursery.live.cursor {
                        let addr = self.nursery.live.base() + self.cycle.nursery_scan;
                        advanced += self.scan_one(addr, Gen::Nursery).max(1);
                        continue;
                    }
                    if self.cycle.major && self.cycle.tenured_scan < self.tenured.live.cursor {
                        let addr = self.tenured.live.base() + self.cycle.tenured_scan;
                        advanced += self.scan_one(addr, Gen::Tenured).max(1);
                        continue;
                    }
                    break;
                }
                let nursery_done = self.cycle.nursery_scan >= self.nursery.live.cursor;
                let tenured_done =
                    !self.cycle.major || self.cycle.tenured_scan >= self.tenured.live.cursor;
                if nursery_done && tenured_done {
                    self.cycle.state = CycleState::Fixup;
                }
                false
            }
            CycleState::Fixup => {
                self.run_fixup();
                self.cycle.state = CycleState::Done;
                false
            }
            CycleState::Done => {
                self.finish_cycle();
                true
            }
        }
    }

    fn scan_one(&mut self, addr: GcAddr, gen: Gen) -> usize {
        struct SelfForwarder<'a>(&'a mut GenerationalGc);
        impl<'a> Forwarder for SelfForwarder<'a> {
            fn forward(&mut self, child: usize) -> usize {
                self.0
                    .forward(child)
                    .expect("scan-time forwarding must not exhaust to-space sized for live data")
            }
        }

        let header = unsafe { self.header_at(addr) };
        let vtable = unsafe { header.vtable() };
        let advanced =
            unsafe { (vtable.forward_children)(addr as *mut u8, &mut SelfForwarder(self)) };

        match gen {
            Gen::Nursery => {
                self.cycle.nursery_scan += advanced;
                self.nursery.stats.scanned_z += advanced as u64;
            }
            Gen::Tenured => {
                self.cycle.tenured_scan += advanced;
                self.tenured.stats.scanned_z += advanced as u64;
            }
        }
        advanced
    }

    fn run_fixup(&mut self) {
        let log = core::mem::take(&mut self.write_barrier_log);
        for (_, field) in log {
            unsafe {
                let old = *field;
                let new = self
                    .forward(old)
                    .expect("fixup forwarding must not exhaust to-space sized for live data");
                *field = new;
            }
        }
    }

    fn finish_cycle(&mut self) {
        self.nursery.reserve.reset();
        self.nursery_checkpoint = self.nursery.live.cursor;
        self.nursery.stats.n_gc += 1;
        self.nursery.stats.used_z = self.nursery.live.cursor as u64;
        self.nursery.stats.new_alloc_z = 0;

        if self.cycle.major {
            self.tenured.reserve.reset();
            self.tenured_checkpoint = self.tenured.live.cursor;
            self.tenured.stats.n_gc += 1;
            self.tenured.stats.used_z = self.tenured.live.cursor as u64;
            self.tenured.stats.new_alloc_z = 0;
        } else {
            self.tenured.stats.used_z = self.tenured.live.cursor as u64;
        }

        self.stats.gen_v = [self.nursery.stats, self.tenured.stats];
        self.cycle.state = CycleState::Idle;
        #[cfg(feature = "tracing")]
        trace!(
            nursery_used = self.nursery.stats.used_z,
            tenured_used = self.tenured.stats.used_z,
            "gc cycle done"
        );
    }

    /// Runs a minor (nursery-only) collection to completion.
    pub fn request_minor_gc(&mut self) -> Result<(), GcError> {
        self.begin_cycle(false);
        while !self.step_incremental(usize::MAX) {}
        Ok(())
    }

    /// Runs a major (whole-heap) collection to completion.
    pub fn request_major_gc(&mut self) -> Result<(), GcError> {
        self.begin_cycle(true);
        while !self.step_incremental(usize::MAX) {}
        Ok(())
    }

    fn alloc_in(&mut self, gen: Gen, nbytes: usize) -> Result<GcAddr, GcError> {
        let nbytes = align_up(nbytes, WORD);
        let (space, stats) = match gen {
            Gen::Nursery => (&mut self.nursery.live, &mut self.nursery.stats),
            Gen::Tenured => (&mut self.tenured.live, &mut self.tenured.stats),
        };
        match space.bump(nbytes) {
            Some(addr) => {
                stats.new_alloc_z += nbytes as u64;
                self.stats.total_allocated += nbytes as u64;
                Ok(addr)
            }
            None => Err(GcError::AllocatorExhausted {
                allocator: self.name.clone(),
                requested: nbytes,
                available: space.capacity - space.cursor,
            }),
        }
    }
}

impl GcAllocator for GenerationalGc {
    fn name(&self) -> &str {
        &self.name
    }

    fn alloc(&mut self, nbytes: usize) -> Result<GcAddr, GcError> {
        self.alloc_in(Gen::Nursery, nbytes)
    }

    fn available(&self) -> usize {
        (self.nursery.live.capacity - self.nursery.live.cursor)
            + (self.tenured.live.capacity - self.tenured.live.cursor)
    }

    fn allocated(&self) -> usize {
        self.nursery.live.cursor + self.tenured.live.cursor
    }

    fn committed(&self) -> usize {
        self.config.nursery_capacity + self.config.tenured_capacity
    }

    fn size(&self) -> usize {
        self.committed()
    }

    fn contains(&self, addr: GcAddr) -> bool {
        self.nursery.contains_any(addr) || self.tenured.contains_any(addr)
    }

    fn is_before_checkpoint(&self, addr: GcAddr) -> bool {
        if self.nursery.live.contains(addr) {
            return self.nursery.live.offset_of(addr) < self.nursery_checkpoint;
        }
        if self.tenured.live.contains(addr) {
            return self.tenured.live.offset_of(addr) < self.tenured_checkpoint;
        }
        false
    }

    fn checkpoint(&mut self) {
        self.nursery_checkpoint = self.nursery.live.cursor;
        self.tenured_checkpoint = self.tenured.live.cursor;
    }

    fn clear(&mut self) {
        self.nursery.live.reset();
        self.nursery.reserve.reset();
        self.tenured.live.reset();
        self.tenured.reserve.reset();
        self.nursery_checkpoint = 0;
        self.tenured_checkpoint = 0;
        self.write_barrier_log.clear();
        self.stats = GcStatistics::default();
        self.nursery.stats = PerGenerationStatistics::default();
        self.tenured.stats = PerGenerationStatistics::default();
    }

    unsafe fn bytes(&self, addr: GcAddr, len: usize) -> &[u8] {
        core::slice::from_raw_parts(addr as *const u8, len)
    }

    unsafe fn bytes_mut(&mut self, addr: GcAddr, len: usize) -> &mut [u8] {
        core::slice::from_raw_parts_mut(addr as *mut u8, len)
    }

    unsafe fn assign_member(&mut self, parent: GcAddr, lhs: *mut GcAddr, rhs: GcAddr) {
        *lhs = rhs;
        self.stats.n_mutation += 1;

        let parent_gen = self.locate(parent).map(|(g, _)| g);
        let rhs_gen = if rhs == 0 { None } else { self.locate(rhs).map(|(g, _)| g) };

        let crosses_gen = matches!((parent_gen, rhs_gen), (Some(p), Some(r)) if p != r);
        let crosses_checkpoint =
            rhs != 0 && self.is_before_checkpoint(parent) != self.is_before_checkpoint(rhs);

        if crosses_gen || crosses_checkpoint {
            self.stats.n_logged_mutation += 1;
            if crosses_gen {
                self.stats.n_xgen_mutation += 1;
            }
            if crosses_checkpoint {
                self.stats.n_xckp_mutation += 1;
            }

            if self.write_barrier_log.len() + 1 > self.config.write_barrier_log_capacity {
                self.request_minor_gc()
                    .expect("synchronous GC forced by a full write-barrier log must succeed");
            }
            self.write_barrier_log.push((parent, lhs));
        }
    }

    fn alloc_gc_copy(&mut self, nbytes: usize, src: GcAddr) -> Result<GcAddr, GcError> {
        let gen = match self.locate(src) {
            Some((Gen::Nursery, is_from)) => {
                let before_checkpoint =
                    is_from && self.nursery.reserve.offset_of(src) < self.nursery_checkpoint;
                if before_checkpoint {
                    Gen::Tenured
                } else {
                    Gen::Nursery
                }
            }
            Some((Gen::Tenured, _)) => Gen::Tenured,
            None => Gen::Nursery,
        };
        self.alloc_in(gen, nbytes)
    }
}

impl CollectingAllocator for GenerationalGc {
    fn cycle_in_progress(&self) -> bool {
        self.cycle.state != CycleState::Idle
    }
}
