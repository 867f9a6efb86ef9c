//! The object model every GC-managed type must satisfy.
//!
//! An object's identity is a single hidden dispatch-table reference,
//! stored as the first field of its header, mirroring the single-vtable
//! layout `halo`'s node types already rely on for manual, non-`dyn`
//! polymorphism (see `src/collections/other/slot_map.rs`'s generation-tagged
//! `union SlotData`). Keeping the vtable pointer first means a forwarding
//! stub can be created by overwriting a live header with one of identical
//! size: the stub and the live object share a layout, distinguished only
//! by which vtable they point at.

use super::allocator::GcAllocator;
use core::fmt;

/// One function pointer per operation a managed type must support.
///
/// `size_of::<ObjectVtable>()` function pointers is the entirety of the
/// allocator-private state an object carries (spec.md §3.1: "exactly one
/// hidden dispatch-table reference and no other allocator-private state").
pub struct ObjectVtable {
    /// Human-readable type name, for diagnostics.
    pub type_name: &'static str,
    /// Exact shallow byte footprint, including padding.
    pub shallow_size: unsafe fn(*const u8) -> usize,
    /// Bit-copy the object into a fresh allocation obtained from `alloc_gc_copy`.
    pub shallow_copy: unsafe fn(*const u8, &mut dyn GcAllocator) -> Result<usize, super::error::GcError>,
    /// Visit every out-of-header child pointer, forwarding each through
    /// `forward`. Returns the same value as `shallow_size`.
    pub forward_children: unsafe fn(*mut u8, &mut dyn Forwarder) -> usize,
}

/// Callback the collector hands to `forward_children` so object code never
/// needs to know about generations, semi-spaces, or the write-barrier log.
pub trait Forwarder {
    /// Forward a single child address, returning its (possibly new) location.
    fn forward(&mut self, child: usize) -> usize;
}

/// The header every managed object begins with.
///
/// A "live" header points `vtable` at the object's real vtable. A
/// "forwarded" header (spec.md: forwarding stub) overwrites only the
/// `vtable` field — the rest of the original bytes are left in place but
/// are no longer meaningful — and `vtable` is one of the two sentinel
/// forwarding vtables below.
#[repr(C)]
pub struct ObjectHeader {
    pub(crate) vtable: *const ObjectVtable,
}

/// A forwarding stub's payload: the address the object now lives at.
#[repr(C)]
pub(crate) struct ForwardingStub {
    pub(crate) header: ObjectHeader,
    pub(crate) destination: usize,
}

/// The vtable used for forwarding stubs. `shallow_size`/`shallow_copy`
/// must never be invoked on a forwarded object — the collector always
/// checks `is_forwarded` first — so they report the invariant violation
/// described in spec.md §4.2 ("Forwarding-loop detected ... asserts").
pub(crate) static FORWARDING_VTABLE: ObjectVtable = ObjectVtable {
    type_name: "<forwarded>",
    shallow_size: |_| core::mem::size_of::<ForwardingStub>(),
    shallow_copy: |_, _| panic!("shallow_copy called on a forwarding stub"),
    forward_children: |_, _| panic!("forward_children called on a forwarding stub"),
};

impl ObjectHeader {
    /// Returns the dispatch table governing this object's concrete type.
    ///
    /// # Safety
    /// `self` must be a valid, live object header.
    #[inline]
    pub unsafe fn vtable(&self) -> &'static ObjectVtable {
        &*self.vtable
    }

    /// True if this storage has been overwritten with a forwarding stub.
    #[inline]
    pub fn is_forwarded(&self) -> bool {
        core::ptr::eq(self.vtable, &FORWARDING_VTABLE as *const ObjectVtable)
    }

    /// The relocated address, valid only when `is_forwarded()`.
    ///
    /// # Safety
    /// `self` must be `is_forwarded()`.
    #[inline]
    pub unsafe fn destination(&self) -> usize {
        debug_assert!(self.is_forwarded());
        let stub = &*(self as *const ObjectHeader as *const ForwardingStub);
        stub.destination
    }

    /// Overwrite this (live) header in place with a forwarding stub
    /// pointing at `dest`. The caller is responsible for the object's
    /// shallow size being at least `size_of::<ForwardingStub>()`, which
    /// holds for every managed object because the header is always its
    /// first field.
    ///
    /// # Safety
    /// `self` must be a live, non-forwarded header with room for a
    /// `ForwardingStub` at its address.
    pub unsafe fn forward_to(&mut self, dest: usize) {
        let stub = self as *mut ObjectHeader as *mut ForwardingStub;
        (*stub).header.vtable = &FORWARDING_VTABLE;
        (*stub).destination = dest;
    }
}

impl fmt::Debug for ObjectHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_forwarded() {
            write!(f, "ObjectHeader(forwarded -> {:#x})", unsafe { self.destination() })
        } else {
            write!(f, "ObjectHeader({})", unsafe { self.vtable().type_name })
        }
    }
}

/// A managed type's binding to the object model. Implementors place an
/// `ObjectHeader` as their first field and provide the three operations
/// the collector needs; `vtable()` is generated once per type (typically
/// via `object_vtable!`, below) and never changes.
pub trait ManagedObject: Sized {
    /// The static vtable describing this type to the collector.
    fn vtable() -> &'static ObjectVtable;

    /// Construct a header pointing at this type's vtable. Call this when
    /// placement-constructing a fresh instance into allocator storage.
    fn header() -> ObjectHeader {
        ObjectHeader {
            vtable: Self::vtable(),
        }
    }
}

/// Defines `shallow_size`/`shallow_copy`/`forward_children` for a
/// `#[repr(C)]` managed type and builds its static `ObjectVtable`.
///
/// `$ty` must start with an `ObjectHeader` field and implement
/// `children(&mut self) -> impl Iterator<Item = &mut usize>` returning
/// every out-of-header child address it owns.
#[macro_export]
macro_rules! object_vtable {
    ($ty:ty) => {
        impl $crate::gc::object::ManagedObject for $ty {
            fn vtable() -> &'static $crate::gc::object::ObjectVtable {
                static VTABLE: $crate::gc::object::ObjectVtable = $crate::gc::object::ObjectVtable {
                    type_name: stringify!($ty),
                    shallow_size: |ptr| unsafe { (*(ptr as *const $ty)).shallow_size() },
                    shallow_copy: |ptr, alloc| unsafe { (*(ptr as *const $ty)).shallow_copy_into(alloc) },
                    forward_children: |ptr, fwd| unsafe { (*(ptr as *mut $ty)).forward_children(fwd) },
                };
                &VTABLE
            }
        }
    };
}
