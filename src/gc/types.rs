//! A minimal managed type, used by the collector's own tests and
//! available to embedders as a ready-made leaf object.
//!
//! `GcString` is deliberately simple: a header, a byte length, and inline
//! bytes. It has no children, so `forward_children` is a no-op walk —
//! this is the "leaf object" shape spec.md §8's scenarios allocate by the
//! thousand into the nursery.

use super::allocator::GcAllocator;
use super::error::GcError;
use super::object::{Forwarder, ObjectHeader};

/// A GC-managed, fixed-at-construction string.
///
/// `#[repr(C)]` with the header first satisfies the object model's layout
/// requirement (spec.md §3.1); the payload follows inline rather than
/// through a second allocation, so `shallow_size` depends on `len`.
#[repr(C)]
pub struct GcString {
    header: ObjectHeader,
    len: usize,
    bytes: [u8; 0],
}

crate::object_vtable!(GcString);

impl GcString {
    /// Placement-allocates a copy of `s` in `alloc`, returning its address.
    pub fn new(alloc: &mut dyn GcAllocator, s: &str) -> Result<usize, GcError> {
        let total = core::mem::size_of::<GcString>() + s.len();
        let addr = alloc.alloc(total)?;
        unsafe {
            let ptr = addr as *mut GcString;
            ptr.write(GcString {
                header: <Self as super::object::ManagedObject>::header(),
                len: s.len(),
                bytes: [],
            });
            let payload = (addr + core::mem::size_of::<GcString>()) as *mut u8;
            core::ptr::copy_nonoverlapping(s.as_ptr(), payload, s.len());
        }
        Ok(addr)
    }

    /// Reads the string back out, given its (possibly forwarded) address.
    ///
    /// # Safety
    /// `addr` must be a live `GcString` allocated by [`GcString::new`].
    pub unsafe fn as_str<'a>(addr: usize) -> &'a str {
        let ptr = addr as *const GcString;
        let len = (*ptr).len;
        let payload = (addr + core::mem::size_of::<GcString>()) as *const u8;
        let slice = core::slice::from_raw_parts(payload, len);
        core::str::from_utf8_unchecked(slice)
    }

    fn shallow_size(&self) -> usize {
        core::mem::size_of::<GcString>() + self.len
    }

    unsafe fn shallow_copy_into(&self, alloc: &mut dyn GcAllocator) -> Result<usize, GcError> {
        let size = self.shallow_size();
        let src = self as *const GcString as usize;
        let dest = alloc.alloc_gc_copy(size, src)?;
        core::ptr::copy_nonoverlapping(src as *const u8, dest as *mut u8, size);
        Ok(dest)
    }

    fn forward_children(&mut self, _fwd: &mut dyn Forwarder) -> usize {
        self.shallow_size()
    }
}

/// A managed cons cell, used to exercise multi-generation graphs (a
/// write through `car`/`cdr` may cross generations and must go through
/// [`GcAllocator::assign_member`]).
#[repr(C)]
pub struct GcPair {
    header: ObjectHeader,
    car: usize,
    cdr: usize,
}

crate::object_vtable!(GcPair);

impl GcPair {
    /// Placement-allocates a pair in `alloc`.
    pub fn new(alloc: &mut dyn GcAllocator, car: usize, cdr: usize) -> Result<usize, GcError> {
        let addr = alloc.alloc(core::mem::size_of::<GcPair>())?;
        unsafe {
            (addr as *mut GcPair).write(GcPair {
                header: <Self as super::object::ManagedObject>::header(),
                car,
                cdr,
            });
        }
        Ok(addr)
    }

    /// Address of the `car` field, for use with [`GcAllocator::assign_member`].
    pub fn car_slot(addr: usize) -> *mut usize {
        unsafe { &mut (*(addr as *mut GcPair)).car as *mut usize }
    }

    /// Address of the `cdr` field, for use with [`GcAllocator::assign_member`].
    pub fn cdr_slot(addr: usize) -> *mut usize {
        unsafe { &mut (*(addr as *mut GcPair)).cdr as *mut usize }
    }

    /// Reads `car`.
    ///
    /// # Safety
    /// `addr` must be a live `GcPair`.
    pub unsafe fn car(addr: usize) -> usize {
        (*(addr as *const GcPair)).car
    }

    /// Reads `cdr`.
    ///
    /// # Safety
    /// `addr` must be a live `GcPair`.
    pub unsafe fn cdr(addr: usize) -> usize {
        (*(addr as *const GcPair)).cdr
    }

    fn shallow_size(&self) -> usize {
        core::mem::size_of::<GcPair>()
    }

    unsafe fn shallow_copy_into(&self, alloc: &mut dyn GcAllocator) -> Result<usize, GcError> {
        let size = self.shallow_size();
        let src = self as *const GcPair as usize;
        let dest = alloc.alloc_gc_copy(size, src)?;
        core::ptr::copy_nonoverlapping(src as *const u8, dest as *mut u8, size);
        Ok(dest)
    }

    fn forward_children(&mut self, fwd: &mut dyn Forwarder) -> usize {
        self.car = fwd.forward(self.car);
        self.cdr = fwd.forward(self.cdr);
        self.shallow_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gc::generational::{GcConfig, GenerationalGc};

    #[test]
    fn string_survives_a_minor_collection_via_a_root() {
        let mut gc = GenerationalGc::new("test", GcConfig::default());
        let mut root = GcString::new(&mut gc, "hello, world").unwrap();
        unsafe {
            gc.add_root(&mut root as *mut usize);
        }
        gc.request_minor_gc().unwrap();
        let s = unsafe { GcString::as_str(root) };
        assert_eq!(s, "hello, world");
    }

    #[test]
    fn pair_children_are_forwarded_together_with_the_root() {
        let mut gc = GenerationalGc::new("test", GcConfig::default());
        let a = GcString::new(&mut gc, "a").unwrap();
        let b = GcString::new(&mut gc, "b").unwrap();
        let mut root = GcPair::new(&mut gc, a, b).unwrap();
        unsafe {
            gc.add_root(&mut root as *mut usize);
        }
        gc.request_minor_gc().unwrap();
        unsafe {
            let car = GcPair::car(root);
            let cdr = GcPair::cdr(root);
            assert_eq!(GcString::as_str(car), "a");
            assert_eq!(GcString::as_str(cdr), "b");
        }
    }

    #[test]
    fn unrooted_objects_do_not_survive_a_minor_collection() {
        let mut gc = GenerationalGc::new("test", GcConfig::default());
        let _ = GcString::new(&mut gc, "garbage").unwrap();
        let before = gc.statistics().total_allocated;
        gc.request_minor_gc().unwrap();
        let stats = gc.statistics();
        assert!(stats.total_allocated >= before);
        assert_eq!(stats.gen_v[0].survive_z, 0);
    }
}
