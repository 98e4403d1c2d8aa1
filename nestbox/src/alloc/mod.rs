//! Heap storage for components.
//!
//! All heap allocation goes through a [`RawAllocator`] so that failure is a
//! value instead of an abort, and so tests can count and refuse
//! allocations. [`HeapCell`] is the owning handle for one allocated value;
//! [`Slot`] is the clear-on-release place a handle lives in.

mod budget;
mod cell;
mod slot;

pub use budget::BudgetAllocator;
pub use cell::HeapCell;
pub use slot::Slot;

use std::alloc::Layout;
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

/// Allocator handle shared by a runtime and every cell it produced.
pub type SharedAllocator = Arc<dyn RawAllocator>;

/// Source of raw heap storage.
///
/// # Safety
///
/// A non-`None` return from `allocate` must point to a block valid for reads
/// and writes of `layout.size()` bytes and aligned to `layout.align()`,
/// which stays valid until it is passed back to `deallocate` with the same
/// layout.
pub unsafe trait RawAllocator: Send + Sync + fmt::Debug {
    /// Allocate zero-filled storage, or `None` if the request cannot be met.
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Return storage obtained from `allocate`.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this allocator with the same
    /// `layout`, and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The process heap.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAllocator;

impl SystemAllocator {
    pub fn shared() -> SharedAllocator {
        Arc::new(SystemAllocator)
    }
}

unsafe impl RawAllocator for SystemAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            return None;
        }
        // SAFETY: layout has a non-zero size.
        NonNull::new(unsafe { std::alloc::alloc_zeroed(layout) })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}
