//! Owning handle for one heap-allocated value.

use std::alloc::Layout;
use std::fmt;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};

use nestbox_shared::errors::{NestboxError, NestboxResult};

use super::SharedAllocator;

/// A value living in storage obtained from a [`RawAllocator`](super::RawAllocator).
///
/// Like `Box<T>`, but allocation is fallible and the storage goes back to
/// the allocator it came from when the cell is dropped.
pub struct HeapCell<T> {
    ptr: NonNull<T>,
    allocator: SharedAllocator,
    _owns: PhantomData<T>,
}

// SAFETY: HeapCell uniquely owns its value, same as Box<T>. The allocator
// handle is Send + Sync by the RawAllocator bound.
unsafe impl<T: Send> Send for HeapCell<T> {}
unsafe impl<T: Sync> Sync for HeapCell<T> {}

impl<T> HeapCell<T> {
    /// Move `value` into fresh storage from `allocator`.
    ///
    /// # Returns
    /// * `Ok(HeapCell)` - storage acquired and initialized with `value`
    /// * `Err(AllocationFailure)` - the allocator refused; `value` is dropped
    pub fn new_in(value: T, allocator: SharedAllocator) -> NestboxResult<Self> {
        let layout = Layout::new::<T>();
        if layout.size() == 0 {
            return Err(NestboxError::InvalidArgument(format!(
                "{} is zero-sized",
                std::any::type_name::<T>()
            )));
        }

        let raw = allocator.allocate(layout).ok_or_else(|| {
            NestboxError::AllocationFailure(format!(
                "{} bytes for {}",
                layout.size(),
                short_type_name::<T>()
            ))
        })?;

        let ptr = raw.cast::<T>();
        // SAFETY: raw is valid and aligned for T per the RawAllocator contract.
        unsafe { ptr.as_ptr().write(value) };

        tracing::trace!(
            kind = short_type_name::<T>(),
            bytes = layout.size(),
            "Allocated heap cell"
        );

        Ok(Self {
            ptr,
            allocator,
            _owns: PhantomData,
        })
    }

    /// Give up ownership without freeing.
    ///
    /// The pointer must eventually be passed back to [`HeapCell::from_raw`]
    /// with an allocator equivalent to the one that produced it.
    pub fn into_raw(self) -> NonNull<T> {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the allocator handle is read
        // out exactly once.
        drop(unsafe { ptr::read(&this.allocator) });
        this.ptr
    }

    /// Re-take ownership of a pointer produced by [`HeapCell::into_raw`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from `into_raw` on a cell whose storage belongs to
    /// `allocator`, and must not have been reclaimed already.
    pub unsafe fn from_raw(ptr: NonNull<T>, allocator: SharedAllocator) -> Self {
        Self {
            ptr,
            allocator,
            _owns: PhantomData,
        }
    }
}

impl<T> Deref for HeapCell<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: ptr is valid and initialized for the cell's whole life.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> DerefMut for HeapCell<T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as above, and &mut self guarantees exclusivity.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T> Drop for HeapCell<T> {
    fn drop(&mut self) {
        // SAFETY: the value was written in new_in and is dropped exactly once
        // here; the storage goes back with the layout it was allocated with.
        unsafe {
            ptr::drop_in_place(self.ptr.as_ptr());
            self.allocator
                .deallocate(self.ptr.cast::<u8>(), Layout::new::<T>());
        }
        tracing::trace!(kind = short_type_name::<T>(), "Released heap cell");
    }
}

impl<T: fmt::Debug> fmt::Debug for HeapCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

/// `nestbox::component::leaf::Leaf` -> `Leaf`
pub(crate) fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
