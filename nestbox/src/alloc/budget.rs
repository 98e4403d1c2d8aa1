//! Allocator that caps the number of live allocations.

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{RawAllocator, SharedAllocator};

/// Forwards to an inner allocator while fewer than `budget` blocks are live.
///
/// Configured through `NestboxOptions::allocation_budget`; useful to watch
/// a composite construction fail half-way and roll back.
#[derive(Debug)]
pub struct BudgetAllocator {
    inner: SharedAllocator,
    budget: usize,
    live: AtomicUsize,
}

impl BudgetAllocator {
    pub fn new(inner: SharedAllocator, budget: usize) -> Self {
        Self {
            inner,
            budget,
            live: AtomicUsize::new(0),
        }
    }

    /// Number of blocks handed out and not yet returned.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

unsafe impl RawAllocator for BudgetAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        let reserved = self
            .live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |live| {
                (live < self.budget).then_some(live + 1)
            });
        if reserved.is_err() {
            tracing::debug!(
                budget = self.budget,
                bytes = layout.size(),
                "Allocation budget exhausted"
            );
            return None;
        }

        let ptr = self.inner.allocate(layout);
        if ptr.is_none() {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
        ptr
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { self.inner.deallocate(ptr, layout) };
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}
