//! Test doubles for nestbox.
//!
//! [`CountingAllocator`] wraps the system allocator, counts every
//! allocation and deallocation, and can be told to refuse specific
//! allocation attempts. Leak checks compare `live()` against zero.

use std::alloc::Layout;
use std::collections::BTreeSet;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use nestbox::{NestboxOptions, NestboxRuntime, RawAllocator, SharedAllocator, SystemAllocator};
use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct CountingAllocator {
    attempts: AtomicUsize,
    allocations: AtomicUsize,
    deallocations: AtomicUsize,
    live_bytes: AtomicUsize,
    /// 1-based attempt numbers that must fail.
    fail_attempts: Mutex<BTreeSet<usize>>,
    fail_all: Mutex<bool>,
}

impl CountingAllocator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Refuse the `n`-th allocation attempt (1-based, counted from creation).
    pub fn fail_attempt(&self, n: usize) {
        self.fail_attempts.lock().insert(n);
    }

    /// Refuse every allocation attempt until `recover` is called.
    pub fn fail_all(&self) {
        *self.fail_all.lock() = true;
    }

    pub fn recover(&self) {
        *self.fail_all.lock() = false;
        self.fail_attempts.lock().clear();
    }

    /// Blocks handed out and not yet returned.
    pub fn live(&self) -> usize {
        self.allocations() - self.deallocations()
    }

    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::SeqCst)
    }

    /// Successful allocations.
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }

    pub fn deallocations(&self) -> usize {
        self.deallocations.load(Ordering::SeqCst)
    }

    /// All attempts, including refused ones.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn shared(self: &Arc<Self>) -> SharedAllocator {
        self.clone()
    }

    fn should_fail(&self, attempt: usize) -> bool {
        *self.fail_all.lock() || self.fail_attempts.lock().contains(&attempt)
    }
}

unsafe impl RawAllocator for CountingAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.should_fail(attempt) {
            return None;
        }

        let ptr = SystemAllocator.allocate(layout)?;
        self.allocations.fetch_add(1, Ordering::SeqCst);
        self.live_bytes.fetch_add(layout.size(), Ordering::SeqCst);
        Some(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { SystemAllocator.deallocate(ptr, layout) };
        self.deallocations.fetch_add(1, Ordering::SeqCst);
        self.live_bytes.fetch_sub(layout.size(), Ordering::SeqCst);
    }
}

/// Runtime whose heap is a fresh [`CountingAllocator`].
pub fn counting_runtime(options: NestboxOptions) -> (NestboxRuntime, Arc<CountingAllocator>) {
    let counter = CountingAllocator::new();
    let runtime = NestboxRuntime::with_allocator(options, counter.shared());
    (runtime, counter)
}
