//! Nestbox - lifecycle discipline for composite components.
//!
//! A [`Composite`] owns one [`Leaf`] inline and refers to a second one that
//! is either owned (allocated by the composite's own allocation path, or
//! adopted) or borrowed (injected by a caller that keeps ownership).
//!
//! ```text
//! allocate / automatic storage → init → configure → release
//! ```
//!
//! Heap storage goes through a pluggable [`RawAllocator`], so allocation
//! failure is an ordinary [`NestboxError::AllocationFailure`] and leaks are
//! observable in tests.

pub mod alloc;
pub mod component;
pub mod report;
pub mod runtime;
pub mod util;

pub use alloc::{BudgetAllocator, HeapCell, RawAllocator, SharedAllocator, Slot, SystemAllocator};
pub use component::{Component, Composite, InitPolicy, Leaf, LeafRef, LifecycleStatus, Ownership};
pub use report::StatusLine;
pub use runtime::NestboxRuntime;
pub use runtime::options::NestboxOptions;

pub use nestbox_shared::{NestboxError, NestboxResult};
