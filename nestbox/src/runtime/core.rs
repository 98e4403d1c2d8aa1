//! Allocation entry point for components.

use std::sync::Arc;

use nestbox_shared::errors::NestboxResult;

use super::options::NestboxOptions;
use crate::alloc::{BudgetAllocator, HeapCell, SharedAllocator, SystemAllocator};
use crate::component::{Composite, Leaf};

/// Bundles options with the allocator that backs every heap component.
///
/// Components created through a runtime inherit its init policy. Cloning a
/// runtime shares the allocator (and therefore any allocation budget).
#[derive(Debug, Clone)]
pub struct NestboxRuntime {
    options: NestboxOptions,
    allocator: SharedAllocator,
}

impl NestboxRuntime {
    /// Runtime on the process heap, capped by `options.allocation_budget`.
    pub fn new(options: NestboxOptions) -> Self {
        Self::with_allocator(options, SystemAllocator::shared())
    }

    /// Runtime on a caller-supplied allocator (still capped by the budget).
    pub fn with_allocator(options: NestboxOptions, allocator: SharedAllocator) -> Self {
        let allocator = match options.allocation_budget {
            Some(budget) => {
                tracing::debug!(budget, "Capping live allocations");
                Arc::new(BudgetAllocator::new(allocator, budget)) as SharedAllocator
            }
            None => allocator,
        };
        Self { options, allocator }
    }

    pub fn options(&self) -> &NestboxOptions {
        &self.options
    }

    pub fn allocator(&self) -> &SharedAllocator {
        &self.allocator
    }

    /// Zero-state leaf for automatic storage.
    pub fn leaf(&self) -> Leaf {
        Leaf::with_policy(self.options.init_policy)
    }

    /// Zero-state composite for automatic storage, no referenced leaf.
    pub fn composite<'a>(&self) -> Composite<'a> {
        Composite::with_policy(self.options.init_policy)
    }

    /// Heap leaf in zero state.
    pub fn allocate_leaf(&self) -> NestboxResult<HeapCell<Leaf>> {
        Leaf::allocate_in(self.allocator.clone(), self.options.init_policy)
    }

    /// Heap composite plus its owned referenced leaf, neither initialized.
    pub fn allocate_composite<'a>(&self) -> NestboxResult<HeapCell<Composite<'a>>> {
        Composite::allocate_in(self.allocator.clone(), self.options.init_policy)
    }

    /// Heap composite without a referenced leaf, for injection.
    pub fn allocate_detached_composite<'a>(&self) -> NestboxResult<HeapCell<Composite<'a>>> {
        Composite::allocate_detached_in(self.allocator.clone(), self.options.init_policy)
    }
}

impl Default for NestboxRuntime {
    fn default() -> Self {
        Self::new(NestboxOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{InitPolicy, Ownership};
    use nestbox_shared::NestboxError;

    #[test]
    fn test_components_inherit_policy() {
        let runtime = NestboxRuntime::new(NestboxOptions {
            init_policy: InitPolicy::Strict,
            ..Default::default()
        });
        assert_eq!(runtime.leaf().policy(), InitPolicy::Strict);
        assert_eq!(runtime.composite().policy(), InitPolicy::Strict);
        assert_eq!(runtime.allocate_leaf().unwrap().policy(), InitPolicy::Strict);

        let composite = runtime.allocate_composite().unwrap();
        assert_eq!(composite.policy(), InitPolicy::Strict);
        assert_eq!(composite.referenced().unwrap().policy(), InitPolicy::Strict);
    }

    #[test]
    fn test_detached_composite_has_no_reference() {
        let runtime = NestboxRuntime::default();
        let composite = runtime.allocate_detached_composite().unwrap();
        assert_eq!(composite.ownership(), None);

        let composite = runtime.allocate_composite().unwrap();
        assert_eq!(composite.ownership(), Some(Ownership::Owned));
    }

    #[test]
    fn test_budget_applies_to_allocations() {
        let runtime = NestboxRuntime::new(NestboxOptions {
            allocation_budget: Some(1),
            ..Default::default()
        });

        let leaf = runtime.allocate_leaf().unwrap();
        let err = runtime.allocate_leaf().unwrap_err();
        assert!(matches!(err, NestboxError::AllocationFailure(_)));

        drop(leaf);
        assert!(runtime.allocate_leaf().is_ok());
    }

    #[test]
    fn test_budget_too_small_for_composite() {
        let runtime = NestboxRuntime::new(NestboxOptions {
            allocation_budget: Some(1),
            ..Default::default()
        });
        assert!(runtime.allocate_composite().is_err());
        // The composite's own storage was rolled back
        assert!(runtime.allocate_leaf().is_ok());
    }
}
