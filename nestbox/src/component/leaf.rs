//! Leaf sub-component.

use nestbox_shared::constants::leaf as defaults;
use nestbox_shared::errors::NestboxResult;

use super::{Component, InitPolicy, LifecycleStatus};
use crate::alloc::{HeapCell, SharedAllocator};

const KIND: &str = "Leaf";

/// Minimal sub-component with explicit initialization state.
///
/// A fresh leaf (automatic or heap) is in zero state: `x == 0`,
/// `y == 0.0`, uninitialized. Configuration only takes effect after
/// [`Leaf::init`] or [`Leaf::init_with_x`]; before that it is discarded
/// (permissive policy) or refused (strict policy).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Leaf {
    status: LifecycleStatus,
    policy: InitPolicy,
    x: i32,
    y: f32,
}

impl Leaf {
    /// Zero-state leaf with the permissive policy.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: InitPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Allocate a zero-state leaf on the heap.
    ///
    /// Fails with `AllocationFailure` if `allocator` cannot provide storage.
    pub fn allocate_in(
        allocator: SharedAllocator,
        policy: InitPolicy,
    ) -> NestboxResult<HeapCell<Leaf>> {
        HeapCell::new_in(Self::with_policy(policy), allocator)
    }

    /// Initialize with default values (`x = 0`, `y = 1.0`).
    pub fn init(&mut self) {
        self.init_with_x(defaults::DEFAULT_X);
    }

    /// Initialize with a caller-supplied `x`; `y` still takes its default.
    ///
    /// Re-initializing an initialized leaf resets both fields.
    pub fn init_with_x(&mut self, x: i32) {
        if !self.status.mark_initialized(KIND) {
            return;
        }
        self.x = x;
        self.y = defaults::DEFAULT_Y;
        tracing::trace!(x, "Initialized leaf");
    }

    pub fn set_x(&mut self, x: i32) -> NestboxResult<()> {
        if self.policy.admit(self.status, KIND, "set_x")? {
            self.x = x;
        }
        Ok(())
    }

    pub fn set_y(&mut self, y: f32) -> NestboxResult<()> {
        if self.policy.admit(self.status, KIND, "set_y")? {
            self.y = y;
        }
        Ok(())
    }

    /// Set both fields at once; either both change or neither does.
    pub fn set_x_y(&mut self, x: i32, y: f32) -> NestboxResult<()> {
        if self.policy.admit(self.status, KIND, "set_x_y")? {
            self.x = x;
            self.y = y;
        }
        Ok(())
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn status(&self) -> LifecycleStatus {
        self.status
    }

    pub fn policy(&self) -> InitPolicy {
        self.policy
    }

    pub fn is_initialized(&self) -> bool {
        self.status.is_initialized()
    }
}

impl Component for Leaf {
    fn status(&self) -> LifecycleStatus {
        self.status
    }

    fn policy(&self) -> InitPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nestbox_shared::NestboxError;

    #[test]
    fn test_new_is_zero_state() {
        let leaf = Leaf::new();
        assert_eq!(leaf.x(), 0);
        assert_eq!(leaf.y(), 0.0);
        assert_eq!(leaf.status(), LifecycleStatus::Uninitialized);
        assert_eq!(leaf.policy(), InitPolicy::Permissive);
    }

    #[test]
    fn test_allocate_in_is_zero_state() {
        let cell =
            Leaf::allocate_in(crate::SystemAllocator::shared(), InitPolicy::Strict).unwrap();
        assert_eq!(*cell, Leaf::with_policy(InitPolicy::Strict));
    }

    #[test]
    fn test_init_sets_defaults() {
        let mut leaf = Leaf::new();
        leaf.init();
        assert!(leaf.is_initialized());
        assert_eq!(leaf.x(), 0);
        assert_eq!(leaf.y(), 1.0);
    }

    #[test]
    fn test_init_with_x() {
        let mut leaf = Leaf::new();
        leaf.init_with_x(42);
        assert!(leaf.is_initialized());
        assert_eq!(leaf.x(), 42);
        assert_eq!(leaf.y(), 1.0);
    }

    #[test]
    fn test_setters_after_init() {
        let mut leaf = Leaf::new();
        leaf.init();

        leaf.set_x(5).unwrap();
        assert_eq!(leaf.x(), 5);

        leaf.set_y(2.5).unwrap();
        assert_eq!(leaf.y(), 2.5);

        leaf.set_x_y(-3, 0.25).unwrap();
        assert_eq!(leaf.x(), -3);
        assert_eq!(leaf.y(), 0.25);
    }

    #[test]
    fn test_setters_before_init_are_discarded() {
        let mut leaf = Leaf::new();
        leaf.set_x(5).unwrap();
        leaf.set_y(2.5).unwrap();
        leaf.set_x_y(7, 3.5).unwrap();

        assert_eq!(leaf, Leaf::new());
    }

    #[test]
    fn test_strict_setters_before_init_fail() {
        let mut leaf = Leaf::with_policy(InitPolicy::Strict);

        let err = leaf.set_x(5).unwrap_err();
        assert!(matches!(err, NestboxError::UseBeforeInit(_)));
        assert!(leaf.set_y(1.5).is_err());
        assert!(leaf.set_x_y(1, 1.5).is_err());
        assert_eq!(leaf.x(), 0);
        assert_eq!(leaf.y(), 0.0);

        leaf.init();
        leaf.set_x(5).unwrap();
        assert_eq!(leaf.x(), 5);
    }

    #[test]
    fn test_reinit_resets_fields() {
        let mut leaf = Leaf::new();
        leaf.init_with_x(9);
        leaf.set_y(4.0).unwrap();
        leaf.init();
        assert_eq!(leaf.x(), 0);
        assert_eq!(leaf.y(), 1.0);
    }
}
