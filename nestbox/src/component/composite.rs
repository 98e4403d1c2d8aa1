//! Composite component: one inline leaf plus one referenced leaf.
//!
//! Storage strategies covered:
//!
//! | composite | referenced leaf | constructed with |
//! |-----------|-----------------|------------------|
//! | heap      | heap, owned     | `Composite::allocate_in` |
//! | heap      | injected        | `Composite::allocate_detached_in` + `init_with_leaf` |
//! | automatic | injected        | `Composite::new` + `init_with_leaf` |
//! | automatic | heap, owned     | `Composite::new` + `adopt` (mixed) |
//!
//! An owned referenced leaf is freed with the composite. An injected one is
//! a `&mut` borrow, so the composite cannot free it: the type system keeps
//! external ownership intact, and an explicit attempt through
//! [`Composite::release_referenced`] is reported as `ForeignOwnership`.

use std::mem;

use nestbox_shared::errors::{NestboxError, NestboxResult};
use serde::{Deserialize, Serialize};

use super::{Component, InitPolicy, Leaf, LifecycleStatus};
use crate::alloc::{HeapCell, SharedAllocator, Slot};
use crate::report::StatusLine;

const KIND: &str = "Composite";

/// Who is responsible for freeing the referenced leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ownership {
    /// Allocated by (or handed to) the composite; freed with it.
    Owned,
    /// Injected by the caller; never freed by the composite.
    Borrowed,
}

/// The composite's reference to its second leaf.
#[derive(Debug, Default)]
pub enum LeafRef<'a> {
    #[default]
    Absent,
    Owned(HeapCell<Leaf>),
    Borrowed(&'a mut Leaf),
}

impl LeafRef<'_> {
    pub fn get(&self) -> Option<&Leaf> {
        match self {
            LeafRef::Absent => None,
            LeafRef::Owned(cell) => Some(&**cell),
            LeafRef::Borrowed(leaf) => Some(&**leaf),
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut Leaf> {
        match self {
            LeafRef::Absent => None,
            LeafRef::Owned(cell) => Some(&mut **cell),
            LeafRef::Borrowed(leaf) => Some(&mut **leaf),
        }
    }

    pub fn ownership(&self) -> Option<Ownership> {
        match self {
            LeafRef::Absent => None,
            LeafRef::Owned(_) => Some(Ownership::Owned),
            LeafRef::Borrowed(_) => Some(Ownership::Borrowed),
        }
    }
}

/// Top-level component.
#[derive(Debug, Default)]
pub struct Composite<'a> {
    status: LifecycleStatus,
    policy: InitPolicy,
    inline: Leaf,
    referenced: LeafRef<'a>,
}

impl<'a> Composite<'a> {
    /// Zero-state composite for automatic storage. No referenced leaf.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: InitPolicy) -> Self {
        Self {
            policy,
            inline: Leaf::with_policy(policy),
            ..Self::default()
        }
    }

    /// Allocate a composite and, eagerly, its owned referenced leaf.
    ///
    /// Neither is initialized. The composite's storage is acquired first;
    /// if the leaf allocation then fails, that storage is released before
    /// the error is returned, so a failed call leaves nothing allocated.
    pub fn allocate_in(
        allocator: SharedAllocator,
        policy: InitPolicy,
    ) -> NestboxResult<HeapCell<Composite<'a>>> {
        let mut composite = Self::allocate_detached_in(allocator.clone(), policy)?;

        match Leaf::allocate_in(allocator, policy) {
            Ok(leaf) => {
                composite.referenced = LeafRef::Owned(leaf);
                tracing::debug!(%policy, "Allocated composite with owned leaf");
                Ok(composite)
            }
            Err(e) => {
                tracing::warn!("Referenced leaf allocation failed, rolling back composite: {}", e);
                drop(composite);
                Err(e)
            }
        }
    }

    /// Allocate a composite with no referenced leaf, ready for injection.
    pub fn allocate_detached_in(
        allocator: SharedAllocator,
        policy: InitPolicy,
    ) -> NestboxResult<HeapCell<Composite<'a>>> {
        HeapCell::new_in(Self::with_policy(policy), allocator)
    }

    /// Release a heap composite held in `slot`.
    ///
    /// Frees the owned referenced leaf, then the composite storage, and
    /// clears the slot. An injected leaf is left to its owner. Returns
    /// `false` if the slot held nothing (including a second release).
    pub fn release(slot: &mut Slot<Composite<'a>>) -> bool {
        if let Some(composite) = slot.get_mut() {
            composite.drop_reference();
        }
        slot.release()
    }

    /// Initialize the inline leaf and, if owned, the referenced leaf.
    ///
    /// An injected leaf is the injector's to initialize and is not touched.
    pub fn init(&mut self) {
        if !self.status.mark_initialized(KIND) {
            return;
        }
        self.inline.init();
        if let LeafRef::Owned(leaf) = &mut self.referenced {
            leaf.init();
        }
    }

    /// Inject an externally owned leaf and initialize the composite.
    ///
    /// The injected leaf is stored as-is; it is expected to be initialized
    /// (and may be configured) by its owner.
    pub fn init_with_leaf(&mut self, leaf: &'a mut Leaf) -> NestboxResult<()> {
        self.inject(leaf)?;
        if self.status.mark_initialized(KIND) {
            self.inline.init();
        }
        Ok(())
    }

    /// Store an externally owned leaf without initializing anything.
    pub fn inject(&mut self, leaf: &'a mut Leaf) -> NestboxResult<()> {
        self.ensure_vacant("inject")?;
        self.referenced = LeafRef::Borrowed(leaf);
        Ok(())
    }

    /// Take ownership of a heap leaf out of `slot` (mixed allocation).
    ///
    /// On error the leaf stays in the caller's slot.
    pub fn adopt(&mut self, slot: &mut Slot<Leaf>) -> NestboxResult<()> {
        self.ensure_vacant("adopt")?;
        let leaf = slot
            .take()
            .ok_or_else(|| NestboxError::InvalidArgument("adopt from an empty slot".into()))?;
        self.referenced = LeafRef::Owned(leaf);
        Ok(())
    }

    /// Whether configuration takes effect now, under this composite's policy.
    ///
    /// # Returns
    /// * `Ok(true)` - initialized
    /// * `Ok(false)` - not initialized, permissive
    /// * `Err(UseBeforeInit)` - not initialized, strict
    pub fn admit_configuration(&self, op: &str) -> NestboxResult<bool> {
        self.policy.admit(self.status, KIND, op)
    }

    pub fn set_inline_x(&mut self, x: i32) -> NestboxResult<()> {
        if self.admit_configuration("set_inline_x")? {
            self.inline.set_x(x)?;
        }
        Ok(())
    }

    /// No-op when there is no referenced leaf.
    pub fn set_referenced_x(&mut self, x: i32) -> NestboxResult<()> {
        if !self.admit_configuration("set_referenced_x")? {
            return Ok(());
        }
        match self.referenced.get_mut() {
            Some(leaf) => leaf.set_x(x),
            None => {
                tracing::debug!("No referenced leaf, ignoring set_referenced_x");
                Ok(())
            }
        }
    }

    /// Free an owned referenced leaf and clear the reference.
    ///
    /// # Returns
    /// * `Ok(true)` - an owned leaf was freed
    /// * `Ok(false)` - there was no referenced leaf
    /// * `Err(ForeignOwnership)` - the leaf was injected; it is left in place
    pub fn release_referenced(&mut self) -> NestboxResult<bool> {
        match &self.referenced {
            LeafRef::Absent => Ok(false),
            LeafRef::Borrowed(_) => Err(NestboxError::ForeignOwnership(
                "referenced leaf was injected and belongs to its injector".into(),
            )),
            LeafRef::Owned(_) => {
                self.drop_reference();
                Ok(true)
            }
        }
    }

    pub fn inline(&self) -> &Leaf {
        &self.inline
    }

    pub fn referenced(&self) -> Option<&Leaf> {
        self.referenced.get()
    }

    /// The referenced leaf for configuration beyond `x`, such as `y` of an
    /// injected leaf. The leaf's own policy guards its setters.
    pub fn referenced_mut(&mut self) -> Option<&mut Leaf> {
        self.referenced.get_mut()
    }

    pub fn leaf_ref(&self) -> &LeafRef<'a> {
        &self.referenced
    }

    pub fn ownership(&self) -> Option<Ownership> {
        self.referenced.ownership()
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

    /// Snapshot for the demonstration output.
    pub fn status_line(&self, label: impl Into<String>) -> StatusLine {
        StatusLine::new(label, self.inline.x(), self.referenced().map(Leaf::x))
    }

    fn ensure_vacant(&self, op: &str) -> NestboxResult<()> {
        match self.referenced.ownership() {
            None => Ok(()),
            Some(ownership) => Err(NestboxError::InvalidState(format!(
                "{}::{}: referenced leaf already present ({:?})",
                KIND, op, ownership
            ))),
        }
    }

    fn drop_reference(&mut self) {
        match mem::take(&mut self.referenced) {
            LeafRef::Absent => {}
            LeafRef::Owned(leaf) => {
                drop(leaf);
                tracing::debug!("Released owned referenced leaf");
            }
            LeafRef::Borrowed(_) => {
                tracing::debug!("Detached injected leaf, owner keeps it");
            }
        }
    }
}

impl Component for Composite<'_> {
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
    use crate::alloc::SystemAllocator;

    fn heap_composite<'a>() -> HeapCell<Composite<'a>> {
        Composite::allocate_in(SystemAllocator::shared(), InitPolicy::Permissive).unwrap()
    }

    #[test]
    fn test_new_has_no_reference() {
        let composite = Composite::new();
        assert_eq!(composite.status(), LifecycleStatus::Uninitialized);
        assert!(composite.referenced().is_none());
        assert_eq!(composite.ownership(), None);
        assert_eq!(composite.inline().x(), 0);
    }

    #[test]
    fn test_allocate_owns_uninitialized_leaf() {
        let composite = heap_composite();
        assert_eq!(composite.ownership(), Some(Ownership::Owned));
        assert!(!composite.referenced().unwrap().is_initialized());
        assert!(!composite.inline().is_initialized());
        assert!(!composite.is_initialized());
    }

    #[test]
    fn test_init_cascades_to_owned_leaf() {
        let mut composite = heap_composite();
        composite.init();
        assert!(composite.is_initialized());
        assert!(composite.inline().is_initialized());
        assert!(composite.referenced().unwrap().is_initialized());
        assert_eq!(composite.referenced().unwrap().y(), 1.0);
    }

    #[test]
    fn test_setters_after_init() {
        let mut composite = heap_composite();
        composite.init();
        composite.set_inline_x(17).unwrap();
        composite.set_referenced_x(42).unwrap();
        assert_eq!(composite.inline().x(), 17);
        assert_eq!(composite.referenced().unwrap().x(), 42);
    }

    #[test]
    fn test_setters_before_init_are_discarded() {
        let mut composite = heap_composite();
        composite.set_inline_x(17).unwrap();
        composite.set_referenced_x(42).unwrap();
        assert_eq!(composite.inline().x(), 0);
        assert_eq!(composite.referenced().unwrap().x(), 0);
    }

    #[test]
    fn test_strict_setter_before_init_fails() {
        let mut composite = Composite::with_policy(InitPolicy::Strict);
        let err = composite.set_inline_x(1).unwrap_err();
        assert!(matches!(err, NestboxError::UseBeforeInit(_)));
        assert_eq!(composite.inline().policy(), InitPolicy::Strict);
    }

    #[test]
    fn test_set_referenced_without_reference_is_noop() {
        let mut composite = Composite::with_policy(InitPolicy::Strict);
        composite.init();
        composite.set_referenced_x(42).unwrap();
        assert!(composite.referenced().is_none());
    }

    #[test]
    fn test_init_does_not_touch_injected_leaf() {
        let mut leaf = Leaf::new();
        let mut composite = Composite::new();
        composite.inject(&mut leaf).unwrap();
        composite.init();
        assert!(composite.is_initialized());
        assert!(!composite.referenced().unwrap().is_initialized());
    }

    #[test]
    fn test_init_with_leaf_keeps_injected_configuration() {
        let mut leaf = Leaf::new();
        leaf.init_with_x(42);

        let mut composite = Composite::new();
        composite.init_with_leaf(&mut leaf).unwrap();
        composite.set_inline_x(18).unwrap();

        assert_eq!(composite.ownership(), Some(Ownership::Borrowed));
        assert_eq!(composite.referenced().unwrap().x(), 42);
        assert_eq!(composite.inline().x(), 18);
    }

    #[test]
    fn test_inject_into_occupied_reference_fails() {
        let mut leaf = Leaf::new();
        let mut composite = heap_composite();
        let err = composite.inject(&mut leaf).unwrap_err();
        assert!(matches!(err, NestboxError::InvalidState(_)));
        assert_eq!(composite.ownership(), Some(Ownership::Owned));
    }

    #[test]
    fn test_configure_injected_leaf_after_injection() {
        let mut leaf = Leaf::new();
        leaf.init();

        let mut composite = Composite::new();
        composite.init_with_leaf(&mut leaf).unwrap();
        composite.referenced_mut().unwrap().set_y(2.0).unwrap();
        composite.set_referenced_x(42).unwrap();
        drop(composite);

        assert_eq!(leaf.x(), 42);
        assert_eq!(leaf.y(), 2.0);
    }

    #[test]
    fn test_admit_configuration_follows_policy() {
        let mut composite = Composite::with_policy(InitPolicy::Strict);
        assert!(composite.admit_configuration("set_inline_x").is_err());
        composite.init();
        assert!(composite.admit_configuration("set_inline_x").unwrap());

        assert!(!Composite::new().admit_configuration("set_inline_x").unwrap());
    }

    #[test]
    fn test_reinit_keeps_composite_initialized() {
        let mut composite = heap_composite();
        composite.init();
        composite.set_inline_x(5).unwrap();
        composite.init();
        assert_eq!(composite.status(), LifecycleStatus::Initialized);
        assert_eq!(composite.inline().x(), 0);
    }

    #[test]
    fn test_adopt_moves_leaf_out_of_slot() {
        let cell = HeapCell::new_in(Leaf::new(), SystemAllocator::shared()).unwrap();
        let mut slot = Slot::from(cell);

        let mut composite = Composite::new();
        composite.adopt(&mut slot).unwrap();
        assert!(matches!(slot, Slot::Empty));
        assert_eq!(composite.ownership(), Some(Ownership::Owned));
    }

    #[test]
    fn test_adopt_failure_keeps_leaf_in_slot() {
        let cell = HeapCell::new_in(Leaf::new(), SystemAllocator::shared()).unwrap();
        let mut slot = Slot::from(cell);

        let mut composite = heap_composite();
        assert!(composite.adopt(&mut slot).is_err());
        assert!(slot.is_live());
    }

    #[test]
    fn test_adopt_from_empty_slot_fails() {
        let mut slot: Slot<Leaf> = Slot::Empty;
        let mut composite = Composite::new();
        let err = composite.adopt(&mut slot).unwrap_err();
        assert!(matches!(err, NestboxError::InvalidArgument(_)));
    }

    #[test]
    fn test_release_referenced_owned() {
        let mut composite = heap_composite();
        assert!(composite.release_referenced().unwrap());
        assert!(composite.referenced().is_none());
        assert!(!composite.release_referenced().unwrap());
    }

    #[test]
    fn test_release_referenced_borrowed_is_foreign() {
        let mut leaf = Leaf::new();
        leaf.init_with_x(3);
        let mut composite = Composite::new();
        composite.init_with_leaf(&mut leaf).unwrap();

        let err = composite.release_referenced().unwrap_err();
        assert!(matches!(err, NestboxError::ForeignOwnership(_)));
        assert_eq!(composite.ownership(), Some(Ownership::Borrowed));
        drop(composite);
        assert_eq!(leaf.x(), 3);
    }

    #[test]
    fn test_release_slot_is_idempotent() {
        let mut slot = Slot::from(heap_composite());
        assert!(Composite::release(&mut slot));
        assert!(!Composite::release(&mut slot));
        assert_eq!(slot.status(), LifecycleStatus::Released);
    }

    #[test]
    fn test_status_line() {
        let mut composite = heap_composite();
        composite.init();
        composite.set_inline_x(17).unwrap();
        composite.set_referenced_x(42).unwrap();
        assert_eq!(
            composite.status_line("b1").to_string(),
            "b1: a0.x 17, a1->x 42"
        );
    }
}
