//! Clear-on-release storage slot.

use std::mem;

use super::HeapCell;
use super::cell::short_type_name;
use crate::component::{Component, LifecycleStatus};

/// The place a heap-allocated component handle lives.
///
/// Releasing a live slot frees the value and leaves the slot `Released`,
/// so a second release observes nothing to free. Every accessor on an
/// empty or released slot returns `None` instead of faulting.
#[derive(Debug)]
pub enum Slot<T> {
    /// Nothing was ever allocated here.
    Empty,
    /// Holds a live heap value.
    Live(HeapCell<T>),
    /// The value was released; terminal.
    Released,
}

impl<T> Slot<T> {
    pub fn get(&self) -> Option<&T> {
        match self {
            Slot::Live(cell) => Some(&**cell),
            _ => None,
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Slot::Live(cell) => Some(&mut **cell),
            _ => None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Slot::Live(_))
    }

    pub fn is_released(&self) -> bool {
        matches!(self, Slot::Released)
    }

    /// Free the held value, if any, and clear the slot.
    ///
    /// # Returns
    /// * `true` - a live value was freed
    /// * `false` - the slot was empty or already released; nothing happened
    pub fn release(&mut self) -> bool {
        match mem::replace(self, Slot::Released) {
            Slot::Live(cell) => {
                drop(cell);
                tracing::debug!(kind = short_type_name::<T>(), "Released slot");
                true
            }
            Slot::Empty => {
                *self = Slot::Empty;
                false
            }
            Slot::Released => {
                tracing::debug!(
                    kind = short_type_name::<T>(),
                    "Slot already released, nothing to free"
                );
                false
            }
        }
    }

    /// Move the handle out, leaving the slot empty (ownership transfer,
    /// not release).
    pub fn take(&mut self) -> Option<HeapCell<T>> {
        match mem::replace(self, Slot::Empty) {
            Slot::Live(cell) => Some(cell),
            Slot::Released => {
                *self = Slot::Released;
                None
            }
            Slot::Empty => None,
        }
    }
}

impl<T: Component> Slot<T> {
    /// Lifecycle status of whatever the slot holds.
    pub fn status(&self) -> LifecycleStatus {
        match self {
            Slot::Empty => LifecycleStatus::Unallocated,
            Slot::Live(cell) => cell.status(),
            Slot::Released => LifecycleStatus::Released,
        }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Empty
    }
}

impl<T> From<HeapCell<T>> for Slot<T> {
    fn from(cell: HeapCell<T>) -> Self {
        Slot::Live(cell)
    }
}
