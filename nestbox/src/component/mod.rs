//! Components: the Leaf sub-component and the Composite that nests it.

mod composite;
mod leaf;
mod state;

pub use composite::{Composite, LeafRef, Ownership};
pub use leaf::Leaf;
pub use state::{InitPolicy, LifecycleStatus, ParsePolicyError};

/// Common surface of anything that lives in a [`Slot`](crate::Slot).
pub trait Component {
    /// Current lifecycle status.
    fn status(&self) -> LifecycleStatus;

    /// Policy applied to configuration before init.
    fn policy(&self) -> InitPolicy;

    fn is_initialized(&self) -> bool {
        self.status().is_initialized()
    }
}
