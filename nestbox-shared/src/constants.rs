//! Shared constants
//!
//! These values must be identical for every consumer of a Leaf, including
//! callers on the C side of the SDK.

/// Leaf defaults applied by initialization
pub mod leaf {
    /// Integer field value after `init`.
    pub const DEFAULT_X: i32 = 0;

    /// Float field value after `init` and `init_with_x`.
    ///
    /// Deliberately non-zero so an initialized leaf is distinguishable
    /// from zero-state storage.
    pub const DEFAULT_Y: f32 = 1.0;
}

/// Environment variables read by `NestboxOptions::with_env`
pub mod envs {
    /// Use-before-init policy: "permissive" or "strict".
    pub const INIT_POLICY: &str = "NESTBOX_INIT_POLICY";

    /// Maximum number of live heap allocations.
    pub const ALLOCATION_BUDGET: &str = "NESTBOX_ALLOCATION_BUDGET";
}

/// Status line rendering
pub mod report {
    /// Rendered in place of the referenced leaf's field when it is absent.
    pub const ABSENT: &str = "(null)";
}
