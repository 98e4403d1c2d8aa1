//! Component lifecycle status and state machine.
//!
//! Leaf and Composite share the same shape:
//!
//! ```text
//! Unallocated ──allocate──▶ Uninitialized ──init──▶ Initialized ◀─┐
//!                               │                     │   mutate ─┘
//!                               └──────release────────┴──▶ Released
//! ```
//!
//! Automatic (stack) storage starts directly in `Uninitialized` and never
//! reaches `Released`; only heap slots can be released.

use std::str::FromStr;

use nestbox_shared::errors::{NestboxError, NestboxResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStatus {
    /// No storage exists yet.
    Unallocated,

    /// Storage exists (zero state) but init has not run.
    /// Configuration is discarded or refused in this state.
    #[default]
    Uninitialized,

    /// Init has run; configuration takes effect.
    Initialized,

    /// Storage has been returned. Terminal.
    Released,
}

impl LifecycleStatus {
    pub fn is_initialized(&self) -> bool {
        matches!(self, LifecycleStatus::Initialized)
    }

    /// Check if configuration mutators take effect in this state.
    pub fn can_configure(&self) -> bool {
        self.is_initialized()
    }

    /// Check if transition to target state is valid.
    pub fn can_transition_to(&self, target: LifecycleStatus) -> bool {
        use LifecycleStatus::*;
        matches!(
            (self, target),
            (Unallocated, Uninitialized) |
            (Uninitialized, Initialized) |
            // Re-init and configuration keep the component initialized
            (Initialized, Initialized) |
            (Uninitialized, Released) |
            (Initialized, Released)
        )
    }

    /// Validate and apply a transition.
    pub fn transition_to(&mut self, target: LifecycleStatus) -> NestboxResult<()> {
        if !self.can_transition_to(target) {
            return Err(NestboxError::InvalidState(format!(
                "Cannot transition from {} to {}",
                self, target
            )));
        }
        *self = target;
        Ok(())
    }

    /// Apply the init transition used by `Leaf` and `Composite`.
    ///
    /// Returns `false` (and leaves the status alone) when init is not
    /// allowed from the current state.
    pub(crate) fn mark_initialized(&mut self, kind: &str) -> bool {
        match self.transition_to(LifecycleStatus::Initialized) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(kind, "Ignoring init: {}", e);
                false
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStatus::Unallocated => "unallocated",
            LifecycleStatus::Uninitialized => "uninitialized",
            LifecycleStatus::Initialized => "initialized",
            LifecycleStatus::Released => "released",
        }
    }
}

impl std::fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a configuration mutator does when its target is not initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitPolicy {
    /// Discard the mutation and return `Ok(())`.
    #[default]
    Permissive,

    /// Return `NestboxError::UseBeforeInit`.
    Strict,
}

impl InitPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            InitPolicy::Permissive => "permissive",
            InitPolicy::Strict => "strict",
        }
    }

    /// Shared guard for every configuration mutator.
    ///
    /// # Returns
    /// * `Ok(true)` - the target is initialized, apply the mutation
    /// * `Ok(false)` - not initialized, permissive: skip silently
    /// * `Err(UseBeforeInit)` - not initialized, strict
    pub(crate) fn admit(
        &self,
        status: LifecycleStatus,
        kind: &str,
        op: &str,
    ) -> NestboxResult<bool> {
        if status.can_configure() {
            return Ok(true);
        }
        match self {
            InitPolicy::Permissive => {
                tracing::debug!(kind, op, %status, "Ignoring configuration before init");
                Ok(false)
            }
            InitPolicy::Strict => Err(NestboxError::UseBeforeInit(format!(
                "{}::{} called while {}",
                kind, op, status
            ))),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown init policy '{0}' (expected 'permissive' or 'strict')")]
pub struct ParsePolicyError(String);

impl FromStr for InitPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(InitPolicy::Permissive),
            "strict" => Ok(InitPolicy::Strict),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

impl std::fmt::Display for InitPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
