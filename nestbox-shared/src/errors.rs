//! Error types shared by every nestbox crate.
//!
//! Errors are categorized by who can fix them:
//! - [`NestboxError::AllocationFailure`]: the allocator refused (retry or abort gracefully)
//! - [`NestboxError::UseBeforeInit`], [`NestboxError::InvalidState`]: caller ordering bugs
//! - [`NestboxError::ForeignOwnership`]: caller tried to free storage it does not own
//! - [`NestboxError::InvalidArgument`], [`NestboxError::Config`]: bad input

use thiserror::Error;

/// Result alias used throughout nestbox.
pub type NestboxResult<T> = Result<T, NestboxError>;

#[derive(Debug, Error)]
pub enum NestboxError {
    /// The allocator could not provide storage.
    ///
    /// Any storage acquired earlier by the same construction has already
    /// been rolled back when this is returned.
    #[error("allocation failed: {0}")]
    AllocationFailure(String),

    /// A configuration mutator ran before initialization.
    ///
    /// Only reported under `InitPolicy::Strict`.
    #[error("use before init: {0}")]
    UseBeforeInit(String),

    /// Attempt to release a sub-component that was injected rather than owned.
    #[error("foreign ownership: {0}")]
    ForeignOwnership(String),

    /// Operation not valid in the current lifecycle state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Invalid argument (e.g. a NULL pointer from the C SDK).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid options.
    #[error("config: {0}")]
    Config(String),
}

impl NestboxError {
    /// Short, stable name of the variant, for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            NestboxError::AllocationFailure(_) => "allocation_failure",
            NestboxError::UseBeforeInit(_) => "use_before_init",
            NestboxError::ForeignOwnership(_) => "foreign_ownership",
            NestboxError::InvalidState(_) => "invalid_state",
            NestboxError::InvalidArgument(_) => "invalid_argument",
            NestboxError::Config(_) => "config",
        }
    }
}

impl From<serde_json::Error> for NestboxError {
    fn from(err: serde_json::Error) -> Self {
        NestboxError::Config(format!("invalid JSON: {}", err))
    }
}
