//! Nestbox Shared - Types common to the core library and its SDKs
//!
//! This crate contains the error taxonomy and the constants that the
//! core library, the CLI and the C SDK must agree on.

pub mod constants;
pub mod errors;

pub use errors::{NestboxError, NestboxResult};
