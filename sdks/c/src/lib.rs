//! C SDK for Nestbox
//!
//! This crate provides C FFI bindings for Nestbox leaves and composites,
//! building the C shared library and static library artifacts.

pub mod ffi;

// Re-export all FFI symbols
pub use ffi::*;
