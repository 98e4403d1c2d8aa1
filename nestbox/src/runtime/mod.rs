//! Runtime: options plus the allocator every heap component comes from.

mod core;
pub mod options;

pub use core::NestboxRuntime;
