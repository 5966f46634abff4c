//! Shared plumbing for the `cannon` binary.

pub mod env;
pub mod tracing;
