//! Pooled, profiled and transactional access to relational databases.
//!
//! Drivers live in their own crates (`tether-mysql`), this crate re-exports the core.
pub use tether_core::*;
