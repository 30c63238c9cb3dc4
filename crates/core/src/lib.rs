//! `miniauth-core` — shared building blocks for the access gate.
//!
//! This crate contains no HTTP, storage or crypto concerns.

pub mod error;
pub mod id;

pub use error::{GateError, GateResult};
pub use id::{new_id, new_password};
