//! Application layer: services and use cases
//!
//! This layer orchestrates domain logic. It performs no I/O.

pub mod error;
pub mod services;

pub use error::{ApplicationError, ApplicationResult};
