//! Domain layer: registry records and cascade logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod cascade;
pub mod closure;
pub mod entities;
pub mod error;
pub mod index;
pub mod store;

pub use cascade::CascadePlan;
pub use closure::{device_closure, walk_descendants, VisitedDevice};
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use index::{CrossReferenceIndex, SharedConfigEntry};
pub use store::{RecordStore, Registries};
