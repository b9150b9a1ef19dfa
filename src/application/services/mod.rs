//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services are concrete structs, not traits; I/O stays behind the
//! infrastructure layer.

mod removal;

pub use removal::{DeviceNode, RemovalOutcome, RemovalReport, RemovalService, SummaryLine};
