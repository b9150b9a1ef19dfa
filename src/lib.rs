//! Remove a device and everything depending on it from Home Assistant's
//! `.storage` registries.
//!
//! Layers, innermost first:
//! - [`domain`]: registry records, indexes and the removal cascade (pure)
//! - [`application`]: the removal service
//! - [`infrastructure`]: registry persistence and wiring
//! - [`cli`]: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
