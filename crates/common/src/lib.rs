//! AEBridge Common Utilities
//!
//! Shared infrastructure for all AEBridge crates:
//! - Error types and result aliases
//! - Run clock, progress throttle, and inactivity watchdog
//! - Tracing/logging initialization
//! - Configuration loading
//! - Success/error status files

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod sentinel;

pub use clock::*;
pub use config::*;
pub use error::*;
