//! # AEBridge Host Graph
//!
//! The project-graph surface the reconciler reads and writes.
//!
//! ## Modules
//!
//! - `node` - Typed handles (compositions, media, layers, render items) and snapshots
//! - `contract` - The [`HostGraph`] trait and host errors
//! - `apply` - Guarded writes with an ordered outcome log
//! - `sequence` - Numbered frame paths and host-generated sequence names
//! - `memory` - A file-backed in-memory host

pub mod apply;
pub mod contract;
pub mod memory;
pub mod node;
pub mod sequence;

pub use apply::{ApplyOutcome, FieldEntry, FieldLog};
pub use contract::{HostError, HostGraph, HostGraphExt, HostResult};
pub use memory::{Capability, HostOptions, MemoryHost, OutputTemplate};
pub use node::*;
