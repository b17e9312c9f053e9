//! AEBridge Reconcile Core
//!
//! Converges a host project graph onto a [`DesiredState`]:
//! - **Compositions:** find-or-create by name, sync geometry and timing
//! - **Footage:** reuse by path, swap in place by name, or import
//! - **Layers:** one source layer per shot child composition, retimed every run
//! - **Color:** project color workflow, best-effort across fallback tiers
//! - **Orchestration:** the run loop with progress, cancellation and timeout
//!
//! Every step is idempotent; running the same state twice leaves the graph
//! exactly as a single run would.
//!
//! [`DesiredState`]: aebridge_config_model::DesiredState

pub mod color;
pub mod composition;
pub mod footage;
pub mod layer;
pub mod names;
pub mod orchestrator;
pub mod progress;

pub use color::{ColorOutcome, ColorPolicy, ColorTier};
pub use composition::{CompositionSync, CompositionSynchronizer, CompositionTarget};
pub use footage::{FootageResolver, MediaBinding, Resolution};
pub use layer::{ItemOutcome, ItemStatus, LayerReconciler};
pub use names::ReservedNames;
pub use orchestrator::{Orchestrator, RunReport};
pub use progress::{ProgressSink, ProgressUpdate, RunContext, RunState, TracingSink};
