//! AEBridge Render Engine
//!
//! Configures a render item's output module and drives the host's render
//! call. No pixels are produced here; the host does the rendering.
//!
//! # Pipeline
//!
//! ```text
//! output_path ──► destination (PNG sequence, [#####] token)
//!                        │
//! composition ──► render item ──► output module
//!                                   │  template | fallback template | forced format
//!                                   │  channels / depth / color / quality
//!                                   │  numbering start
//!                                   │  destination file (last)
//!                                   ▼
//!                                 render ──► dequeue
//! ```

pub mod destination;
pub mod output;
pub mod render;

pub use destination::sequence_destination;
pub use output::*;
pub use render::*;
