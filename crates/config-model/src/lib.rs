//! AEBridge Config Model
//!
//! Defines the desired project state the upstream tool asks for:
//! - **Desired state:** main composition geometry, frame range, shot items
//! - **Output:** render output settings and the render-only job variant
//! - **Color:** upstream colorspace fields and their normalization
//!
//! Everything here is plain data plus validation; nothing touches the
//! project graph.

pub mod color;
pub mod desired;
pub mod error;
pub mod output;
pub mod paths;
pub mod render_job;

pub use color::*;
pub use desired::*;
pub use error::*;
pub use output::*;
pub use render_job::*;
