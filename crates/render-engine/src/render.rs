//! Render invocation.

use std::path::Path;

use aebridge_common::error::{BridgeError, BridgeResult};
use aebridge_config_model::{OutputSpec, RenderJob};
use aebridge_host_graph::{CompId, HostGraph, HostGraphExt};
use serde::Serialize;

use crate::destination::sequence_destination;
use crate::output::{OutputConfigurer, OutputOutcome};

/// A finished render.
#[derive(Debug, Clone, Serialize)]
pub struct RenderOutcome {
    /// Destination as handed to the host.
    pub destination: String,
    pub output: OutputOutcome,
}

/// Queue `comp`, configure its output module, render it and dequeue it.
///
/// Every call uses its own render item; the item is removed afterwards
/// whether or not the render succeeded.
pub fn render_composition(
    host: &mut dyn HostGraph,
    comp: CompId,
    output_path: &str,
    spec: &OutputSpec,
    numbering_start: i64,
) -> BridgeResult<RenderOutcome> {
    let destination = sequence_destination(output_path);
    tracing::info!(%comp, destination = %destination, "Starting render");

    if let Some(parent) = Path::new(&destination).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let item = host
        .add_render_item(comp)
        .map_err(|e| BridgeError::render(format!("Failed to queue composition: {e}")))?;

    let output = OutputConfigurer::new(spec, numbering_start).configure(host, item, &destination);
    if !output.success {
        let _ = host.remove_render_item(item);
        return Err(BridgeError::output(format!(
            "Could not establish an output format for {destination}"
        )));
    }

    let rendered = host.render(item);
    if let Err(e) = host.remove_render_item(item) {
        tracing::debug!(%item, error = %e, "Render item already gone");
    }
    rendered.map_err(|e| BridgeError::render(format!("Render failed: {e}")))?;

    tracing::info!(destination = %destination, route = ?output.route, "Render complete");
    Ok(RenderOutcome {
        destination,
        output,
    })
}

/// Open an existing project and render one named composition.
pub fn render_only(host: &mut dyn HostGraph, job: &RenderJob) -> BridgeResult<RenderOutcome> {
    host.open_project(Path::new(&job.project_path))
        .map_err(|e| BridgeError::graph(format!("Failed to open project: {e}")))?;

    let comp = host.find_composition(&job.comp_name).ok_or_else(|| {
        BridgeError::graph(format!("Composition '{}' not found", job.comp_name))
    })?;

    render_composition(
        host,
        comp,
        &job.output_path,
        &job.output_settings,
        job.global_first,
    )
}
