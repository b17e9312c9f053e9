//! One reconciliation run from config to saved (and optionally rendered) project.

use std::path::Path;

use aebridge_common::config::RunSettings;
use aebridge_common::error::{BridgeError, BridgeResult};
use aebridge_config_model::DesiredState;
use aebridge_host_graph::HostGraph;
use aebridge_render_engine::{render_composition, RenderOutcome};
use serde::Serialize;

use crate::color::{ColorOutcome, ColorPolicy};
use crate::composition::{CompositionSync, CompositionSynchronizer, CompositionTarget};
use crate::layer::{ItemOutcome, ItemStatus, LayerReconciler};
use crate::names::ReservedNames;
use crate::progress::{RunContext, RunState};

/// Label of the undo group wrapping a whole run.
pub const UNDO_LABEL: &str = "AEBridge Sync";

/// Everything a finished run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub state: RunState,
    pub project_path: String,
    /// The project did not exist and was started empty.
    pub project_created: bool,
    pub color: ColorOutcome,
    pub main: CompositionSync,
    pub items: Vec<ItemOutcome>,
    pub cache_releases: usize,
    pub render: Option<RenderOutcome>,
    pub elapsed_secs: f64,
}

impl RunReport {
    pub fn count(&self, status: ItemStatus) -> usize {
        self.items.iter().filter(|i| i.status == status).count()
    }
}

/// Drives a run: color policy, main composition, items, save, render.
#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    names: ReservedNames,
    settings: RunSettings,
}

impl Orchestrator {
    pub fn new(settings: RunSettings) -> Self {
        Self {
            names: ReservedNames::default(),
            settings,
        }
    }

    pub fn with_names(mut self, names: ReservedNames) -> Self {
        self.names = names;
        self
    }

    /// Load the config at `config_path` and run it.
    pub fn run_file(
        &self,
        host: &mut dyn HostGraph,
        config_path: &Path,
        ctx: &mut RunContext,
    ) -> BridgeResult<RunReport> {
        ctx.start("Loading configuration");
        match DesiredState::load(config_path) {
            Ok(state) => self.execute(host, &state, ctx),
            Err(e) => {
                let result = Err(BridgeError::config(e.to_string()));
                ctx.finish(&result);
                tracing::error!(config = %config_path.display(), error = %e, "Invalid configuration");
                result
            }
        }
    }

    /// Run an already loaded state.
    pub fn run(
        &self,
        host: &mut dyn HostGraph,
        state: &DesiredState,
        ctx: &mut RunContext,
    ) -> BridgeResult<RunReport> {
        ctx.start("Preparing project");
        self.execute(host, state, ctx)
    }

    fn execute(
        &self,
        host: &mut dyn HostGraph,
        state: &DesiredState,
        ctx: &mut RunContext,
    ) -> BridgeResult<RunReport> {
        if let Err(e) = state.validate() {
            let result = Err(BridgeError::config(e.to_string()));
            ctx.finish(&result);
            return result;
        }

        host.begin_undo_group(UNDO_LABEL);
        let result = self.reconcile(host, state, ctx);
        host.end_undo_group();

        let final_state = ctx.finish(&result);
        match &result {
            Ok(report) => tracing::info!(
                items = report.items.len(),
                placeholders = report.count(ItemStatus::Placeholder),
                failed = report.count(ItemStatus::Failed),
                elapsed_secs = report.elapsed_secs,
                "Run complete"
            ),
            Err(e) if e.is_interruption() => tracing::warn!(error = %e, "Run interrupted"),
            Err(e) => tracing::error!(error = %e, "Run failed"),
        }
        result.map(|mut report| {
            report.state = final_state;
            report
        })
    }

    fn reconcile(
        &self,
        host: &mut dyn HostGraph,
        state: &DesiredState,
        ctx: &mut RunContext,
    ) -> BridgeResult<RunReport> {
        let project_path = Path::new(&state.project_path);
        let project_created = !project_path.exists();
        if project_created {
            host.new_project()
                .map_err(|e| BridgeError::graph(format!("Could not start a project: {e}")))?;
        } else {
            host.open_project(project_path).map_err(|e| {
                BridgeError::graph(format!("Could not open {}: {e}", project_path.display()))
            })?;
        }
        ctx.checkpoint()?;

        ctx.update("Applying color settings", 2.0);
        let color = ColorPolicy::new(&state.color).apply(host);

        ctx.checkpoint()?;
        ctx.update("Syncing main composition", 5.0);
        let target = CompositionTarget::from_state(state);
        let main = CompositionSynchronizer::new(target)
            .ensure(host, &state.comp_name)
            .map_err(|e| {
                BridgeError::graph(format!("Main composition '{}': {e}", state.comp_name))
            })?;

        let reconciler = LayerReconciler::new(self.names.clone(), main.comp, target)
            .with_claimed_names(state.items.iter().map(|item| item.name.as_str()));
        let total = state.items.len();
        let batch = self.settings.release_batch_size;
        let mut items = Vec::with_capacity(total);
        let mut cache_releases = 0;
        for (index, item) in state.items.iter().enumerate() {
            ctx.checkpoint()?;
            let percent = 5.0 + 85.0 * index as f64 / total as f64;
            ctx.update(&format!("Item {}/{}: {}", index + 1, total, item.name), percent);
            items.push(reconciler.reconcile(host, item));

            if batch > 0 && (index + 1) % batch == 0 {
                match host.release_caches() {
                    Ok(()) => cache_releases += 1,
                    Err(e) => tracing::debug!(error = %e, "Cache release unavailable"),
                }
            }
        }

        ctx.checkpoint()?;
        ctx.update_forced("Saving project", 90.0);
        host.save_project(project_path).map_err(|e| {
            BridgeError::graph(format!("Could not save {}: {e}", project_path.display()))
        })?;

        let render = match (state.should_render, state.output_path.as_deref()) {
            (true, Some(output_path)) => {
                ctx.checkpoint()?;
                ctx.update_forced("Rendering", 95.0);
                Some(render_composition(
                    host,
                    main.comp,
                    output_path,
                    &state.output_settings,
                    state.global_first,
                )?)
            }
            _ => None,
        };

        ctx.update_forced("Done", 100.0);
        Ok(RunReport {
            state: ctx.state(),
            project_path: state.project_path.clone(),
            project_created,
            color,
            main,
            items,
            cache_releases,
            render,
            elapsed_secs: ctx.clock().elapsed_secs(),
        })
    }
}
