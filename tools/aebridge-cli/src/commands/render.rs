//! Render one composition of an existing project.

use std::path::{Path, PathBuf};
use std::time::Duration;

use aebridge_common::config::AppConfig;
use aebridge_common::error::BridgeError;
use aebridge_config_model::RenderJob;
use aebridge_host_graph::HostGraph;
use aebridge_render_engine::{render_only, RenderOutcome};

pub async fn run(
    job_path: PathBuf,
    host_options: Option<PathBuf>,
    app: &AppConfig,
) -> anyhow::Result<()> {
    println!("Rendering from job: {}", job_path.display());

    let mut host = super::open_host(host_options)?;
    let result = tokio::task::spawn_blocking(move || {
        let job = RenderJob::load(&job_path).map_err(|e| BridgeError::config(e.to_string()))?;
        let outcome = render_only(&mut host, &job)?;
        // The render history lives in the project file.
        if let Err(e) = host.save_project(Path::new(&job.project_path)) {
            tracing::warn!(error = %e, "Could not record render in project");
        }
        Ok::<RenderOutcome, BridgeError>(outcome)
    })
    .await?;

    let Some(outcome) = super::conclude(app, result, |o| format!("Rendered {}", o.destination))?
    else {
        return Ok(());
    };

    println!("  Destination: {}", outcome.destination);
    println!("  Output route: {:?}", outcome.output.route);
    if let Some(template) = &outcome.output.template {
        println!("  Template: {template}");
    }
    let failed = outcome.output.writes.failed();
    if !failed.is_empty() {
        println!("  Settings the host kept: {}", failed.join(", "));
    }
    println!("\nRender complete.");

    tokio::time::sleep(Duration::from_millis(app.run.post_render_pause_ms)).await;
    Ok(())
}
