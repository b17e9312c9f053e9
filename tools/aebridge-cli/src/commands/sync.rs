//! Reconcile a project against a desired-state config.

use std::path::PathBuf;
use std::time::Duration;

use aebridge_common::clock::RunClock;
use aebridge_common::config::AppConfig;
use aebridge_reconcile_core::{ItemStatus, Orchestrator, RunContext, RunReport};

pub async fn run(
    config: PathBuf,
    host_options: Option<PathBuf>,
    report_path: Option<PathBuf>,
    app: &AppConfig,
) -> anyhow::Result<()> {
    println!("Syncing from config: {}", config.display());

    let mut host = super::open_host(host_options)?;
    let cancel = super::cancel_on_ctrl_c();
    let settings = app.run.clone();

    let result = tokio::task::spawn_blocking(move || {
        let mut ctx = RunContext::new(&settings, RunClock::start()).with_cancel_flag(cancel);
        Orchestrator::new(settings).run_file(&mut host, &config, &mut ctx)
    })
    .await?;

    let Some(report) = super::conclude(app, result, summary)? else {
        return Ok(());
    };
    print_report(&report);

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json)
            .map_err(|e| anyhow::anyhow!("Failed to write report {}: {e}", path.display()))?;
        println!("  Report: {}", path.display());
    }

    if report.render.is_some() {
        tokio::time::sleep(Duration::from_millis(app.run.post_render_pause_ms)).await;
    }
    Ok(())
}

fn summary(report: &RunReport) -> String {
    format!(
        "{} item(s) synced into {} ({} placeholder(s), {} failed)",
        report.items.len(),
        report.project_path,
        report.count(ItemStatus::Placeholder),
        report.count(ItemStatus::Failed),
    )
}

fn print_report(report: &RunReport) {
    println!("  Project: {}", report.project_path);
    println!("  Color: {:?}", report.color.tier);
    println!(
        "  Main composition: {} ({})",
        report.main.comp,
        if report.main.created { "created" } else { "updated" }
    );
    println!("  Items:");
    for item in &report.items {
        match &item.reason {
            Some(reason) => println!("    {:<24} {:?}: {reason}", item.item, item.status),
            None => println!(
                "    {:<24} {:?}{}",
                item.item,
                item.status,
                item.resolution
                    .map(|r| format!(" ({r:?})"))
                    .unwrap_or_default()
            ),
        }
    }
    if let Some(render) = &report.render {
        println!("  Rendered: {} via {:?}", render.destination, render.output.route);
    }
    println!("\n{}", summary(report));
}
