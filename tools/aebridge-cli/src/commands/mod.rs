pub mod info;
pub mod render;
pub mod sync;
pub mod validate;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use aebridge_common::config::AppConfig;
use aebridge_common::error::BridgeError;
use aebridge_common::sentinel::{RunStatus, StatusFiles};
use aebridge_host_graph::{HostOptions, MemoryHost};

/// Build the host, applying behavior switches from `options` when given.
fn open_host(options: Option<PathBuf>) -> anyhow::Result<MemoryHost> {
    let Some(path) = options else {
        return Ok(MemoryHost::new());
    };
    let content = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Failed to read host options {}: {e}", path.display()))?;
    let options: HostOptions = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid host options {}: {e}", path.display()))?;
    Ok(MemoryHost::with_options(options))
}

/// Cancel flag flipped by Ctrl-C.
fn cancel_on_ctrl_c() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let watcher = flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Cancellation requested, stopping after the current step");
            watcher.store(true, Ordering::SeqCst);
        }
    });
    flag
}

/// Write the status file for a finished run and turn failures into an error.
///
/// Interruptions are recorded but not reported as failures.
fn conclude<T>(
    app: &AppConfig,
    result: Result<T, BridgeError>,
    success: impl FnOnce(&T) -> String,
) -> anyhow::Result<Option<T>> {
    let status = StatusFiles::new(&app.sentinel_dir);
    let (run_status, message) = match &result {
        Ok(value) => (RunStatus::Success, success(value)),
        Err(e) if e.is_interruption() => (RunStatus::Interrupted, e.to_string()),
        Err(e) => (RunStatus::Failure, e.to_string()),
    };
    if let Err(e) = status.write(run_status, &message) {
        tracing::warn!(dir = %app.sentinel_dir.display(), error = %e, "Could not write status file");
    }

    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_interruption() => {
            println!("Stopped: {e}");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
