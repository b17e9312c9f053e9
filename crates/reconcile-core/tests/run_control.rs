use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use aebridge_common::clock::{ManualTime, RunClock};
use aebridge_common::config::RunSettings;
use aebridge_common::error::BridgeError;
use aebridge_config_model::{DesiredState, ShotItem};
use aebridge_host_graph::{HostGraphExt, MemoryHost};
use aebridge_reconcile_core::{Orchestrator, ProgressSink, ProgressUpdate, RunContext, RunState};

/// Moves the clock one second per render and stalls on the second item.
struct Stall(ManualTime);

impl ProgressSink for Stall {
    fn render(&mut self, update: &ProgressUpdate) {
        self.0.advance_secs(1);
        if update.phase.starts_with("Item 2/") {
            self.0.advance_secs(181);
        }
    }
}

/// Requests cancellation while the second item is being reconciled.
struct CancelOnSecond {
    time: ManualTime,
    flag: Arc<AtomicBool>,
}

impl ProgressSink for CancelOnSecond {
    fn render(&mut self, update: &ProgressUpdate) {
        self.time.advance_secs(1);
        if update.phase.starts_with("Item 2/") {
            self.flag.store(true, Ordering::SeqCst);
        }
    }
}

fn setup(name: &str) -> (PathBuf, MemoryHost, DesiredState) {
    let dir = std::env::temp_dir().join(format!("aebridge_run_control_{name}"));
    let _ = std::fs::remove_dir_all(&dir);

    let mut host = MemoryHost::new();
    let mut state = DesiredState::parse(
        r#"{"project_path": "/unused.aebproj", "global_first": 1, "global_last": 24}"#,
        Path::new("run.json"),
    )
    .unwrap();
    state.project_path = dir.join("show.aebproj").to_string_lossy().into_owned();
    for name in ["a", "b", "c"] {
        let path = format!("/r/{name}.0001.exr");
        host.register_sequence(&path, 1, 24);
        state.items.push(ShotItem::new(name, path, 1, 24));
    }
    (dir, host, state)
}

#[test]
fn stalled_run_times_out_between_items() {
    let (dir, mut host, state) = setup("timeout");
    let (clock, time) = RunClock::manual();
    let mut ctx =
        RunContext::new(&RunSettings::default(), clock).with_sink(Box::new(Stall(time)));

    let err = Orchestrator::default()
        .run(&mut host, &state, &mut ctx)
        .unwrap_err();

    assert!(matches!(err, BridgeError::TimedOut { idle_secs } if idle_secs > 180));
    assert!(err.is_interruption());
    assert_eq!(ctx.state(), RunState::TimedOut);
    // The item in flight finished; the next one never started.
    assert!(host.find_composition("[AEB]_b").is_some());
    assert!(host.find_composition("[AEB]_c").is_none());
    assert_eq!(host.undo_depth(), 0);
    assert_eq!(host.undo_groups_closed(), 1);
    assert!(!dir.join("show.aebproj").exists());
}

#[test]
fn cancel_flag_stops_before_next_item() {
    let (dir, mut host, state) = setup("cancel");
    let (clock, time) = RunClock::manual();
    let flag = Arc::new(AtomicBool::new(false));
    let sink = CancelOnSecond {
        time,
        flag: flag.clone(),
    };
    let mut ctx = RunContext::new(&RunSettings::default(), clock)
        .with_cancel_flag(flag)
        .with_sink(Box::new(sink));

    let err = Orchestrator::default()
        .run(&mut host, &state, &mut ctx)
        .unwrap_err();

    assert!(matches!(err, BridgeError::Cancelled));
    assert_eq!(ctx.state(), RunState::Cancelled);
    assert!(host.find_composition("[AEB]_b").is_some());
    assert!(host.find_composition("[AEB]_c").is_none());
    assert_eq!(host.undo_groups_closed(), 1);
    assert!(!dir.join("show.aebproj").exists());
}

#[test]
fn cancelled_before_start_leaves_graph_empty() {
    let (dir, mut host, state) = setup("precancel");
    let mut ctx = RunContext::new(&RunSettings::default(), RunClock::manual().0);
    ctx.cancel();

    let err = Orchestrator::default()
        .run(&mut host, &state, &mut ctx)
        .unwrap_err();

    assert!(matches!(err, BridgeError::Cancelled));
    assert!(host.project().compositions.is_empty());
    assert_eq!(host.undo_groups_closed(), 1);
    assert!(!dir.join("show.aebproj").exists());
}
