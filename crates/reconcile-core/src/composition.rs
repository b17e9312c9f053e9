//! Composition find-or-create and property sync.

use aebridge_config_model::DesiredState;
use aebridge_host_graph::{
    ApplyOutcome, CompId, CompositionSettings, FieldLog, HostGraph, HostGraphExt, HostResult,
};
use serde::Serialize;

/// Frame rates closer than this are considered equal.
pub const FRAME_RATE_TOLERANCE: f64 = 0.01;

/// Durations closer than this (seconds) are considered equal.
pub const DURATION_TOLERANCE: f64 = 0.01;

/// Geometry and timing a managed composition should have.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompositionTarget {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    /// Seconds.
    pub duration: f64,
    /// Frame number displayed at time zero.
    pub start_frame: i64,
}

impl CompositionTarget {
    pub fn from_state(state: &DesiredState) -> Self {
        Self {
            width: state.width,
            height: state.height,
            frame_rate: state.frame_rate,
            duration: state.duration_secs(),
            start_frame: state.global_first,
        }
    }

    fn settings(&self) -> CompositionSettings {
        CompositionSettings {
            width: self.width,
            height: self.height,
            pixel_aspect: 1.0,
            duration: self.duration,
            frame_rate: self.frame_rate,
        }
    }
}

/// A synced composition.
#[derive(Debug, Clone, Serialize)]
pub struct CompositionSync {
    pub comp: CompId,
    pub created: bool,
    pub writes: FieldLog,
}

/// Finds or creates compositions by name and applies a [`CompositionTarget`].
#[derive(Debug, Clone)]
pub struct CompositionSynchronizer {
    target: CompositionTarget,
}

impl CompositionSynchronizer {
    pub fn new(target: CompositionTarget) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &CompositionTarget {
        &self.target
    }

    /// Find `name` (exact match) or create it, then apply the target.
    ///
    /// Only a failed creation is an error; property writes never are.
    pub fn ensure(&self, host: &mut dyn HostGraph, name: &str) -> HostResult<CompositionSync> {
        let (comp, created) = match host.find_composition(name) {
            Some(comp) => (comp, false),
            None => {
                let comp = host.create_composition(name, &self.target.settings())?;
                tracing::debug!(comp = %comp, name, "Created composition");
                (comp, true)
            }
        };
        let writes = self.apply(host, comp);
        Ok(CompositionSync {
            comp,
            created,
            writes,
        })
    }

    /// Write frame rate, duration, size, start frame and work area, in that order.
    pub fn apply(&self, host: &mut dyn HostGraph, comp: CompId) -> FieldLog {
        let target = self.target;
        let current = host.composition(comp).ok();
        let mut writes = FieldLog::new();

        let fps_differs = current
            .as_ref()
            .map_or(true, |c| (c.frame_rate - target.frame_rate).abs() > FRAME_RATE_TOLERANCE);
        writes.apply_if("frame_rate", fps_differs, || {
            host.set_frame_rate(comp, target.frame_rate)
        });

        let duration_differs = current
            .as_ref()
            .map_or(true, |c| (c.duration - target.duration).abs() > DURATION_TOLERANCE);
        writes.apply_if("duration", duration_differs, || {
            host.set_duration(comp, target.duration)
        });

        let size_differs = current
            .as_ref()
            .map_or(true, |c| c.width != target.width || c.height != target.height);
        writes.apply_if("size", size_differs, || {
            host.set_dimensions(comp, target.width, target.height)
        });

        let by_frame = writes.try_apply("start_frame", || {
            host.set_display_start_frame(comp, target.start_frame)
        });
        if by_frame == ApplyOutcome::Failed {
            let secs = target.start_frame as f64 / target.frame_rate;
            writes.try_apply("start_time", || host.set_display_start_time(comp, secs));
        }

        // The duration write may have been rejected; span what the composition has.
        let span = host
            .composition(comp)
            .map(|c| c.duration)
            .unwrap_or(target.duration);
        writes.try_apply("work_area", || host.set_work_area(comp, 0.0, span));

        writes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aebridge_host_graph::memory::fields;
    use aebridge_host_graph::{Capability, HostOptions, MemoryHost};

    fn target(first: i64, last: i64) -> CompositionTarget {
        CompositionTarget {
            width: 1920,
            height: 1080,
            frame_rate: 24.0,
            duration: (last - first + 1) as f64 / 24.0,
            start_frame: first,
        }
    }

    #[test]
    fn creates_then_finds_by_name() {
        let mut host = MemoryHost::new();
        let sync = CompositionSynchronizer::new(target(1001, 1100));

        let first = sync.ensure(&mut host, "AEBridge").unwrap();
        assert!(first.created);
        let second = sync.ensure(&mut host, "AEBridge").unwrap();
        assert!(!second.created);
        assert_eq!(first.comp, second.comp);

        assert_eq!(second.writes.outcome("frame_rate"), Some(ApplyOutcome::Skipped));
        assert_eq!(second.writes.outcome("duration"), Some(ApplyOutcome::Skipped));
        assert_eq!(second.writes.outcome("size"), Some(ApplyOutcome::Skipped));

        let info = host.composition(first.comp).unwrap();
        assert_eq!(info.display_start_frame(), 1001);
        assert_eq!(info.end_frame(), 1100);
        assert_eq!(info.work_area_duration, info.duration);
    }

    #[test]
    fn write_order_is_fixed() {
        let mut host = MemoryHost::new();
        let comp = host
            .create_composition(
                "main",
                &CompositionSettings {
                    width: 640,
                    height: 480,
                    pixel_aspect: 1.0,
                    duration: 1.0,
                    frame_rate: 30.0,
                },
            )
            .unwrap();
        let writes = CompositionSynchronizer::new(target(1, 48)).apply(&mut host, comp);
        assert_eq!(
            writes.order(),
            vec!["frame_rate", "duration", "size", "start_frame", "work_area"]
        );
        assert!(writes.failed().is_empty());
    }

    #[test]
    fn start_time_fallback_when_frame_setter_missing() {
        let mut host =
            MemoryHost::with_options(HostOptions::default().without(Capability::DisplayStartFrame));
        let sync = CompositionSynchronizer::new(target(1001, 1100))
            .ensure(&mut host, "main")
            .unwrap();

        assert_eq!(sync.writes.outcome("start_frame"), Some(ApplyOutcome::Failed));
        assert_eq!(sync.writes.outcome("start_time"), Some(ApplyOutcome::Applied));
        assert_eq!(host.composition(sync.comp).unwrap().display_start_frame(), 1001);
    }

    #[test]
    fn one_rejected_field_does_not_block_the_rest() {
        let mut host = MemoryHost::with_options(HostOptions::default().rejecting(fields::DURATION));
        let comp = host
            .create_composition(
                "main",
                &CompositionSettings {
                    width: 1920,
                    height: 1080,
                    pixel_aspect: 1.0,
                    duration: 10.0,
                    frame_rate: 24.0,
                },
            )
            .unwrap();
        let writes = CompositionSynchronizer::new(target(1, 48)).apply(&mut host, comp);

        assert_eq!(writes.failed(), vec!["duration"]);
        assert_eq!(writes.outcome("work_area"), Some(ApplyOutcome::Applied));
        assert_eq!(host.composition(comp).unwrap().work_area_duration, 10.0);
    }

    #[test]
    fn shifting_start_moves_end_by_same_delta() {
        let mut host = MemoryHost::new();
        let a = CompositionSynchronizer::new(target(1001, 1100)).ensure(&mut host, "main").unwrap();
        let before = host.composition(a.comp).unwrap();

        CompositionSynchronizer::new(target(1011, 1110)).ensure(&mut host, "main").unwrap();
        let after = host.composition(a.comp).unwrap();

        assert_eq!(after.display_start_frame() - before.display_start_frame(), 10);
        assert_eq!(after.end_frame() - before.end_frame(), 10);
    }
}
