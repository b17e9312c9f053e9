//! Per-shot reconciliation: child composition, source layer, timing, nesting.
//!
//! For every shot the reconciler converges the graph to:
//!
//! - one child composition `<child_prefix><name>`
//! - inside it, one source layer `<source_prefix><name>` bound to the shot's
//!   footage, or one solid `<name> (Missing)` when the footage is unresolved
//! - the child composition nested once into the main composition
//!
//! Each step leaves the graph valid, so a run may stop between any two.

use aebridge_config_model::{ShotItem, ShotTiming};
use aebridge_host_graph::{
    ApplyOutcome, CompId, FieldLog, HostGraph, HostGraphExt, ItemRef, LayerId, LayerInfo,
    MediaId, RemapKey, SolidSpec,
};
use serde::Serialize;

use crate::composition::{
    CompositionSync, CompositionSynchronizer, CompositionTarget, DURATION_TOLERANCE,
};
use crate::footage::{FootageResolver, MediaBinding, Resolution};
use crate::names::ReservedNames;

/// Placeholder solid color (RGB, 0..1).
pub const PLACEHOLDER_COLOR: [f64; 3] = [1.0, 0.0, 1.0];

/// How a shot ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Source layer bound to resolved footage.
    Bound,
    /// Footage unresolved; placeholder shown.
    Placeholder,
    /// The child composition or source layer could not be created.
    Failed,
}

/// Result of reconciling one shot.
#[derive(Debug, Clone, Serialize)]
pub struct ItemOutcome {
    pub item: String,
    pub status: ItemStatus,
    pub child: Option<CompositionSync>,
    /// Source layer, or the placeholder when unresolved.
    pub layer: Option<LayerId>,
    pub media: Option<MediaId>,
    pub resolution: Option<Resolution>,
    pub timing: ShotTiming,
    pub time_remapped: bool,
    pub duplicates_removed: usize,
    /// Whether this run added the child composition to the main composition.
    pub newly_nested: bool,
    pub writes: FieldLog,
    pub reason: Option<String>,
}

impl ItemOutcome {
    fn new(item: &ShotItem, timing: ShotTiming) -> Self {
        Self {
            item: item.name.clone(),
            status: ItemStatus::Failed,
            child: None,
            layer: None,
            media: None,
            resolution: None,
            timing,
            time_remapped: false,
            duplicates_removed: 0,
            newly_nested: false,
            writes: FieldLog::new(),
            reason: None,
        }
    }

    fn failed(mut self, reason: impl Into<String>) -> Self {
        self.status = ItemStatus::Failed;
        self.reason = Some(reason.into());
        self
    }
}

/// Reconciles shots into child compositions of one main composition.
#[derive(Debug, Clone)]
pub struct LayerReconciler {
    names: ReservedNames,
    main: CompId,
    target: CompositionTarget,
    compositions: CompositionSynchronizer,
    resolver: FootageResolver,
}

impl LayerReconciler {
    /// Child compositions get the same geometry and timing as `main`.
    pub fn new(names: ReservedNames, main: CompId, target: CompositionTarget) -> Self {
        Self {
            names,
            main,
            target,
            compositions: CompositionSynchronizer::new(target),
            resolver: FootageResolver::new(),
        }
    }

    /// Media named after any of these shots is only matched by that shot.
    pub fn with_claimed_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resolver = FootageResolver::claiming(names);
        self
    }

    pub fn names(&self) -> &ReservedNames {
        &self.names
    }

    pub fn reconcile(&self, host: &mut dyn HostGraph, item: &ShotItem) -> ItemOutcome {
        let timing = ShotTiming::new(
            item.first,
            item.last,
            self.target.start_frame,
            self.target.frame_rate,
        );
        let mut outcome = ItemOutcome::new(item, timing);

        let child_name = self.names.child_composition(&item.name);
        let child = match self.compositions.ensure(host, &child_name) {
            Ok(sync) => sync,
            Err(e) => {
                tracing::warn!(item = %item.name, error = %e, "Could not create child composition");
                return outcome.failed(format!("child composition: {e}"));
            }
        };
        let child_comp = child.comp;
        outcome.child = Some(child);

        let binding = self
            .resolver
            .resolve(host, &item.source_path(), &item.name);
        let Some(binding) = binding else {
            tracing::warn!(
                item = %item.name,
                path = %item.source_path(),
                "Footage unresolved, showing placeholder"
            );
            return self.show_placeholder(host, item, child_comp, outcome);
        };
        outcome.media = Some(binding.media);
        outcome.resolution = Some(binding.resolution);

        let source_name = self.names.source_layer(&item.name);
        self.remove_named(
            host,
            child_comp,
            &self.names.placeholder(&item.name),
            None,
            &mut outcome.writes,
        );

        let bound = self.bind_source(host, child_comp, &source_name, &binding, &mut outcome.writes);
        let Some(layer) = bound else {
            return outcome.failed("source layer could not be created");
        };
        outcome.layer = Some(layer);

        retime(host, layer, timing.start, timing.end, &mut outcome.writes);
        outcome.time_remapped =
            self.sync_time_remap(host, layer, &timing, &binding, &mut outcome.writes);
        outcome.duplicates_removed =
            self.remove_named(host, child_comp, &source_name, Some(layer), &mut outcome.writes);
        outcome.newly_nested = self.nest(host, child_comp, &child_name, &mut outcome.writes);

        outcome.status = ItemStatus::Bound;
        outcome
    }

    /// Keep (or create) exactly one placeholder and drop the source layer.
    fn show_placeholder(
        &self,
        host: &mut dyn HostGraph,
        item: &ShotItem,
        child: CompId,
        mut outcome: ItemOutcome,
    ) -> ItemOutcome {
        let writes = &mut outcome.writes;
        self.remove_named(host, child, &self.names.source_layer(&item.name), None, writes);

        let placeholder_name = self.names.placeholder(&item.name);
        let existing = host
            .layers_named(child, &placeholder_name)
            .unwrap_or_default();
        let keep = existing.iter().find(|l| l.is_solid()).map(|l| l.id);
        let layer = match keep {
            Some(layer) => {
                self.remove_named(host, child, &placeholder_name, Some(layer), writes);
                layer
            }
            None => {
                self.remove_named(host, child, &placeholder_name, None, writes);
                let solid = SolidSpec {
                    name: placeholder_name.clone(),
                    color: PLACEHOLDER_COLOR,
                    width: self.target.width,
                    height: self.target.height,
                    duration: self.target.duration,
                };
                match host.add_solid(child, &solid) {
                    Ok(layer) => layer,
                    Err(e) => {
                        tracing::warn!(
                            item = %item.name,
                            error = %e,
                            "Could not create placeholder"
                        );
                        return outcome.failed(format!("placeholder: {e}"));
                    }
                }
            }
        };
        retime(host, layer, 0.0, self.target.duration, writes);

        outcome.layer = Some(layer);
        outcome.status = ItemStatus::Placeholder;
        outcome
    }

    /// The source layer bound to `binding`, reusing the top-most one with the reserved name.
    fn bind_source(
        &self,
        host: &mut dyn HostGraph,
        child: CompId,
        source_name: &str,
        binding: &MediaBinding,
        writes: &mut FieldLog,
    ) -> Option<LayerId> {
        let source = binding.item();
        let existing: Option<LayerInfo> = host
            .layers_named(child, source_name)
            .ok()
            .and_then(|layers| layers.into_iter().next());

        if let Some(layer) = existing {
            if layer.source_item() == Some(source) {
                return Some(layer.id);
            }
            if writes
                .try_apply("layer.source", || host.replace_layer_source(layer.id, source))
                .is_applied()
            {
                return Some(layer.id);
            }
            writes.try_apply("layer.remove", || host.remove_layer(layer.id));
        }

        let layer = match host.add_layer(child, source) {
            Ok(layer) => layer,
            Err(e) => {
                tracing::warn!(layer = source_name, error = %e, "Could not add source layer");
                return None;
            }
        };
        writes.try_apply("layer.name", || host.rename_layer(layer, source_name));
        Some(layer)
    }

    /// Remap the layer when the footage length differs from the shot length,
    /// otherwise make sure remapping is off. Returns whether remap is in use.
    fn sync_time_remap(
        &self,
        host: &mut dyn HostGraph,
        layer: LayerId,
        timing: &ShotTiming,
        binding: &MediaBinding,
        writes: &mut FieldLog,
    ) -> bool {
        let natural = binding.info.duration;
        let needed = (natural - timing.duration).abs() > DURATION_TOLERANCE;
        let enabled = host.time_remap_enabled(layer).ok();

        if needed {
            writes.apply_if("time_remap", enabled != Some(true), || {
                host.set_time_remap_enabled(layer, true)
            });
            writes.try_apply("remap_keys.clear", || host.clear_time_remap_keys(layer));
            let keys = [
                RemapKey {
                    time: timing.start,
                    value: 0.0,
                },
                RemapKey {
                    time: timing.end,
                    value: natural,
                },
            ];
            let installed = keys
                .into_iter()
                .map(|key| {
                    writes.try_apply("remap_keys.add", || host.add_time_remap_key(layer, key))
                })
                .filter(|o| *o == ApplyOutcome::Applied)
                .count();
            installed == keys.len()
        } else {
            if enabled != Some(false) {
                writes.try_apply("remap_keys.clear", || host.clear_time_remap_keys(layer));
                writes.try_apply("time_remap", || host.set_time_remap_enabled(layer, false));
            }
            false
        }
    }

    /// Nest the child into the main composition unless it already is.
    /// Nested layers span the whole main composition either way.
    fn nest(
        &self,
        host: &mut dyn HostGraph,
        child: CompId,
        child_name: &str,
        writes: &mut FieldLog,
    ) -> bool {
        let nested = host
            .layers_showing(self.main, ItemRef::Composition(child))
            .unwrap_or_default();
        if !nested.is_empty() {
            for layer in nested {
                retime(host, layer.id, 0.0, self.target.duration, writes);
            }
            return false;
        }
        let mut added = None;
        writes.try_apply("nest", || {
            added = Some(host.add_layer(self.main, ItemRef::Composition(child))?);
            Ok(())
        });
        let Some(layer) = added else {
            tracing::warn!(comp = child_name, "Could not nest child composition");
            return false;
        };
        writes.try_apply("nest.name", || host.rename_layer(layer, child_name));
        retime(host, layer, 0.0, self.target.duration, writes);
        true
    }

    /// Remove layers named `name` in `comp`, except `keep`. Returns how many went.
    fn remove_named(
        &self,
        host: &mut dyn HostGraph,
        comp: CompId,
        name: &str,
        keep: Option<LayerId>,
        writes: &mut FieldLog,
    ) -> usize {
        let doomed: Vec<LayerId> = host
            .layers_named(comp, name)
            .unwrap_or_default()
            .into_iter()
            .map(|l| l.id)
            .filter(|id| Some(*id) != keep)
            .collect();
        doomed
            .into_iter()
            .filter(|id| {
                writes
                    .try_apply("layer.remove", || host.remove_layer(*id))
                    .is_applied()
            })
            .count()
    }
}

/// Start, in and out point, in that order.
fn retime(host: &mut dyn HostGraph, layer: LayerId, start: f64, end: f64, writes: &mut FieldLog) {
    writes.try_apply("layer.start_time", || host.set_layer_start_time(layer, start));
    writes.try_apply("layer.in_point", || host.set_layer_in_point(layer, start));
    writes.try_apply("layer.out_point", || host.set_layer_out_point(layer, end));
}

#[cfg(test)]
mod tests {
    use super::*;
    use aebridge_host_graph::memory::fields;
    use aebridge_host_graph::{Capability, HostOptions, ImportOptions, LayerSource, MemoryHost};

    const FPS: f64 = 24.0;

    fn setup(options: HostOptions) -> (MemoryHost, LayerReconciler) {
        let mut host = MemoryHost::with_options(options);
        let target = CompositionTarget {
            width: 1920,
            height: 1080,
            frame_rate: FPS,
            duration: 100.0 / FPS,
            start_frame: 1001,
        };
        let main = CompositionSynchronizer::new(target)
            .ensure(&mut host, "AEBridge")
            .unwrap()
            .comp;
        (host, LayerReconciler::new(ReservedNames::default(), main, target))
    }

    fn beauty(path: &str) -> ShotItem {
        ShotItem::new("beauty", path, 1001, 1100)
    }

    #[test]
    fn binds_source_layer_and_nests_child() {
        let (mut host, reconciler) = setup(HostOptions::default());
        host.register_sequence("/x/beauty.0001.exr", 1, 100);

        let outcome = reconciler.reconcile(&mut host, &beauty("/x/beauty.0001.exr"));
        assert_eq!(outcome.status, ItemStatus::Bound);
        assert!(outcome.newly_nested);
        assert!(!outcome.time_remapped);

        let child = host.find_composition("[AEB]_beauty").unwrap();
        let layers = host.layers(child).unwrap();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].name, "[AEB]_src_beauty");
        assert_eq!(layers[0].start_time, 0.0);
        assert!((layers[0].out_point - 100.0 / FPS).abs() < 1e-9);

        let main = host.find_composition("AEBridge").unwrap();
        let nested = host.layers_showing(main, child.into()).unwrap();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].name, "[AEB]_beauty");
    }

    #[test]
    fn timing_overrides_manual_edits() {
        let (mut host, reconciler) = setup(HostOptions::default());
        host.register_sequence("/x/beauty.0001.exr", 1, 50);
        let item = ShotItem::new("beauty", "/x/beauty.0001.exr", 1011, 1060);

        let first = reconciler.reconcile(&mut host, &item);
        let layer = first.layer.unwrap();
        host.set_layer_in_point(layer, 3.0).unwrap();
        host.set_layer_start_time(layer, 2.0).unwrap();

        reconciler.reconcile(&mut host, &item);
        let child = host.find_composition("[AEB]_beauty").unwrap();
        let info = &host.layers(child).unwrap()[0];
        assert!((info.start_time - 10.0 / FPS).abs() < 1e-9);
        assert!((info.in_point - 10.0 / FPS).abs() < 1e-9);
        assert!((info.out_point - 60.0 / FPS).abs() < 1e-9);
    }

    #[test]
    fn length_mismatch_installs_two_remap_keys() {
        let (mut host, reconciler) = setup(HostOptions::default());
        host.register_sequence("/x/beauty.0001.exr", 1, 50);

        let outcome = reconciler.reconcile(&mut host, &beauty("/x/beauty.0001.exr"));
        assert!(outcome.time_remapped);
        let keys = host.time_remap_keys(outcome.layer.unwrap()).unwrap();
        assert_eq!(
            keys,
            vec![
                RemapKey { time: 0.0, value: 0.0 },
                RemapKey { time: 100.0 / FPS, value: 50.0 / FPS },
            ]
        );

        // Footage now matches: remap goes away.
        host.register_sequence("/x/beauty.0001.exr", 1, 100);
        let outcome = reconciler.reconcile(&mut host, &beauty("/x/beauty.0001.exr"));
        assert!(!outcome.time_remapped);
        let layer = outcome.layer.unwrap();
        assert!(!host.time_remap_enabled(layer).unwrap());
        assert!(host.time_remap_keys(layer).unwrap().is_empty());
    }

    #[test]
    fn refused_remap_query_still_rebuilds_keys() {
        let (mut host, reconciler) = setup(HostOptions::default());
        host.register_sequence("/x/beauty.0001.exr", 1, 50);
        let layer = reconciler
            .reconcile(&mut host, &beauty("/x/beauty.0001.exr"))
            .layer
            .unwrap();
        host.add_time_remap_key(layer, RemapKey { time: 1.0, value: 0.25 })
            .unwrap();
        host.add_time_remap_key(layer, RemapKey { time: 2.0, value: 0.5 })
            .unwrap();
        assert_eq!(host.time_remap_keys(layer).unwrap().len(), 4);

        host.options_mut()
            .rejected_fields
            .insert(fields::TIME_REMAP_QUERY.to_string());
        assert!(host.time_remap_enabled(layer).is_err());

        let shorter = ShotItem::new("beauty", "/x/beauty.0001.exr", 1011, 1090);
        let outcome = reconciler.reconcile(&mut host, &shorter);
        assert!(outcome.time_remapped);
        assert_eq!(outcome.layer, Some(layer));
        assert_eq!(outcome.writes.outcome("time_remap"), Some(ApplyOutcome::Applied));
        let keys = host.time_remap_keys(layer).unwrap();
        assert_eq!(keys.len(), 2);
        assert!((keys[0].time - 10.0 / FPS).abs() < 1e-9);
        assert_eq!(keys[0].value, 0.0);
        assert!((keys[1].time - 90.0 / FPS).abs() < 1e-9);
        assert!((keys[1].value - 50.0 / FPS).abs() < 1e-9);
    }

    #[test]
    fn nested_layer_follows_main_duration() {
        let (mut host, reconciler) = setup(HostOptions::default());
        host.register_sequence("/x/beauty.0001.exr", 1, 100);
        let item = beauty("/x/beauty.0001.exr");
        reconciler.reconcile(&mut host, &item);

        let longer = CompositionTarget {
            duration: 200.0 / FPS,
            ..reconciler.target
        };
        let main = reconciler.main;
        CompositionSynchronizer::new(longer).ensure(&mut host, "AEBridge").unwrap();
        let grown = LayerReconciler::new(ReservedNames::default(), main, longer);
        let outcome = grown.reconcile(&mut host, &item);
        assert!(!outcome.newly_nested);

        let child = host.find_composition("[AEB]_beauty").unwrap();
        let nested = host.layers_showing(main, child.into()).unwrap();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].start_time, 0.0);
        assert_eq!(nested[0].in_point, 0.0);
        assert!((nested[0].out_point - 200.0 / FPS).abs() < 1e-9);
    }

    #[test]
    fn unresolved_footage_leaves_one_placeholder() {
        let (mut host, reconciler) = setup(HostOptions::default());
        host.register_sequence("/x/beauty.0001.exr", 1, 100);
        reconciler.reconcile(&mut host, &beauty("/x/beauty.0001.exr"));

        let missing = beauty("/gone/beauty.0001.exr");
        let options = host.options_mut();
        options.unsupported.insert(Capability::ReplaceWithSequence);
        options.unsupported.insert(Capability::ReplaceMedia);

        let first = reconciler.reconcile(&mut host, &missing);
        let second = reconciler.reconcile(&mut host, &missing);
        assert_eq!(first.status, ItemStatus::Placeholder);
        assert_eq!(first.layer, second.layer);

        let child = host.find_composition("[AEB]_beauty").unwrap();
        let layers = host.layers(child).unwrap();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].name, "beauty (Missing)");
        assert!(matches!(layers[0].source, LayerSource::Solid { .. }));
        assert!((layers[0].out_point - 100.0 / FPS).abs() < 1e-9);
    }

    #[test]
    fn resolved_footage_replaces_placeholder() {
        let (mut host, reconciler) = setup(HostOptions::default());
        let item = beauty("/x/beauty.0001.exr");
        let missing = reconciler.reconcile(&mut host, &item);
        assert_eq!(missing.status, ItemStatus::Placeholder);

        host.register_sequence("/x/beauty.0001.exr", 1, 100);
        assert_eq!(reconciler.reconcile(&mut host, &item).status, ItemStatus::Bound);

        let child = host.find_composition("[AEB]_beauty").unwrap();
        let names: Vec<String> = host
            .layers(child)
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["[AEB]_src_beauty"]);
    }

    #[test]
    fn duplicate_source_layers_are_removed() {
        let (mut host, reconciler) = setup(HostOptions::default());
        host.register_sequence("/x/beauty.0001.exr", 1, 100);
        let item = beauty("/x/beauty.0001.exr");
        let first = reconciler.reconcile(&mut host, &item);

        let child = host.find_composition("[AEB]_beauty").unwrap();
        let media = first.media.unwrap();
        let dup = host.add_layer(child, media.into()).unwrap();
        host.rename_layer(dup, "[AEB]_src_beauty").unwrap();

        let second = reconciler.reconcile(&mut host, &item);
        assert_eq!(second.duplicates_removed, 1);
        assert_eq!(host.layers(child).unwrap().len(), 1);
    }

    #[test]
    fn rebind_falls_back_to_recreate() {
        let options = HostOptions::default().without(Capability::ReplaceLayerSource);
        let (mut host, reconciler) = setup(options);
        host.register_sequence("/x/beauty.0001.exr", 1, 100);
        let item = beauty("/x/beauty.0001.exr");
        reconciler.reconcile(&mut host, &item);

        // Point the reserved layer at something else.
        let child = host.find_composition("[AEB]_beauty").unwrap();
        host.register_sequence("/x/other.0001.exr", 1, 100);
        let other = host
            .import_sequence("/x/other.0001.exr", ImportOptions::NUMBERED_SEQUENCE)
            .unwrap();
        let stale = host.layers(child).unwrap()[0].id;
        host.remove_layer(stale).unwrap();
        let wrong = host.add_layer(child, other.into()).unwrap();
        host.rename_layer(wrong, "[AEB]_src_beauty").unwrap();

        let outcome = reconciler.reconcile(&mut host, &item);
        assert_eq!(outcome.status, ItemStatus::Bound);
        assert_ne!(outcome.layer, Some(wrong));
        let layers = host.layers(child).unwrap();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].source_item(), outcome.media.map(ItemRef::Media));
    }

    #[test]
    fn failed_child_composition_is_per_item() {
        let (mut host, reconciler) = setup(HostOptions::default());
        host.options_mut()
            .rejected_fields
            .insert(fields::CREATE_COMPOSITION.to_string());
        let outcome = reconciler.reconcile(&mut host, &beauty("/x/beauty.0001.exr"));
        assert_eq!(outcome.status, ItemStatus::Failed);
        assert!(outcome.reason.is_some());
    }
}
