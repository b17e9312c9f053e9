//! A file-backed, in-memory project graph.
//!
//! `MemoryHost` behaves like a compositing host closely enough to drive the
//! whole reconciliation pipeline: imports are named after their frame range,
//! applying an output template resets the destination, and render calls need
//! both a destination and a format. Projects persist as pretty JSON.

mod options;
mod project;

pub use options::{fields, Capability, HostOptions, OutputTemplate};
pub use project::{
    CompositionNode, LayerNode, MediaNode, MemoryProject, RenderItemNode, RenderRecord,
    PROJECT_FORMAT_VERSION,
};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use aebridge_config_model::paths::normalize_path;
use tracing::{debug, info};

use crate::contract::{HostError, HostGraph, HostResult};
use crate::node::{
    CompId, CompositionInfo, CompositionSettings, ImportOptions, ItemRef, LayerId, LayerInfo,
    LayerSource, MediaId, MediaInfo, ProjectItem, RemapKey, RenderItemId, SettingValue, SolidSpec,
};
use crate::sequence::SequencePath;

const TIME_EPSILON: f64 = 1e-6;

/// Inclusive frame range of a sequence on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    pub first: u64,
    pub last: u64,
}

impl FrameRange {
    pub fn new(first: u64, last: u64) -> Self {
        Self { first, last }
    }

    pub fn count(&self) -> u64 {
        self.last.saturating_sub(self.first) + 1
    }
}

/// What an import or replace would produce.
#[derive(Debug, Clone)]
struct Scanned {
    path: String,
    name: String,
    range: FrameRange,
    is_sequence: bool,
}

/// In-memory host used by the CLI and by tests.
#[derive(Debug, Default)]
pub struct MemoryHost {
    project: MemoryProject,
    options: HostOptions,
    /// Footage known without touching the filesystem, keyed by normalized path.
    catalog: BTreeMap<String, FrameRange>,
    project_path: Option<PathBuf>,
    undo_depth: usize,
    undo_groups_closed: usize,
    cache_releases: usize,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: HostOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Make a sequence importable without frames on disk.
    ///
    /// `path` is the first frame as the desired state names it.
    pub fn register_sequence(&mut self, path: &str, first: u64, last: u64) {
        self.catalog
            .insert(normalize_path(path), FrameRange::new(first, last));
    }

    /// Make a single file importable without it existing on disk.
    pub fn register_still(&mut self, path: &str) {
        self.catalog.insert(normalize_path(path), FrameRange::new(0, 0));
    }

    pub fn project(&self) -> &MemoryProject {
        &self.project
    }

    pub fn options(&self) -> &HostOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut HostOptions {
        &mut self.options
    }

    /// Path of the last opened or saved project.
    pub fn project_path(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }

    /// Open undo groups.
    pub fn undo_depth(&self) -> usize {
        self.undo_depth
    }

    pub fn undo_groups_closed(&self) -> usize {
        self.undo_groups_closed
    }

    pub fn cache_releases(&self) -> usize {
        self.cache_releases
    }

    pub fn render_log(&self) -> &[RenderRecord] {
        &self.project.render_log
    }

    /// The project as it would be saved.
    pub fn to_json(&self) -> HostResult<String> {
        serde_json::to_string_pretty(&self.project).map_err(|e| HostError::Corrupt {
            path: self.project_path.clone().unwrap_or_default(),
            source: e,
        })
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.project.next_id;
        self.project.next_id += 1;
        id
    }

    fn require(&self, capability: Capability, operation: &'static str) -> HostResult<()> {
        if self.options.supports(capability) {
            Ok(())
        } else {
            Err(HostError::unsupported(operation))
        }
    }

    fn guard(&self, field: &str) -> HostResult<()> {
        if self.options.rejects(field) {
            Err(HostError::rejected(field, "write refused by host"))
        } else {
            Ok(())
        }
    }

    fn comp_node(&self, id: CompId) -> HostResult<&CompositionNode> {
        self.project
            .compositions
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| HostError::not_found(id))
    }

    fn comp_node_mut(&mut self, id: CompId) -> HostResult<&mut CompositionNode> {
        self.project
            .compositions
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| HostError::not_found(id))
    }

    fn media_node(&self, id: MediaId) -> HostResult<&MediaNode> {
        self.project
            .media
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| HostError::not_found(id))
    }

    fn media_node_mut(&mut self, id: MediaId) -> HostResult<&mut MediaNode> {
        self.project
            .media
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| HostError::not_found(id))
    }

    fn layer_node(&self, id: LayerId) -> HostResult<(CompId, &LayerNode)> {
        self.project
            .compositions
            .iter()
            .find_map(|c| c.layers.iter().find(|l| l.id == id).map(|l| (c.id, l)))
            .ok_or_else(|| HostError::not_found(id))
    }

    fn layer_node_mut(&mut self, id: LayerId) -> HostResult<&mut LayerNode> {
        self.project
            .compositions
            .iter_mut()
            .find_map(|c| c.layers.iter_mut().find(|l| l.id == id))
            .ok_or_else(|| HostError::not_found(id))
    }

    fn render_node_mut(&mut self, id: RenderItemId) -> HostResult<&mut RenderItemNode> {
        self.project
            .render_queue
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| HostError::not_found(id))
    }

    /// Name and natural duration of a project item.
    fn item_source(&self, item: ItemRef) -> HostResult<(String, f64)> {
        match item {
            ItemRef::Composition(id) => {
                let comp = self.comp_node(id)?;
                Ok((comp.name.clone(), comp.duration))
            }
            ItemRef::Media(id) => {
                let media = self.media_node(id)?;
                Ok((media.name.clone(), media.duration()))
            }
        }
    }

    /// Natural duration of whatever a layer shows.
    fn layer_source_duration(&self, layer: &LayerNode) -> f64 {
        match layer.source {
            LayerSource::Item { item } => self
                .item_source(item)
                .map(|(_, duration)| duration)
                .unwrap_or(layer.out_point - layer.start_time),
            LayerSource::Solid { .. } => layer.out_point - layer.start_time,
        }
    }

    /// True when `outer` is `target` or nests it at any depth.
    fn nests(&self, outer: CompId, target: CompId) -> bool {
        if outer == target {
            return true;
        }
        let Ok(comp) = self.comp_node(outer) else {
            return false;
        };
        comp.layers.iter().any(|layer| match layer.source {
            LayerSource::Item {
                item: ItemRef::Composition(inner),
            } => self.nests(inner, target),
            _ => false,
        })
    }

    fn check_nesting(&self, comp: CompId, source: ItemRef) -> HostResult<()> {
        if let ItemRef::Composition(inner) = source {
            if self.nests(inner, comp) {
                return Err(HostError::rejected(
                    "layer.source",
                    format!("{inner} would contain itself through {comp}"),
                ));
            }
        }
        Ok(())
    }

    fn inspect(&self, path: &str, sequence: bool) -> HostResult<Scanned> {
        let key = normalize_path(path);
        let import_error = |message: String| HostError::Import {
            path: key.clone(),
            message,
        };
        let seq = if sequence {
            SequencePath::parse(&key)
        } else {
            None
        };

        let range = match self.catalog.get(&key) {
            Some(range) => *range,
            None => {
                if !Path::new(&key).is_file() {
                    return Err(import_error("file does not exist".to_string()));
                }
                match &seq {
                    Some(seq) => {
                        let frames = seq
                            .scan_frames()
                            .map_err(|e| import_error(format!("Failed to scan frames: {e}")))?;
                        match (frames.first(), frames.last()) {
                            (Some(&first), Some(&last)) => FrameRange::new(first, last),
                            _ => FrameRange::new(seq.frame, seq.frame),
                        }
                    }
                    None => FrameRange::new(0, 0),
                }
            }
        };

        let file_name = key.rsplit('/').next().unwrap_or(key.as_str()).to_string();
        let (name, is_sequence) = match &seq {
            Some(seq) if range.count() > 1 => (seq.display_name(range.first, range.last), true),
            _ => (file_name, false),
        };

        Ok(Scanned {
            path: key,
            name,
            range,
            is_sequence,
        })
    }

    fn apply_scan(&mut self, id: MediaId, scanned: Scanned) -> HostResult<()> {
        let media = self.media_node_mut(id)?;
        media.name = scanned.name;
        media.path = Some(scanned.path);
        media.first_frame = scanned.range.first;
        media.frame_count = scanned.range.count();
        media.is_sequence = scanned.is_sequence;
        Ok(())
    }
}

impl HostGraph for MemoryHost {
    fn name(&self) -> &str {
        "memory"
    }

    fn new_project(&mut self) -> HostResult<()> {
        self.project = MemoryProject::default();
        self.project_path = None;
        debug!("Started empty project");
        Ok(())
    }

    fn open_project(&mut self, path: &Path) -> HostResult<()> {
        let content = std::fs::read_to_string(path).map_err(|e| HostError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let project: MemoryProject =
            serde_json::from_str(&content).map_err(|e| HostError::Corrupt {
                path: path.to_path_buf(),
                source: e,
            })?;
        info!(
            path = %path.display(),
            compositions = project.compositions.len(),
            media = project.media.len(),
            "Opened project"
        );
        self.project = project;
        self.project_path = Some(path.to_path_buf());
        Ok(())
    }

    fn save_project(&mut self, path: &Path) -> HostResult<()> {
        self.guard(fields::SAVE)?;
        let io_error = |e: std::io::Error| HostError::Io {
            path: path.to_path_buf(),
            source: e,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_error)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.project).map_err(|e| HostError::Corrupt {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(io_error)?;
        self.project_path = Some(path.to_path_buf());
        Ok(())
    }

    fn begin_undo_group(&mut self, label: &str) {
        self.undo_depth += 1;
        debug!(label, depth = self.undo_depth, "Undo group opened");
    }

    fn end_undo_group(&mut self) {
        self.undo_depth = self.undo_depth.saturating_sub(1);
        self.undo_groups_closed += 1;
    }

    fn release_caches(&mut self) -> HostResult<()> {
        self.require(Capability::ReleaseCaches, "release_caches")?;
        self.cache_releases += 1;
        Ok(())
    }

    fn set_project_setting(&mut self, key: &str, value: SettingValue) -> HostResult<()> {
        self.guard(&format!("project.{key}"))?;
        if !self.options.project_setting_keys.contains(key) {
            return Err(HostError::rejected(key, "unknown project setting"));
        }
        self.project.settings.insert(key.to_string(), value);
        Ok(())
    }

    fn items(&self) -> Vec<ProjectItem> {
        let mut items: Vec<(u64, ProjectItem)> = self
            .project
            .compositions
            .iter()
            .map(|c| {
                (
                    c.id.0,
                    ProjectItem {
                        id: ItemRef::Composition(c.id),
                        name: c.name.clone(),
                    },
                )
            })
            .chain(self.project.media.iter().map(|m| {
                (
                    m.id.0,
                    ProjectItem {
                        id: ItemRef::Media(m.id),
                        name: m.name.clone(),
                    },
                )
            }))
            .collect();
        items.sort_by_key(|(id, _)| *id);
        items.into_iter().map(|(_, item)| item).collect()
    }

    fn rename_item(&mut self, item: ItemRef, name: &str) -> HostResult<()> {
        self.guard(fields::RENAME)?;
        match item {
            ItemRef::Composition(id) => self.comp_node_mut(id)?.name = name.to_string(),
            ItemRef::Media(id) => self.media_node_mut(id)?.name = name.to_string(),
        }
        Ok(())
    }

    fn composition(&self, id: CompId) -> HostResult<CompositionInfo> {
        self.comp_node(id).map(CompositionNode::info)
    }

    fn create_composition(
        &mut self,
        name: &str,
        settings: &CompositionSettings,
    ) -> HostResult<CompId> {
        self.guard(fields::CREATE_COMPOSITION)?;
        if settings.width == 0 || settings.height == 0 {
            return Err(HostError::rejected(fields::DIMENSIONS, "size must be positive"));
        }
        if settings.frame_rate <= 0.0 || settings.duration <= 0.0 {
            return Err(HostError::rejected(
                fields::CREATE_COMPOSITION,
                "frame rate and duration must be positive",
            ));
        }
        let id = CompId(self.alloc_id());
        self.project.compositions.push(CompositionNode {
            id,
            name: name.to_string(),
            width: settings.width,
            height: settings.height,
            pixel_aspect: settings.pixel_aspect,
            frame_rate: settings.frame_rate,
            duration: settings.duration,
            display_start_time: 0.0,
            work_area_start: 0.0,
            work_area_duration: settings.duration,
            layers: vec![],
        });
        debug!(%id, name, "Created composition");
        Ok(id)
    }

    fn set_frame_rate(&mut self, id: CompId, fps: f64) -> HostResult<()> {
        self.guard(fields::FRAME_RATE)?;
        if fps <= 0.0 {
            return Err(HostError::rejected(fields::FRAME_RATE, "must be positive"));
        }
        self.comp_node_mut(id)?.frame_rate = fps;
        Ok(())
    }

    fn set_duration(&mut self, id: CompId, secs: f64) -> HostResult<()> {
        self.guard(fields::DURATION)?;
        if secs <= 0.0 {
            return Err(HostError::rejected(fields::DURATION, "must be positive"));
        }
        let comp = self.comp_node_mut(id)?;
        comp.duration = secs;
        comp.work_area_start = comp.work_area_start.min(secs);
        comp.work_area_duration = comp.work_area_duration.min(secs - comp.work_area_start);
        Ok(())
    }

    fn set_dimensions(&mut self, id: CompId, width: u32, height: u32) -> HostResult<()> {
        self.guard(fields::DIMENSIONS)?;
        if width == 0 || height == 0 {
            return Err(HostError::rejected(fields::DIMENSIONS, "size must be positive"));
        }
        let comp = self.comp_node_mut(id)?;
        comp.width = width;
        comp.height = height;
        Ok(())
    }

    fn set_display_start_frame(&mut self, id: CompId, frame: i64) -> HostResult<()> {
        self.require(Capability::DisplayStartFrame, "display start frame")?;
        self.guard(fields::DISPLAY_START)?;
        let comp = self.comp_node_mut(id)?;
        comp.display_start_time = frame as f64 / comp.frame_rate;
        Ok(())
    }

    fn set_display_start_time(&mut self, id: CompId, secs: f64) -> HostResult<()> {
        self.guard(fields::DISPLAY_START)?;
        self.comp_node_mut(id)?.display_start_time = secs;
        Ok(())
    }

    fn set_work_area(&mut self, id: CompId, start: f64, duration: f64) -> HostResult<()> {
        self.guard(fields::WORK_AREA)?;
        let comp = self.comp_node_mut(id)?;
        if start < 0.0 || duration <= 0.0 || start + duration > comp.duration + TIME_EPSILON {
            return Err(HostError::rejected(
                fields::WORK_AREA,
                format!(
                    "{start}+{duration} outside composition of {}s",
                    comp.duration
                ),
            ));
        }
        comp.work_area_start = start;
        comp.work_area_duration = duration;
        Ok(())
    }

    fn media(&self, id: MediaId) -> HostResult<MediaInfo> {
        self.media_node(id).map(MediaNode::info)
    }

    fn import_sequence(&mut self, path: &str, options: ImportOptions) -> HostResult<MediaId> {
        let scanned = self.inspect(path, options.sequence)?;
        let id = MediaId(self.alloc_id());
        debug!(%id, name = %scanned.name, frames = scanned.range.count(), "Imported footage");
        self.project.media.push(MediaNode {
            id,
            name: scanned.name,
            path: Some(scanned.path),
            first_frame: scanned.range.first,
            frame_count: scanned.range.count(),
            frame_rate: self.options.sequence_frame_rate,
            is_sequence: scanned.is_sequence,
            reloads: 0,
        });
        Ok(id)
    }

    fn reload_media(&mut self, id: MediaId) -> HostResult<()> {
        self.require(Capability::ReloadMedia, "reload")?;
        let media = self.media_node(id)?;
        let path = media
            .path
            .clone()
            .ok_or_else(|| HostError::rejected("media.reload", "media has no backing file"))?;
        let scanned = self.inspect(&path, media.is_sequence)?;
        let media = self.media_node_mut(id)?;
        media.first_frame = scanned.range.first;
        media.frame_count = scanned.range.count();
        media.reloads += 1;
        Ok(())
    }

    fn replace_with_sequence(&mut self, id: MediaId, path: &str) -> HostResult<()> {
        self.require(Capability::ReplaceWithSequence, "replace_with_sequence")?;
        self.media_node(id)?;
        let scanned = self.inspect(path, true)?;
        self.apply_scan(id, scanned)
    }

    fn replace_media(&mut self, id: MediaId, path: &str) -> HostResult<()> {
        self.require(Capability::ReplaceMedia, "replace")?;
        self.media_node(id)?;
        let scanned = self.inspect(path, false)?;
        self.apply_scan(id, scanned)
    }

    fn layers(&self, comp: CompId) -> HostResult<Vec<LayerInfo>> {
        let node = self.comp_node(comp)?;
        Ok(node
            .layers
            .iter()
            .enumerate()
            .map(|(i, layer)| layer.info(comp, i + 1))
            .collect())
    }

    fn add_layer(&mut self, comp: CompId, source: ItemRef) -> HostResult<LayerId> {
        self.comp_node(comp)?;
        self.check_nesting(comp, source)?;
        let (name, duration) = self.item_source(source)?;
        let id = LayerId(self.alloc_id());
        self.comp_node_mut(comp)?.layers.insert(
            0,
            LayerNode {
                id,
                name,
                source: LayerSource::Item { item: source },
                start_time: 0.0,
                in_point: 0.0,
                out_point: duration,
                time_remap_enabled: false,
                remap_keys: vec![],
            },
        );
        Ok(id)
    }

    fn add_solid(&mut self, comp: CompId, solid: &SolidSpec) -> HostResult<LayerId> {
        self.comp_node(comp)?;
        let id = LayerId(self.alloc_id());
        self.comp_node_mut(comp)?.layers.insert(
            0,
            LayerNode {
                id,
                name: solid.name.clone(),
                source: LayerSource::Solid { color: solid.color },
                start_time: 0.0,
                in_point: 0.0,
                out_point: solid.duration,
                time_remap_enabled: false,
                remap_keys: vec![],
            },
        );
        Ok(id)
    }

    fn replace_layer_source(&mut self, layer: LayerId, source: ItemRef) -> HostResult<()> {
        self.require(Capability::ReplaceLayerSource, "replace_source")?;
        let (comp, _) = self.layer_node(layer)?;
        self.check_nesting(comp, source)?;
        self.item_source(source)?;
        self.layer_node_mut(layer)?.source = LayerSource::Item { item: source };
        Ok(())
    }

    fn remove_layer(&mut self, layer: LayerId) -> HostResult<()> {
        for comp in &mut self.project.compositions {
            if let Some(pos) = comp.layers.iter().position(|l| l.id == layer) {
                comp.layers.remove(pos);
                return Ok(());
            }
        }
        Err(HostError::not_found(layer))
    }

    fn rename_layer(&mut self, layer: LayerId, name: &str) -> HostResult<()> {
        self.guard(fields::LAYER_NAME)?;
        self.layer_node_mut(layer)?.name = name.to_string();
        Ok(())
    }

    fn set_layer_start_time(&mut self, layer: LayerId, secs: f64) -> HostResult<()> {
        self.guard(fields::LAYER_START)?;
        let node = self.layer_node_mut(layer)?;
        // Moving a layer shifts its trim points with it.
        let delta = secs - node.start_time;
        node.start_time = secs;
        node.in_point += delta;
        node.out_point += delta;
        Ok(())
    }

    fn set_layer_in_point(&mut self, layer: LayerId, secs: f64) -> HostResult<()> {
        self.guard(fields::LAYER_IN)?;
        self.layer_node_mut(layer)?.in_point = secs;
        Ok(())
    }

    fn set_layer_out_point(&mut self, layer: LayerId, secs: f64) -> HostResult<()> {
        self.guard(fields::LAYER_OUT)?;
        self.layer_node_mut(layer)?.out_point = secs;
        Ok(())
    }

    fn time_remap_enabled(&self, layer: LayerId) -> HostResult<bool> {
        self.require(Capability::TimeRemap, "time remap")?;
        self.guard(fields::TIME_REMAP_QUERY)?;
        Ok(self.layer_node(layer)?.1.time_remap_enabled)
    }

    fn set_time_remap_enabled(&mut self, layer: LayerId, enabled: bool) -> HostResult<()> {
        self.require(Capability::TimeRemap, "time remap")?;
        let (_, node) = self.layer_node(layer)?;
        if node.time_remap_enabled == enabled {
            return Ok(());
        }
        let source_duration = self.layer_source_duration(node);
        let node = self.layer_node_mut(layer)?;
        node.time_remap_enabled = enabled;
        node.remap_keys = if enabled {
            // Enabling seeds an identity mapping over the source.
            vec![
                RemapKey {
                    time: 0.0,
                    value: 0.0,
                },
                RemapKey {
                    time: source_duration,
                    value: source_duration,
                },
            ]
        } else {
            vec![]
        };
        Ok(())
    }

    fn time_remap_keys(&self, layer: LayerId) -> HostResult<Vec<RemapKey>> {
        self.require(Capability::TimeRemap, "time remap")?;
        Ok(self.layer_node(layer)?.1.remap_keys.clone())
    }

    fn clear_time_remap_keys(&mut self, layer: LayerId) -> HostResult<()> {
        self.require(Capability::TimeRemap, "time remap")?;
        self.layer_node_mut(layer)?.remap_keys.clear();
        Ok(())
    }

    fn add_time_remap_key(&mut self, layer: LayerId, key: RemapKey) -> HostResult<()> {
        self.require(Capability::TimeRemap, "time remap")?;
        let node = self.layer_node_mut(layer)?;
        if !node.time_remap_enabled {
            return Err(HostError::rejected("time_remap", "time remap is not enabled"));
        }
        node.remap_keys
            .retain(|k| (k.time - key.time).abs() > TIME_EPSILON);
        let pos = node
            .remap_keys
            .iter()
            .position(|k| k.time > key.time)
            .unwrap_or(node.remap_keys.len());
        node.remap_keys.insert(pos, key);
        Ok(())
    }

    fn add_render_item(&mut self, comp: CompId) -> HostResult<RenderItemId> {
        self.comp_node(comp)?;
        let id = RenderItemId(self.alloc_id());
        self.project.render_queue.push(RenderItemNode {
            id,
            comp,
            template: None,
            settings: BTreeMap::new(),
            file: None,
        });
        Ok(id)
    }

    fn remove_render_item(&mut self, id: RenderItemId) -> HostResult<()> {
        let before = self.project.render_queue.len();
        self.project.render_queue.retain(|r| r.id != id);
        if self.project.render_queue.len() == before {
            return Err(HostError::not_found(id));
        }
        Ok(())
    }

    fn output_templates(&self, id: RenderItemId) -> HostResult<Vec<String>> {
        if !self.project.render_queue.iter().any(|r| r.id == id) {
            return Err(HostError::not_found(id));
        }
        Ok(self
            .options
            .output_templates
            .iter()
            .map(|t| t.name.clone())
            .collect())
    }

    fn apply_output_template(&mut self, id: RenderItemId, template: &str) -> HostResult<()> {
        let settings = self
            .options
            .output_templates
            .iter()
            .find(|t| t.name == template)
            .map(|t| t.settings.clone())
            .ok_or_else(|| HostError::not_found(format!("output template '{template}'")))?;
        let node = self.render_node_mut(id)?;
        node.template = Some(template.to_string());
        node.settings = settings;
        // Templates carry their own destination rules.
        node.file = None;
        Ok(())
    }

    fn set_output_setting(
        &mut self,
        id: RenderItemId,
        key: &str,
        value: SettingValue,
    ) -> HostResult<()> {
        self.guard(&format!("output.{key}"))?;
        if !self.options.output_setting_keys.contains(key) {
            return Err(HostError::rejected(key, "unknown output setting"));
        }
        let is_format = key == "Format";
        if is_format {
            let known = value
                .as_text()
                .map(|f| self.options.output_formats.iter().any(|known| known == f))
                .unwrap_or(false);
            if !known {
                return Err(HostError::rejected(key, "format not available"));
            }
        }
        let node = self.render_node_mut(id)?;
        node.settings.insert(key.to_string(), value);
        if is_format {
            node.file = None;
        }
        Ok(())
    }

    fn set_output_file(&mut self, id: RenderItemId, path: &str) -> HostResult<()> {
        self.guard(fields::OUTPUT_FILE)?;
        self.render_node_mut(id)?.file = Some(path.to_string());
        Ok(())
    }

    fn render(&mut self, id: RenderItemId) -> HostResult<()> {
        let node = self
            .project
            .render_queue
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| HostError::not_found(id))?;
        let file = node
            .file
            .clone()
            .ok_or_else(|| HostError::rejected("render", "output module has no destination"))?;
        if !node.settings.contains_key("Format") {
            return Err(HostError::rejected("render", "output module has no format"));
        }
        let comp = self.comp_node(node.comp)?.info();
        let first_frame =
            ((comp.display_start_time + comp.work_area_start) * comp.frame_rate).round() as i64;
        let frames = (comp.work_area_duration * comp.frame_rate).round() as i64;
        let last_frame = first_frame + frames - 1;
        let numbering_start = node
            .settings
            .get("Starting #")
            .and_then(SettingValue::as_number)
            .map(|n| n as i64)
            .unwrap_or(first_frame);

        info!(
            comp = %comp.name,
            output = %file,
            first_frame,
            last_frame,
            "Rendered composition"
        );
        let record = RenderRecord {
            comp_name: comp.name,
            output_file: file,
            template: node.template.clone(),
            settings: node.settings.clone(),
            first_frame,
            last_frame,
            numbering_start,
            rendered_at: chrono::Utc::now(),
        };
        self.project.render_log.push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::HostGraphExt;

    fn comp_settings() -> CompositionSettings {
        CompositionSettings {
            width: 1920,
            height: 1080,
            pixel_aspect: 1.0,
            duration: 100.0 / 24.0,
            frame_rate: 24.0,
        }
    }

    #[test]
    fn import_names_sequence_after_its_range() {
        let mut host = MemoryHost::new();
        host.register_sequence("/r/beauty.1001.exr", 1001, 1100);

        let id = host
            .import_sequence("/r/beauty.1001.exr", ImportOptions::NUMBERED_SEQUENCE)
            .unwrap();
        let media = host.media(id).unwrap();
        assert_eq!(media.name, "beauty.[1001-1100].exr");
        assert!(media.is_sequence);
        assert!((media.duration - 100.0 / 24.0).abs() < 1e-9);
    }

    #[test]
    fn import_of_missing_file_fails() {
        let mut host = MemoryHost::new();
        let err = host
            .import_sequence("/nowhere/x.0001.exr", ImportOptions::NUMBERED_SEQUENCE)
            .unwrap_err();
        assert!(matches!(err, HostError::Import { .. }));
        assert!(host.items().is_empty());
    }

    #[test]
    fn swap_renames_media_and_keeps_id() {
        let mut host = MemoryHost::new();
        host.register_sequence("/r/fg.0001.png", 1, 10);
        host.register_sequence("/r/fg_v2.0001.png", 1, 20);
        let id = host
            .import_sequence("/r/fg.0001.png", ImportOptions::NUMBERED_SEQUENCE)
            .unwrap();

        host.replace_with_sequence(id, "/r/fg_v2.0001.png").unwrap();
        let media = host.media(id).unwrap();
        assert_eq!(media.name, "fg_v2.[0001-0020].png");
        assert_eq!(media.path.as_deref(), Some("/r/fg_v2.0001.png"));
        assert_eq!(host.media_items().len(), 1);
    }

    #[test]
    fn unsupported_capability_is_reported() {
        let options = HostOptions::default().without(Capability::ReplaceWithSequence);
        let mut host = MemoryHost::with_options(options);
        host.register_sequence("/r/a.0001.exr", 1, 2);
        let id = host
            .import_sequence("/r/a.0001.exr", ImportOptions::NUMBERED_SEQUENCE)
            .unwrap();
        let err = host.replace_with_sequence(id, "/r/a.0001.exr").unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn composition_cannot_nest_itself() {
        let mut host = MemoryHost::new();
        let outer = host.create_composition("outer", &comp_settings()).unwrap();
        let inner = host.create_composition("inner", &comp_settings()).unwrap();
        host.add_layer(outer, inner.into()).unwrap();

        assert!(host.add_layer(inner, outer.into()).is_err());
        assert!(host.add_layer(outer, outer.into()).is_err());
    }

    #[test]
    fn layers_stack_newest_on_top() {
        let mut host = MemoryHost::new();
        let comp = host.create_composition("main", &comp_settings()).unwrap();
        let a = host.create_composition("a", &comp_settings()).unwrap();
        let b = host.create_composition("b", &comp_settings()).unwrap();
        host.add_layer(comp, a.into()).unwrap();
        host.add_layer(comp, b.into()).unwrap();

        let layers = host.layers(comp).unwrap();
        assert_eq!(layers[0].name, "b");
        assert_eq!(layers[0].index, 1);
        assert_eq!(layers[1].name, "a");
    }

    #[test]
    fn moving_layer_shifts_trim_points() {
        let mut host = MemoryHost::new();
        let comp = host.create_composition("main", &comp_settings()).unwrap();
        let child = host.create_composition("child", &comp_settings()).unwrap();
        let layer = host.add_layer(comp, child.into()).unwrap();

        host.set_layer_start_time(layer, 1.0).unwrap();
        let info = &host.layers(comp).unwrap()[0];
        assert_eq!(info.in_point, 1.0);
        assert!((info.out_point - (1.0 + 100.0 / 24.0)).abs() < 1e-9);
    }

    #[test]
    fn remap_keys_replace_same_time_and_stay_sorted() {
        let mut host = MemoryHost::new();
        let comp = host.create_composition("main", &comp_settings()).unwrap();
        let child = host.create_composition("child", &comp_settings()).unwrap();
        let layer = host.add_layer(comp, child.into()).unwrap();

        assert!(host
            .add_time_remap_key(layer, RemapKey { time: 1.0, value: 1.0 })
            .is_err());
        host.set_time_remap_enabled(layer, true).unwrap();
        assert_eq!(host.time_remap_keys(layer).unwrap().len(), 2);

        host.clear_time_remap_keys(layer).unwrap();
        host.add_time_remap_key(layer, RemapKey { time: 2.0, value: 1.5 }).unwrap();
        host.add_time_remap_key(layer, RemapKey { time: 0.0, value: 0.0 }).unwrap();
        host.add_time_remap_key(layer, RemapKey { time: 2.0, value: 1.9 }).unwrap();
        let keys = host.time_remap_keys(layer).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].time, 0.0);
        assert_eq!(keys[1].value, 1.9);

        host.set_time_remap_enabled(layer, false).unwrap();
        assert!(host.time_remap_keys(layer).unwrap().is_empty());
    }

    #[test]
    fn applying_template_clears_destination() {
        let mut host = MemoryHost::new();
        let comp = host.create_composition("main", &comp_settings()).unwrap();
        let rq = host.add_render_item(comp).unwrap();
        host.set_output_file(rq, "/out/a.[#####].png").unwrap();
        host.apply_output_template(rq, "PNG Sequence with Alpha").unwrap();

        assert_eq!(host.project().render_queue[0].file, None);
        assert!(host.apply_output_template(rq, "Nope").is_err());
    }

    #[test]
    fn render_needs_destination_and_format() {
        let mut host = MemoryHost::new();
        let comp = host.create_composition("main", &comp_settings()).unwrap();
        host.set_display_start_frame(comp, 1001).unwrap();
        let rq = host.add_render_item(comp).unwrap();

        assert!(host.render(rq).is_err());
        host.set_output_file(rq, "/out/a.[#####].png").unwrap();
        assert!(host.render(rq).is_err());
        assert!(host.set_output_setting(rq, "Format", "GIF".into()).is_err());
        host.set_output_setting(rq, "Format", "PNG Sequence".into()).unwrap();
        // A new format resets the destination.
        assert!(host.render(rq).is_err());
        host.set_output_file(rq, "/out/a.[#####].png").unwrap();
        host.render(rq).unwrap();

        let record = &host.render_log()[0];
        assert_eq!(record.first_frame, 1001);
        assert_eq!(record.last_frame, 1100);
        assert_eq!(record.numbering_start, 1001);
    }

    #[test]
    fn rejected_fields_fail_without_changing_state() {
        let mut host =
            MemoryHost::with_options(HostOptions::default().rejecting(fields::FRAME_RATE));
        let comp = host.create_composition("main", &comp_settings()).unwrap();
        assert!(host.set_frame_rate(comp, 30.0).is_err());
        assert_eq!(host.composition(comp).unwrap().frame_rate, 24.0);
    }

    #[test]
    fn project_round_trips_through_disk() {
        let dir = std::env::temp_dir().join("aebridge_test_memory_host");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("shot.aep.json");

        let mut host = MemoryHost::new();
        let comp = host.create_composition("main", &comp_settings()).unwrap();
        host.set_project_setting("Bits Per Channel", 16i64.into()).unwrap();
        assert!(host
            .set_project_setting("Color Engine", "OCIO".into())
            .is_err());
        host.save_project(&path).unwrap();

        let mut reopened = MemoryHost::new();
        reopened.open_project(&path).unwrap();
        assert_eq!(reopened.project(), host.project());
        assert_eq!(reopened.find_composition("main"), Some(comp));

        std::fs::remove_dir_all(&dir).ok();
    }
}
