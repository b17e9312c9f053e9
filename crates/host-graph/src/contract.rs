//! The host-graph read/write surface the reconciler consumes.
//!
//! Any individual call may fail independently. Callers are expected to
//! treat most writes as best-effort (see [`crate::apply`]) and only a few
//! lookups as fatal.

use std::path::{Path, PathBuf};

use crate::node::{
    CompId, CompositionInfo, CompositionSettings, ImportOptions, ItemRef, LayerId, LayerInfo,
    LayerSource, MediaId, MediaInfo, ProjectItem, RemapKey, RenderItemId, SettingValue, SolidSpec,
};

/// Errors reported by host primitives.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Host does not support {operation}")]
    Unsupported { operation: &'static str },

    #[error("Host rejected {field}: {message}")]
    Rejected { field: String, message: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("Import of {path} failed: {message}")]
    Import { path: String, message: String },

    #[error("Project I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Project file {path} is not a valid project: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Result type alias for host primitives.
pub type HostResult<T> = Result<T, HostError>;

impl HostError {
    pub fn unsupported(operation: &'static str) -> Self {
        Self::Unsupported { operation }
    }

    pub fn rejected(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound {
            what: what.to_string(),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

/// Trait for project-graph backends.
///
/// The reconciler is the only writer for the duration of a run; backends
/// do not need interior locking.
pub trait HostGraph {
    /// Backend name for logging.
    fn name(&self) -> &str;

    // -- project -------------------------------------------------------

    /// Replace the open project with an empty one.
    fn new_project(&mut self) -> HostResult<()>;

    /// Open a saved project.
    fn open_project(&mut self, path: &Path) -> HostResult<()>;

    /// Persist the open project.
    fn save_project(&mut self, path: &Path) -> HostResult<()>;

    /// Start a single undoable transaction.
    fn begin_undo_group(&mut self, label: &str);

    /// Close the transaction opened by [`HostGraph::begin_undo_group`].
    fn end_undo_group(&mut self);

    /// Drop cached frames and other reclaimable memory.
    fn release_caches(&mut self) -> HostResult<()>;

    /// Write a project-level setting (color engine, working space, depth).
    fn set_project_setting(&mut self, key: &str, value: SettingValue) -> HostResult<()>;

    // -- items ---------------------------------------------------------

    /// All compositions and media items, in creation order.
    fn items(&self) -> Vec<ProjectItem>;

    fn rename_item(&mut self, item: ItemRef, name: &str) -> HostResult<()>;

    // -- compositions --------------------------------------------------

    fn composition(&self, id: CompId) -> HostResult<CompositionInfo>;

    fn create_composition(
        &mut self,
        name: &str,
        settings: &CompositionSettings,
    ) -> HostResult<CompId>;

    fn set_frame_rate(&mut self, id: CompId, fps: f64) -> HostResult<()>;

    fn set_duration(&mut self, id: CompId, secs: f64) -> HostResult<()>;

    fn set_dimensions(&mut self, id: CompId, width: u32, height: u32) -> HostResult<()>;

    /// Frame-based start offset (preferred).
    fn set_display_start_frame(&mut self, id: CompId, frame: i64) -> HostResult<()>;

    /// Time-based start offset (older hosts).
    fn set_display_start_time(&mut self, id: CompId, secs: f64) -> HostResult<()>;

    fn set_work_area(&mut self, id: CompId, start: f64, duration: f64) -> HostResult<()>;

    // -- media ---------------------------------------------------------

    fn media(&self, id: MediaId) -> HostResult<MediaInfo>;

    fn import_sequence(&mut self, path: &str, options: ImportOptions) -> HostResult<MediaId>;

    /// Re-scan the backing files in place.
    fn reload_media(&mut self, id: MediaId) -> HostResult<()>;

    /// Swap the backing sequence in place, keeping every reference.
    fn replace_with_sequence(&mut self, id: MediaId, path: &str) -> HostResult<()>;

    /// Plain file replacement; loses sequence detection.
    fn replace_media(&mut self, id: MediaId, path: &str) -> HostResult<()>;

    // -- layers --------------------------------------------------------

    /// Layers of a composition, top first.
    fn layers(&self, comp: CompId) -> HostResult<Vec<LayerInfo>>;

    fn add_layer(&mut self, comp: CompId, source: ItemRef) -> HostResult<LayerId>;

    fn add_solid(&mut self, comp: CompId, solid: &SolidSpec) -> HostResult<LayerId>;

    /// Point a layer at another item, keeping its other properties.
    fn replace_layer_source(&mut self, layer: LayerId, source: ItemRef) -> HostResult<()>;

    fn remove_layer(&mut self, layer: LayerId) -> HostResult<()>;

    fn rename_layer(&mut self, layer: LayerId, name: &str) -> HostResult<()>;

    fn set_layer_start_time(&mut self, layer: LayerId, secs: f64) -> HostResult<()>;

    fn set_layer_in_point(&mut self, layer: LayerId, secs: f64) -> HostResult<()>;

    fn set_layer_out_point(&mut self, layer: LayerId, secs: f64) -> HostResult<()>;

    fn time_remap_enabled(&self, layer: LayerId) -> HostResult<bool>;

    fn set_time_remap_enabled(&mut self, layer: LayerId, enabled: bool) -> HostResult<()>;

    fn time_remap_keys(&self, layer: LayerId) -> HostResult<Vec<RemapKey>>;

    fn clear_time_remap_keys(&mut self, layer: LayerId) -> HostResult<()>;

    fn add_time_remap_key(&mut self, layer: LayerId, key: RemapKey) -> HostResult<()>;

    // -- render targets ------------------------------------------------

    /// Queue a composition with a fresh output module.
    fn add_render_item(&mut self, comp: CompId) -> HostResult<RenderItemId>;

    fn remove_render_item(&mut self, id: RenderItemId) -> HostResult<()>;

    /// Output templates the host offers for this render item.
    fn output_templates(&self, id: RenderItemId) -> HostResult<Vec<String>>;

    fn apply_output_template(&mut self, id: RenderItemId, template: &str) -> HostResult<()>;

    fn set_output_setting(
        &mut self,
        id: RenderItemId,
        key: &str,
        value: SettingValue,
    ) -> HostResult<()>;

    fn set_output_file(&mut self, id: RenderItemId, path: &str) -> HostResult<()>;

    /// Render one queued item; blocks until done.
    fn render(&mut self, id: RenderItemId) -> HostResult<()>;
}

/// Convenience lookups built on top of [`HostGraph`].
pub trait HostGraphExt: HostGraph {
    /// First composition with exactly this name.
    fn find_composition(&self, name: &str) -> Option<CompId> {
        self.items()
            .into_iter()
            .filter(|item| item.name == name)
            .find_map(|item| item.id.as_composition())
    }

    /// All media items with their current snapshot; unreadable ones are skipped.
    fn media_items(&self) -> Vec<MediaInfo> {
        self.items()
            .into_iter()
            .filter_map(|item| item.id.as_media())
            .filter_map(|id| self.media(id).ok())
            .collect()
    }

    /// Layers of `comp` with this exact name, top first.
    fn layers_named(&self, comp: CompId, name: &str) -> HostResult<Vec<LayerInfo>> {
        Ok(self
            .layers(comp)?
            .into_iter()
            .filter(|layer| layer.name == name)
            .collect())
    }

    /// Layers of `comp` showing `item`.
    fn layers_showing(&self, comp: CompId, item: ItemRef) -> HostResult<Vec<LayerInfo>> {
        Ok(self
            .layers(comp)?
            .into_iter()
            .filter(|layer| layer.source == LayerSource::Item { item })
            .collect())
    }
}

impl<T: HostGraph + ?Sized> HostGraphExt for T {}
