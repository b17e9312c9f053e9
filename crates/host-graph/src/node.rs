//! Typed handles and read-only views over host-graph nodes.
//!
//! Every node the reconciler touches is resolved once into one of these
//! values. Handles are plain ids; views are snapshots taken at lookup time.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

handle!(
    /// A composition in the project.
    CompId,
    "comp"
);
handle!(
    /// A footage item (image sequence or still).
    MediaId,
    "media"
);
handle!(
    /// A layer inside some composition.
    LayerId,
    "layer"
);
handle!(
    /// A render-queue entry with its output module.
    RenderItemId,
    "render"
);

/// A project-panel item: either a composition or a media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ItemRef {
    Composition(CompId),
    Media(MediaId),
}

impl ItemRef {
    pub fn as_composition(self) -> Option<CompId> {
        match self {
            ItemRef::Composition(id) => Some(id),
            ItemRef::Media(_) => None,
        }
    }

    pub fn as_media(self) -> Option<MediaId> {
        match self {
            ItemRef::Media(id) => Some(id),
            ItemRef::Composition(_) => None,
        }
    }
}

impl From<CompId> for ItemRef {
    fn from(id: CompId) -> Self {
        ItemRef::Composition(id)
    }
}

impl From<MediaId> for ItemRef {
    fn from(id: MediaId) -> Self {
        ItemRef::Media(id)
    }
}

/// Name and handle of a project item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectItem {
    pub id: ItemRef,
    pub name: String,
}

/// Settings used when creating a composition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositionSettings {
    pub width: u32,
    pub height: u32,
    pub pixel_aspect: f64,
    pub duration: f64,
    pub frame_rate: f64,
}

/// Snapshot of a composition's timing and geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionInfo {
    pub id: CompId,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub duration: f64,
    /// Time offset of frame 0 (seconds).
    pub display_start_time: f64,
    pub work_area_start: f64,
    pub work_area_duration: f64,
}

impl CompositionInfo {
    /// Frame number shown for time zero.
    pub fn display_start_frame(&self) -> i64 {
        (self.display_start_time * self.frame_rate).round() as i64
    }

    /// Number of frames in the composition.
    pub fn frame_count(&self) -> i64 {
        (self.duration * self.frame_rate).round() as i64
    }

    /// Last frame number; always derived, never stored.
    pub fn end_frame(&self) -> i64 {
        self.display_start_frame() + self.frame_count() - 1
    }
}

/// Snapshot of a media item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub id: MediaId,
    pub name: String,
    /// Backing file (first frame for sequences); `None` for generated media.
    pub path: Option<String>,
    /// Natural duration in seconds.
    pub duration: f64,
    pub frame_rate: f64,
    pub is_sequence: bool,
}

/// How a file is brought into the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Treat the file as the first frame of a numbered sequence.
    pub sequence: bool,
    /// Order frames alphabetically instead of by their numeric suffix.
    pub force_alphabetical: bool,
}

impl ImportOptions {
    /// Numbered sequence ordered by frame number.
    pub const NUMBERED_SEQUENCE: ImportOptions = ImportOptions {
        sequence: true,
        force_alphabetical: false,
    };
}

/// What a layer displays.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerSource {
    Item { item: ItemRef },
    Solid { color: [f64; 3] },
}

/// Snapshot of a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub id: LayerId,
    pub comp: CompId,
    /// 1-based stacking index, top first.
    pub index: usize,
    pub name: String,
    pub source: LayerSource,
    pub start_time: f64,
    pub in_point: f64,
    pub out_point: f64,
    pub time_remap_enabled: bool,
}

impl LayerInfo {
    /// The project item this layer shows, if any.
    pub fn source_item(&self) -> Option<ItemRef> {
        match self.source {
            LayerSource::Item { item } => Some(item),
            LayerSource::Solid { .. } => None,
        }
    }

    pub fn is_solid(&self) -> bool {
        matches!(self.source, LayerSource::Solid { .. })
    }
}

/// A solid-color layer to create.
#[derive(Debug, Clone, PartialEq)]
pub struct SolidSpec {
    pub name: String,
    pub color: [f64; 3],
    pub width: u32,
    pub height: u32,
    pub duration: f64,
}

/// One time-remap keyframe: at layer time `time`, show source time `value`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RemapKey {
    pub time: f64,
    pub value: f64,
}

/// A value written to a project or output-module setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl SettingValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SettingValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            SettingValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        SettingValue::Text(v.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(v: String) -> Self {
        SettingValue::Text(v)
    }
}

impl From<f64> for SettingValue {
    fn from(v: f64) -> Self {
        SettingValue::Number(v)
    }
}

impl From<i64> for SettingValue {
    fn from(v: i64) -> Self {
        SettingValue::Number(v as f64)
    }
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        SettingValue::Bool(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comp(fps: f64, duration: f64, start_time: f64) -> CompositionInfo {
        CompositionInfo {
            id: CompId(1),
            name: "main".to_string(),
            width: 1920,
            height: 1080,
            frame_rate: fps,
            duration,
            display_start_time: start_time,
            work_area_start: 0.0,
            work_area_duration: duration,
        }
    }

    #[test]
    fn end_frame_is_derived_from_start_and_duration() {
        let info = comp(24.0, 100.0 / 24.0, 1001.0 / 24.0);
        assert_eq!(info.display_start_frame(), 1001);
        assert_eq!(info.frame_count(), 100);
        assert_eq!(info.end_frame(), 1100);
    }

    #[test]
    fn item_refs_serialize_with_kind_tag() {
        let json = serde_json::to_string(&ItemRef::Media(MediaId(7))).unwrap();
        assert_eq!(json, r#"{"kind":"media","id":7}"#);
        assert_eq!(ItemRef::from(CompId(3)).as_composition(), Some(CompId(3)));
        assert_eq!(ItemRef::from(CompId(3)).as_media(), None);
    }

    #[test]
    fn handles_display_with_kind() {
        assert_eq!(LayerId(4).to_string(), "layer#4");
        assert_eq!(RenderItemId(2).to_string(), "render#2");
    }
}
