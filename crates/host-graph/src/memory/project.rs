//! Serializable state of an in-memory project.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::node::{
    CompId, CompositionInfo, LayerId, LayerInfo, LayerSource, MediaId, MediaInfo, RemapKey,
    RenderItemId, SettingValue,
};

pub const PROJECT_FORMAT_VERSION: &str = "1.0";

/// Everything a saved project file contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryProject {
    /// Schema version.
    pub version: String,

    /// Next id handed out; ids are shared across all node kinds.
    pub next_id: u64,

    pub compositions: Vec<CompositionNode>,

    pub media: Vec<MediaNode>,

    #[serde(default)]
    pub render_queue: Vec<RenderItemNode>,

    /// Project-level settings (color engine, working space, depth).
    #[serde(default)]
    pub settings: BTreeMap<String, SettingValue>,

    /// Renders performed against this project, oldest first.
    #[serde(default)]
    pub render_log: Vec<RenderRecord>,
}

impl Default for MemoryProject {
    fn default() -> Self {
        Self {
            version: PROJECT_FORMAT_VERSION.to_string(),
            next_id: 1,
            compositions: vec![],
            media: vec![],
            render_queue: vec![],
            settings: BTreeMap::new(),
            render_log: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionNode {
    pub id: CompId,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixel_aspect: f64,
    pub frame_rate: f64,
    pub duration: f64,
    pub display_start_time: f64,
    pub work_area_start: f64,
    pub work_area_duration: f64,
    /// Top layer first.
    pub layers: Vec<LayerNode>,
}

impl CompositionNode {
    pub fn info(&self) -> CompositionInfo {
        CompositionInfo {
            id: self.id,
            name: self.name.clone(),
            width: self.width,
            height: self.height,
            frame_rate: self.frame_rate,
            duration: self.duration,
            display_start_time: self.display_start_time,
            work_area_start: self.work_area_start,
            work_area_duration: self.work_area_duration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaNode {
    pub id: MediaId,
    pub name: String,
    pub path: Option<String>,
    pub first_frame: u64,
    pub frame_count: u64,
    pub frame_rate: f64,
    pub is_sequence: bool,
    /// Times the backing files were re-scanned in this session; not saved.
    #[serde(skip)]
    pub reloads: u32,
}

impl MediaNode {
    pub fn duration(&self) -> f64 {
        self.frame_count as f64 / self.frame_rate
    }

    pub fn info(&self) -> MediaInfo {
        MediaInfo {
            id: self.id,
            name: self.name.clone(),
            path: self.path.clone(),
            duration: self.duration(),
            frame_rate: self.frame_rate,
            is_sequence: self.is_sequence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerNode {
    pub id: LayerId,
    pub name: String,
    pub source: LayerSource,
    pub start_time: f64,
    pub in_point: f64,
    pub out_point: f64,
    pub time_remap_enabled: bool,
    #[serde(default)]
    pub remap_keys: Vec<RemapKey>,
}

impl LayerNode {
    pub fn info(&self, comp: CompId, index: usize) -> LayerInfo {
        LayerInfo {
            id: self.id,
            comp,
            index,
            name: self.name.clone(),
            source: self.source,
            start_time: self.start_time,
            in_point: self.in_point,
            out_point: self.out_point,
            time_remap_enabled: self.time_remap_enabled,
        }
    }
}

/// A queued render with its output module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderItemNode {
    pub id: RenderItemId,
    pub comp: CompId,
    pub template: Option<String>,
    pub settings: BTreeMap<String, SettingValue>,
    pub file: Option<String>,
}

/// A finished render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRecord {
    pub comp_name: String,
    pub output_file: String,
    pub template: Option<String>,
    pub settings: BTreeMap<String, SettingValue>,
    pub first_frame: i64,
    pub last_frame: i64,
    /// First number written to the output files.
    pub numbering_start: i64,
    pub rendered_at: DateTime<Utc>,
}
