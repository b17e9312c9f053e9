//! Capabilities and quirks of the in-memory host.
//!
//! Real hosts differ in which primitives exist and which writes they
//! accept. These switches let a test (or a config) reproduce that.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::node::SettingValue;

/// Primitives a host may lack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ReplaceWithSequence,
    ReplaceMedia,
    ReloadMedia,
    ReplaceLayerSource,
    DisplayStartFrame,
    TimeRemap,
    ReleaseCaches,
}

/// Field names used for write rejection.
pub mod fields {
    pub const FRAME_RATE: &str = "comp.frame_rate";
    pub const DURATION: &str = "comp.duration";
    pub const DIMENSIONS: &str = "comp.dimensions";
    pub const DISPLAY_START: &str = "comp.display_start";
    pub const WORK_AREA: &str = "comp.work_area";
    pub const CREATE_COMPOSITION: &str = "comp.create";
    pub const RENAME: &str = "item.rename";
    pub const LAYER_NAME: &str = "layer.name";
    pub const LAYER_START: &str = "layer.start_time";
    pub const LAYER_IN: &str = "layer.in_point";
    pub const LAYER_OUT: &str = "layer.out_point";
    /// Reading whether time remap is on; the only refusable read.
    pub const TIME_REMAP_QUERY: &str = "layer.time_remap.query";
    pub const OUTPUT_FILE: &str = "output.file";
    pub const SAVE: &str = "project.save";
}

/// A named output-module preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputTemplate {
    pub name: String,
    pub settings: BTreeMap<String, SettingValue>,
}

impl OutputTemplate {
    pub fn new(name: &str, settings: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            settings: settings
                .iter()
                .map(|(k, v)| (k.to_string(), SettingValue::from(*v)))
                .collect(),
        }
    }
}

/// Behavior switches for [`crate::memory::MemoryHost`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostOptions {
    /// Primitives that return `Unsupported`.
    pub unsupported: BTreeSet<Capability>,

    /// Fields whose writes are rejected (see [`fields`], plus
    /// `output.<key>` and `project.<key>`).
    pub rejected_fields: BTreeSet<String>,

    pub output_templates: Vec<OutputTemplate>,

    /// Values accepted by the `Format` output setting.
    pub output_formats: Vec<String>,

    /// Output-module setting keys the host understands.
    pub output_setting_keys: BTreeSet<String>,

    /// Project setting keys the host understands.
    pub project_setting_keys: BTreeSet<String>,

    /// Frame rate assumed for imported image sequences.
    pub sequence_frame_rate: f64,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            unsupported: BTreeSet::new(),
            rejected_fields: BTreeSet::new(),
            output_templates: vec![
                OutputTemplate::new("Lossless", &[("Format", "QuickTime")]),
                OutputTemplate::new(
                    "Lossless with Alpha",
                    &[("Format", "QuickTime"), ("Channels", "RGB + Alpha")],
                ),
                OutputTemplate::new(
                    "PNG Sequence with Alpha",
                    &[
                        ("Format", "PNG Sequence"),
                        ("Channels", "RGB + Alpha"),
                        ("Depth", "Millions of Colors+"),
                    ],
                ),
            ],
            output_formats: ["PNG Sequence", "TIFF Sequence", "OpenEXR Sequence", "QuickTime"]
                .into_iter()
                .map(String::from)
                .collect(),
            output_setting_keys: ["Format", "Channels", "Depth", "Color", "Quality", "Starting #"]
                .into_iter()
                .map(String::from)
                .collect(),
            project_setting_keys: ["Bits Per Channel", "Working Space", "Linearize Working Space"]
                .into_iter()
                .map(String::from)
                .collect(),
            sequence_frame_rate: 24.0,
        }
    }
}

impl HostOptions {
    /// Make a primitive unavailable.
    pub fn without(mut self, capability: Capability) -> Self {
        self.unsupported.insert(capability);
        self
    }

    /// Make writes to a field fail.
    pub fn rejecting(mut self, field: impl Into<String>) -> Self {
        self.rejected_fields.insert(field.into());
        self
    }

    /// Replace the template list.
    pub fn with_templates(mut self, templates: Vec<OutputTemplate>) -> Self {
        self.output_templates = templates;
        self
    }

    /// Replace the accepted `Format` values.
    pub fn with_formats(mut self, formats: &[&str]) -> Self {
        self.output_formats = formats.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn supports(&self, capability: Capability) -> bool {
        !self.unsupported.contains(&capability)
    }

    pub fn rejects(&self, field: &str) -> bool {
        self.rejected_fields.contains(field)
    }
}
