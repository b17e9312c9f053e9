//! Desired project state and its shot items.
//!
//! The desired state is read once per run from the JSON written by the
//! upstream tool, validated, and never mutated afterwards.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::color::ColorConfig;
use crate::error::ConfigError;
use crate::output::OutputSpec;
use crate::paths::{expand_frame_token, normalize_path};

pub const DEFAULT_FRAME_RATE: f64 = 24.0;
pub const DEFAULT_COMP_NAME: &str = "AEBridge";
pub const DEFAULT_WIDTH: u32 = 1920;
pub const DEFAULT_HEIGHT: u32 = 1080;

/// One upstream render sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotItem {
    /// Item name, unique within the config.
    pub name: String,

    /// Sequence path (may contain a printf frame token).
    #[serde(default)]
    pub path: String,

    /// Original sequence pattern as written upstream.
    #[serde(default)]
    pub pattern: String,

    /// Concrete path of the first frame, when the upstream tool knew it.
    #[serde(default)]
    pub first_file: String,

    /// First frame of the sequence.
    pub first: i64,

    /// Last frame of the sequence (inclusive).
    pub last: i64,

    /// Channel layers present in the render (informational).
    #[serde(default)]
    pub channels: Vec<String>,

    /// Upstream input index (informational).
    #[serde(default = "default_index")]
    pub index: i64,

    /// Upstream node that produced the sequence (informational).
    #[serde(default)]
    pub node_name: String,
}

fn default_index() -> i64 {
    -1
}

impl ShotItem {
    /// Create an item from a first-frame path and frame range.
    pub fn new(name: impl Into<String>, path: impl Into<String>, first: i64, last: i64) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            pattern: String::new(),
            first_file: String::new(),
            first,
            last,
            channels: vec![],
            index: -1,
            node_name: String::new(),
        }
    }

    /// Path of the file used to import the sequence.
    ///
    /// Prefers `first_file`; otherwise expands a frame token in `path`
    /// with `first`; otherwise returns `path` as written.
    pub fn source_path(&self) -> String {
        if !self.first_file.trim().is_empty() {
            return normalize_path(self.first_file.trim());
        }
        let path = self.path.trim();
        match expand_frame_token(path, self.first) {
            Some(expanded) => normalize_path(&expanded),
            None => normalize_path(path),
        }
    }

    /// Number of frames in the item.
    pub fn frame_count(&self) -> i64 {
        self.last - self.first + 1
    }
}

/// Layer timing derived from an item's frame range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShotTiming {
    /// Layer start time in the child composition (seconds).
    pub start: f64,

    /// Layer duration (seconds).
    pub duration: f64,

    /// Layer end time (seconds).
    pub end: f64,
}

impl ShotTiming {
    pub fn new(first: i64, last: i64, global_first: i64, frame_rate: f64) -> Self {
        let start = (first - global_first) as f64 / frame_rate;
        let duration = (last - first + 1) as f64 / frame_rate;
        Self {
            start,
            duration,
            end: start + duration,
        }
    }
}

/// Validated desired state for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DesiredState {
    pub frame_rate: f64,
    pub global_first: i64,
    pub global_last: i64,
    pub comp_name: String,
    pub width: u32,
    pub height: u32,
    pub items: Vec<ShotItem>,
    pub project_path: String,
    pub output_path: Option<String>,
    pub output_settings: OutputSpec,
    pub color: ColorConfig,
    pub should_render: bool,
}

/// On-disk shape of the config; every field except `project_path` has a default.
#[derive(Debug, Deserialize)]
struct RawDesiredState {
    #[serde(default = "default_frame_rate")]
    frame_rate: f64,
    #[serde(default)]
    global_first: Option<i64>,
    #[serde(default)]
    global_last: Option<i64>,
    #[serde(default = "default_comp_name")]
    comp_name: String,
    #[serde(default = "default_width")]
    width: u32,
    #[serde(default = "default_height")]
    height: u32,
    #[serde(default)]
    items: Vec<ShotItem>,
    #[serde(default)]
    project_path: String,
    #[serde(default)]
    output_path: Option<String>,
    #[serde(default)]
    output_settings: OutputSpec,
    #[serde(flatten)]
    color: ColorConfig,
    #[serde(default)]
    should_render: bool,
}

fn default_frame_rate() -> f64 {
    DEFAULT_FRAME_RATE
}

fn default_comp_name() -> String {
    DEFAULT_COMP_NAME.to_string()
}

fn default_width() -> u32 {
    DEFAULT_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_HEIGHT
}

impl DesiredState {
    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    /// Parse and validate config JSON; `origin` is only used in errors.
    pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let raw: RawDesiredState =
            serde_json::from_str(content).map_err(|e| ConfigError::ParseError {
                path: PathBuf::from(origin),
                source: e,
            })?;
        let state = Self::from_raw(raw);
        state.validate()?;
        Ok(state)
    }

    fn from_raw(raw: RawDesiredState) -> Self {
        let global_first = raw
            .global_first
            .or_else(|| raw.items.iter().map(|i| i.first).min())
            .unwrap_or(1);
        let global_last = raw
            .global_last
            .or_else(|| raw.items.iter().map(|i| i.last).max())
            .unwrap_or(global_first);

        Self {
            frame_rate: raw.frame_rate,
            global_first,
            global_last,
            comp_name: raw.comp_name.trim().to_string(),
            width: raw.width,
            height: raw.height,
            items: raw.items,
            project_path: normalize_path(raw.project_path.trim()),
            output_path: raw
                .output_path
                .map(|p| normalize_path(p.trim()))
                .filter(|p| !p.is_empty()),
            output_settings: raw.output_settings,
            color: raw.color,
            should_render: raw.should_render,
        }
    }

    /// Check every invariant of the desired state.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project_path.is_empty() {
            return Err(ConfigError::validation("missing required field 'project_path'"));
        }
        if self.should_render && self.output_path.is_none() {
            return Err(ConfigError::validation(
                "rendering was requested but 'output_path' is missing",
            ));
        }
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(ConfigError::validation(format!(
                "frame_rate must be positive, got {}",
                self.frame_rate
            )));
        }
        if self.global_last < self.global_first {
            return Err(ConfigError::validation(format!(
                "global_last ({}) is before global_first ({})",
                self.global_last, self.global_first
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::validation(format!(
                "composition size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.comp_name.is_empty() {
            return Err(ConfigError::validation("comp_name is empty"));
        }

        let mut seen = HashSet::new();
        for item in &self.items {
            if item.name.trim().is_empty() {
                return Err(ConfigError::validation("item with an empty name"));
            }
            if !seen.insert(item.name.as_str()) {
                return Err(ConfigError::validation(format!(
                    "duplicate item name '{}'",
                    item.name
                )));
            }
            if item.last < item.first {
                return Err(ConfigError::validation(format!(
                    "item '{}' ends ({}) before it starts ({})",
                    item.name, item.last, item.first
                )));
            }
            if item.source_path().is_empty() {
                return Err(ConfigError::validation(format!(
                    "item '{}' has no path",
                    item.name
                )));
            }
        }
        Ok(())
    }

    /// Frames covered by the global range.
    pub fn frame_count(&self) -> i64 {
        self.global_last - self.global_first + 1
    }

    /// Main composition duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.frame_rate
    }

    /// Layer timing for an item.
    pub fn timing_for(&self, item: &ShotItem) -> ShotTiming {
        ShotTiming::new(item.first, item.last, self.global_first, self.frame_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<DesiredState, ConfigError> {
        DesiredState::parse(json, Path::new("test.json"))
    }

    #[test]
    fn test_minimal_config_takes_defaults() {
        let state = parse(r#"{"project_path": "/p/show.aep"}"#).unwrap();
        assert_eq!(state.frame_rate, 24.0);
        assert_eq!(state.comp_name, "AEBridge");
        assert_eq!((state.width, state.height), (1920, 1080));
        assert_eq!((state.global_first, state.global_last), (1, 1));
        assert!(!state.should_render);
        assert_eq!(state.output_settings, OutputSpec::default());
    }

    #[test]
    fn test_missing_project_path_is_fatal() {
        let err = parse(r#"{"frame_rate": 25}"#).unwrap_err();
        assert!(err.to_string().contains("project_path"));
    }

    #[test]
    fn test_render_without_output_path_is_fatal() {
        let err = parse(r#"{"project_path": "/p.aep", "should_render": true}"#).unwrap_err();
        assert!(err.to_string().contains("output_path"));
    }

    #[test]
    fn test_global_range_defaults_to_item_extent() {
        let state = parse(
            r#"{
                "project_path": "/p.aep",
                "items": [
                    {"name": "bg", "path": "/r/bg.%04d.exr", "first": 1010, "last": 1080},
                    {"name": "fg", "path": "/r/fg.%04d.exr", "first": 1001, "last": 1050}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(state.global_first, 1001);
        assert_eq!(state.global_last, 1080);
        assert_eq!(state.items[0].source_path(), "/r/bg.1010.exr");
    }

    #[test]
    fn test_duplicate_item_names_rejected() {
        let err = parse(
            r#"{
                "project_path": "/p.aep",
                "items": [
                    {"name": "bg", "path": "/r/a.0001.exr", "first": 1, "last": 2},
                    {"name": "bg", "path": "/r/b.0001.exr", "first": 1, "last": 2}
                ]
            }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate item name 'bg'"));
    }

    #[test]
    fn test_inverted_ranges_rejected() {
        assert!(parse(r#"{"project_path": "/p.aep", "global_first": 10, "global_last": 5}"#).is_err());
        assert!(parse(
            r#"{"project_path": "/p.aep", "items": [{"name": "a", "path": "/a.1.exr", "first": 5, "last": 4}]}"#
        )
        .is_err());
        assert!(parse(r#"{"project_path": "/p.aep", "frame_rate": 0}"#).is_err());
    }

    #[test]
    fn test_first_file_wins_over_pattern() {
        let mut item = ShotItem::new("beauty", "/r/beauty.%04d.exr", 1001, 1100);
        item.first_file = r"\\farm\r\beauty.1001.exr".to_string();
        assert_eq!(item.source_path(), "//farm/r/beauty.1001.exr");
    }

    #[test]
    fn test_color_fields_are_flattened() {
        let state = parse(
            r#"{"project_path": "/p.aep", "nuke_colorspace": "ACES - ACEScg", "aces_compliant": true}"#,
        )
        .unwrap();
        assert!(state.color.wants_aces());
        assert_eq!(state.color.working_space, "linear");
    }

    #[test]
    fn test_timing_for_item() {
        let state = parse(r#"{"project_path": "/p.aep", "global_first": 1001, "global_last": 1100}"#)
            .unwrap();
        let item = ShotItem::new("beauty", "/x/beauty.0001.exr", 1011, 1034);
        let timing = state.timing_for(&item);
        assert!((timing.start - 10.0 / 24.0).abs() < 1e-9);
        assert!((timing.duration - 1.0).abs() < 1e-9);
        assert!((state.duration_secs() - 100.0 / 24.0).abs() < 1e-9);
    }
}
