//! Color workflow fields carried over from the upstream tool.

use serde::{Deserialize, Serialize};

/// Upstream color settings, flattened into the top level of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Colorspace of the rendered shots.
    #[serde(rename = "nuke_colorspace")]
    pub colorspace: String,

    /// Upstream working space.
    #[serde(rename = "nuke_working_space")]
    pub working_space: String,

    /// Upstream view/output transform, empty when unset.
    #[serde(rename = "nuke_output_transform")]
    pub output_transform: String,

    /// Shots were written as ACES-compliant EXRs.
    pub aces_compliant: bool,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            colorspace: "scene_linear".to_string(),
            working_space: "linear".to_string(),
            output_transform: String::new(),
            aces_compliant: false,
        }
    }
}

/// Canonical colorspace families the policy distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorFamily {
    Linear,
    Srgb,
    AcesCg,
    Other,
}

impl ColorConfig {
    /// Normalized name of the shots' colorspace.
    pub fn normalized_colorspace(&self) -> String {
        normalize_colorspace_name(&self.colorspace)
    }

    /// The family the shots' colorspace belongs to.
    pub fn family(&self) -> ColorFamily {
        match self.normalized_colorspace().as_str() {
            "linear" => ColorFamily::Linear,
            "sRGB" => ColorFamily::Srgb,
            "ACEScg" => ColorFamily::AcesCg,
            _ => ColorFamily::Other,
        }
    }

    /// Whether the downstream project should run an OCIO/ACES workflow.
    pub fn wants_aces(&self) -> bool {
        self.aces_compliant || self.family() == ColorFamily::AcesCg
    }

    /// Whether the downstream working space should be linearized.
    pub fn is_scene_linear(&self) -> bool {
        matches!(self.family(), ColorFamily::Linear | ColorFamily::AcesCg)
    }
}

/// Map the many spellings of common colorspaces to one name.
///
/// Unknown names are returned unchanged; an empty name means linear.
pub fn normalize_colorspace_name(name: &str) -> String {
    let n = name.trim().to_lowercase();
    if n.is_empty() {
        return "linear".to_string();
    }
    if n.contains("default") && n.contains("linear") {
        return "linear".to_string();
    }
    if matches!(
        n.as_str(),
        "srgb" | "s rgb" | "s-rgb" | "srgb (~2.20)" | "srgb  ~2.20"
    ) {
        return "sRGB".to_string();
    }
    if n.contains("acescg") {
        return "ACEScg".to_string();
    }
    if n.contains("reference") {
        return "linear".to_string();
    }
    if n.contains("color_picking") && n.contains("srgb") {
        return "sRGB".to_string();
    }
    if n == "linear" || n == "scene_linear" || (n.starts_with("rgb") && n.contains("linear")) {
        return "linear".to_string();
    }
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_aliases_collapse() {
        for alias in ["default (linear)", "scene_linear", "Linear", "reference", "RGB linear", ""] {
            assert_eq!(normalize_colorspace_name(alias), "linear", "{alias}");
        }
    }

    #[test]
    fn srgb_and_aces_aliases_collapse() {
        assert_eq!(normalize_colorspace_name("sRGB (~2.20)"), "sRGB");
        assert_eq!(normalize_colorspace_name("color_picking (sRGB)"), "sRGB");
        assert_eq!(normalize_colorspace_name("ACES - ACEScg"), "ACEScg");
    }

    #[test]
    fn unknown_names_pass_through() {
        assert_eq!(normalize_colorspace_name("Rec.709"), "Rec.709");
    }

    #[test]
    fn aces_flag_or_acescg_space_wants_aces() {
        let mut color = ColorConfig::default();
        assert!(!color.wants_aces());
        assert!(color.is_scene_linear());

        color.colorspace = "ACES - ACEScg".to_string();
        assert!(color.wants_aces());

        color.colorspace = "sRGB".to_string();
        color.aces_compliant = true;
        assert!(color.wants_aces());
        assert!(!color.is_scene_linear());
    }
}
