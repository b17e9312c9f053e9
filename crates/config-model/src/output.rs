//! Render output settings.

use serde::{Deserialize, Deserializer, Serialize};

/// Desired settings for the render target's output module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSpec {
    /// Short format hint from the upstream tool (e.g. `png`).
    pub format_type: String,

    /// Output template to apply by exact name. Empty means "no template".
    #[serde(deserialize_with = "empty_as_none")]
    pub template_name: Option<String>,

    /// Channel selection, e.g. `RGB + Alpha`.
    pub channels: String,

    /// Bit depth label, e.g. `16 Bits/Channel`.
    pub depth: String,

    /// Color mode label, e.g. `Straight (Unmatted)`.
    #[serde(rename = "color")]
    pub color_mode: String,

    /// Encoder quality in `[0, 100]`.
    #[serde(deserialize_with = "number_or_string")]
    pub quality: f64,

    /// Write premultiplied (matted) color instead of straight.
    pub premultiplied: bool,
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            format_type: "png".to_string(),
            template_name: None,
            channels: "RGB + Alpha".to_string(),
            depth: "16 Bits/Channel".to_string(),
            color_mode: "Straight (Unmatted)".to_string(),
            quality: 100.0,
            premultiplied: false,
        }
    }
}

impl OutputSpec {
    /// Template name when one was requested.
    pub fn template(&self) -> Option<&str> {
        self.template_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Color mode actually written, honoring the premultiplied flag.
    pub fn effective_color_mode(&self) -> &str {
        if self.premultiplied {
            "Premultiplied (Matted)"
        } else {
            &self.color_mode
        }
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// The upstream tool writes quality as `"100"`; accept numbers too.
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Quality {
        Number(f64),
        Text(String),
    }

    match Quality::deserialize(deserializer)? {
        Quality::Number(n) => Ok(n),
        Quality::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid quality value '{s}'"))),
    }
}
