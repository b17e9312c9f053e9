//! Render destination paths.
//!
//! Renders are always written as PNG image sequences. The host expects a
//! `[#####]` frame token in the file name; upstream tools hand over paths
//! with `%04d`, `####` or `[####]` tokens, or with no token at all.

use aebridge_config_model::paths::normalize_path;
use once_cell::sync::Lazy;
use regex::Regex;

pub const FRAME_TOKEN: &str = "[#####]";

static FRAME_TOKENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%0?\d*d|\[#+\]|#+").unwrap());
static EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.[A-Za-z0-9]{1,5}$").unwrap());

/// Turn a requested output path into a PNG sequence destination.
///
/// ```
/// use aebridge_render_engine::destination::sequence_destination;
///
/// assert_eq!(sequence_destination("/out/shot.%04d.exr"), "/out/shot.[#####].png");
/// assert_eq!(sequence_destination("/out/shot.mov"), "/out/shot.[#####].png");
/// ```
pub fn sequence_destination(path: &str) -> String {
    let normalized = normalize_path(path.trim());
    let (dir, file) = match normalized.rfind('/') {
        Some(pos) => (&normalized[..=pos], &normalized[pos + 1..]),
        None => ("", normalized.as_str()),
    };

    let stem = EXTENSION.replace(file, "");
    let mut stem = FRAME_TOKENS.replace_all(&stem, FRAME_TOKEN).into_owned();
    if !stem.contains(FRAME_TOKEN) {
        stem.push('.');
        stem.push_str(FRAME_TOKEN);
    }
    format!("{dir}{stem}.png")
}
