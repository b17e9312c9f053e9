//! Numbered image-sequence paths and the names hosts give them.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

static FRAME_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<prefix>.*?)(?P<frame>\d+)\.(?P<ext>[A-Za-z0-9]+)$").unwrap());

/// Suffix hosts append to a sequence's base name: `.[1001-1100].exr`, `_0001.png`, ...
static RANGE_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:[._\- ]|\[)[\d.\[\]\-]*\.(exr|png|jpe?g|tiff?|dpx|tga|psd|hdr|cin|sgi|bmp|gif|webp)$",
    )
    .unwrap()
});

/// One frame of a numbered sequence, split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencePath {
    /// Directory, without trailing slash; empty for bare file names.
    pub dir: String,
    /// File name up to the frame number (separator included).
    pub prefix: String,
    pub frame: u64,
    /// Digits in the frame number as written.
    pub padding: usize,
    /// Extension without the dot.
    pub ext: String,
}

impl SequencePath {
    /// Split a frame path; `None` when the file name has no trailing frame number.
    pub fn parse(path: &str) -> Option<Self> {
        let normalized = path.replace('\\', "/");
        let (dir, file) = match normalized.rfind('/') {
            Some(pos) => (normalized[..pos].to_string(), &normalized[pos + 1..]),
            None => (String::new(), normalized.as_str()),
        };
        let caps = FRAME_FILE.captures(file)?;
        let digits = caps.name("frame")?.as_str();
        Some(Self {
            dir,
            prefix: caps.name("prefix")?.as_str().to_string(),
            frame: digits.parse().ok()?,
            padding: digits.len(),
            ext: caps.name("ext")?.as_str().to_string(),
        })
    }

    /// Path of another frame in the same sequence.
    pub fn frame_path(&self, frame: u64) -> String {
        let file = format!(
            "{}{:0pad$}.{}",
            self.prefix,
            frame,
            self.ext,
            pad = self.padding
        );
        if self.dir.is_empty() {
            file
        } else {
            format!("{}/{}", self.dir, file)
        }
    }

    /// Name a host gives the imported sequence, e.g. `beauty.[1001-1100].exr`.
    pub fn display_name(&self, first: u64, last: u64) -> String {
        if first == last {
            return format!("{}{:0pad$}.{}", self.prefix, first, self.ext, pad = self.padding);
        }
        format!(
            "{}[{:0pad$}-{:0pad$}].{}",
            self.prefix,
            first,
            last,
            self.ext,
            pad = self.padding
        )
    }

    /// Frame numbers of this sequence present on disk, ascending.
    pub fn scan_frames(&self) -> std::io::Result<Vec<u64>> {
        let dir = if self.dir.is_empty() { "." } else { self.dir.as_str() };
        let suffix = format!(".{}", self.ext);
        let mut frames = vec![];
        for entry in std::fs::read_dir(Path::new(dir))? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(middle) = name
                .strip_prefix(self.prefix.as_str())
                .and_then(|rest| rest.strip_suffix(suffix.as_str()))
            else {
                continue;
            };
            if !middle.is_empty() && middle.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(frame) = middle.parse() {
                    frames.push(frame);
                }
            }
        }
        frames.sort_unstable();
        frames.dedup();
        Ok(frames)
    }
}

/// Whether `candidate` is `base` plus a host-generated frame-range suffix.
///
/// `beauty.[1001-1100].exr` and `beauty_0001.png` match `beauty`;
/// `beauty_v2.[1001-1100].exr` does not.
pub fn is_sequence_name_of(candidate: &str, base: &str) -> bool {
    if base.is_empty() {
        return false;
    }
    match candidate.strip_prefix(base) {
        Some(suffix) => !suffix.is_empty() && RANGE_SUFFIX.is_match(suffix),
        None => false,
    }
}
