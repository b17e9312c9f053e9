//! Path normalization and frame-token handling.
//!
//! Paths arrive from the upstream tool in whatever form the OS produced.
//! Comparisons against paths stored in the project graph always go through
//! [`normalize_path`] first.

use once_cell::sync::Lazy;
use regex::Regex;

static REPEATED_SLASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"/+").unwrap());
static PRINTF_FRAME_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"%0?(\d*)d").unwrap());

/// Normalize a path to forward slashes with no repeated separators.
///
/// A leading `//` (UNC share) is preserved.
pub fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    let p = path.replace('\\', "/");
    match p.strip_prefix("//") {
        Some(rest) => format!("//{}", REPEATED_SLASHES.replace_all(rest, "/")),
        None => REPEATED_SLASHES.replace_all(&p, "/").into_owned(),
    }
}

/// True when both paths point at the same file after normalization.
pub fn same_path(a: &str, b: &str) -> bool {
    let (a, b) = (normalize_path(a), normalize_path(b));
    if cfg!(windows) {
        a.eq_ignore_ascii_case(&b)
    } else {
        a == b
    }
}

/// Substitute a printf-style frame token (`%04d`, `%d`) with `frame`.
///
/// Returns `None` when the pattern has no token.
pub fn expand_frame_token(pattern: &str, frame: i64) -> Option<String> {
    let caps = PRINTF_FRAME_TOKEN.captures(pattern)?;
    let width: usize = caps
        .get(1)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    let token = caps.get(0)?;
    Some(format!(
        "{}{:0width$}{}",
        &pattern[..token.start()],
        frame,
        &pattern[token.end()..]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_windows_separators() {
        assert_eq!(
            normalize_path(r"C:\shots\\beauty\beauty.0001.exr"),
            "C:/shots/beauty/beauty.0001.exr"
        );
    }

    #[test]
    fn preserves_unc_prefix() {
        assert_eq!(
            normalize_path(r"\\server\share\\renders\a.exr"),
            "//server/share/renders/a.exr"
        );
    }

    #[test]
    fn empty_path_stays_empty() {
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn same_path_ignores_separator_style() {
        assert!(same_path("/x//beauty.0001.exr", r"\x\beauty.0001.exr"));
        assert!(!same_path("/x/beauty.0001.exr", "/y/beauty.0001.exr"));
    }

    #[test]
    fn expands_padded_and_bare_tokens() {
        assert_eq!(
            expand_frame_token("/r/beauty.%04d.exr", 1001).as_deref(),
            Some("/r/beauty.1001.exr")
        );
        assert_eq!(
            expand_frame_token("/r/beauty.%04d.exr", 7).as_deref(),
            Some("/r/beauty.0007.exr")
        );
        assert_eq!(
            expand_frame_token("/r/beauty.%d.exr", 7).as_deref(),
            Some("/r/beauty.7.exr")
        );
        assert_eq!(expand_frame_token("/r/beauty.exr", 7), None);
    }
}
