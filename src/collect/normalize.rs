//! Text normalization shared by line and frame segmentation.

use regex::Regex;
use std::sync::OnceLock;

/// CSI sequences: ESC `[`, parameter bytes, intermediate bytes, final byte.
fn ansi_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\x1B\[[0-?]*[ -/]*[@-~]").expect("valid ANSI pattern"))
}

/// Remove ANSI CSI escape sequences.
pub fn strip_ansi(text: &str) -> String {
    ansi_pattern().replace_all(text, "").into_owned()
}

/// Strip ANSI codes and carriage returns, then trim surrounding whitespace.
pub fn normalize(text: &str) -> String {
    strip_ansi(text).replace('\r', "").trim().to_string()
}
