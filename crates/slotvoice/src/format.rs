//! Post-processing of the raw completion into the playback string.

use std::sync::LazyLock;

use regex::Regex;

use crate::session::Mode;

/// Pause inserted between the reel display and the spoken commentary.
pub const PAUSE_MARKER: &str = "<pause:200ms>";

static LEADING_WRAPPER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*<speak(?:\s[^>]*)?>").expect("wrapper regex is hardcoded and valid")
});

static TRAILING_WRAPPER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</speak\s*>\s*$").expect("wrapper regex is hardcoded and valid")
});

/// Remove a whole-document `<speak>` wrapper (either end, independently).
pub fn strip_wrapper(raw: &str) -> String {
    let text = LEADING_WRAPPER.replace(raw, "");
    let text = TRAILING_WRAPPER.replace(&text, "");
    text.trim().to_string()
}

/// Turn the completion text into the string returned to the game client.
///
/// PARTIAL mode returns `raw` unchanged. FULL mode returns
/// `reels + PAUSE_MARKER + raw-without-wrapper`.
pub fn format_response(mode: Mode, raw: &str, reels_display: &str) -> String {
    match mode {
        Mode::Partial => raw.to_string(),
        Mode::Full => format!("{reels_display}{PAUSE_MARKER}{}", strip_wrapper(raw)),
    }
}
