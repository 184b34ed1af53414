//! Parsing of the WebUI's generation-parameters text.
//!
//! The WebUI stores a free-form text block in generated PNGs: the prompt,
//! then optionally a "Negative prompt:" line, then a "Steps: ..." settings
//! line. The format is not a stable contract, so recovery is best-effort.

use std::sync::LazyLock;

use regex::Regex;

/// Everything before the first "Negative prompt:" or "Steps:" marker.
static PROMPT_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^(.*?)(?:Negative prompt:|Steps:)").unwrap());

/// Recover the positive prompt from a generation-parameters text block.
///
/// Returns `None` when no marker is found or nothing precedes it; callers
/// treat that as "prompt unknown" and fall back to an empty prompt.
pub fn extract_prompt(info: &str) -> Option<String> {
    let captures = PROMPT_BOUNDARY.captures(info)?;
    let prompt = captures.get(1)?.as_str().trim();
    if prompt.is_empty() {
        None
    } else {
        Some(prompt.to_string())
    }
}
