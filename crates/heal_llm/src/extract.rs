//! Code extraction from model responses.

use std::sync::LazyLock;

use heal_runner::LanguageProfile;
use regex::Regex;

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[ \t]*([A-Za-z0-9_+#.-]*)[^\n]*\n(.*?)```").expect("fence regex is valid")
});

/// Pull the program out of a model response.
///
/// Prefers a fenced block tagged with the profile's language or one of its
/// aliases, then the first fenced block, then the whole response trimmed.
pub fn extract_code(response: &str, profile: &LanguageProfile) -> String {
    let blocks: Vec<(&str, &str)> = FENCE_RE
        .captures_iter(response)
        .filter_map(|caps| Some((caps.get(1)?.as_str(), caps.get(2)?.as_str())))
        .collect();

    if let Some((_, body)) = blocks
        .iter()
        .find(|(tag, _)| !tag.is_empty() && profile.matches_name(tag))
    {
        return normalize(body);
    }
    if let Some((_, body)) = blocks.first() {
        return normalize(body);
    }

    let trimmed = response.trim();
    match trimmed.strip_prefix("```") {
        // Unterminated fence: drop the opening line.
        Some(rest) => normalize(rest.split_once('\n').map(|(_, body)| body).unwrap_or("")),
        None => trimmed.to_string(),
    }
}

fn normalize(body: &str) -> String {
    let mut code = body.trim_matches('\n').trim_end().to_string();
    code.push('\n');
    code
}
