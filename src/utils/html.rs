// src/utils/html.rs

/// Cleans quiz descriptions before they are stored.
///
/// Whitelist-based: safe formatting tags (`<b>`, `<p>`, lists) survive,
/// `<script>` (with its content), `<iframe>` and event-handler attributes are
/// removed. Returns `None` for descriptions that are empty once cleaned.
pub fn clean_description(input: Option<&str>) -> Option<String> {
    let cleaned = ammonia::clean(input?);
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
