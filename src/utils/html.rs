// src/utils/html.rs

use std::collections::HashSet;

/// Clean admin-authored HTML (announcements, event descriptions) before display.
///
/// Whitelist-based: safe tags like <b> and <p> survive, <script> and <iframe> are
/// dropped together with event-handler attributes such as onclick.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Plain-text preview of rich text, cut at `max_chars` characters.
pub fn preview(input: &str, max_chars: usize) -> String {
    let text = ammonia::Builder::empty()
        .clean_content_tags(HashSet::from(["script", "style"]))
        .clean(input)
        .to_string();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if text.chars().count() <= max_chars {
        return text;
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push('…');
    cut
}
