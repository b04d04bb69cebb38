pub fn approx_tokens(s: &str) -> usize {
    // heuristic ~4 chars/token
    (s.chars().count() + 3) / 4
}

/// Trims `text` to roughly `max_tokens`, cutting at a word boundary when one is close.
pub fn cap_scene_text(text: &str, max_tokens: usize) -> &str {
    if approx_tokens(text) <= max_tokens {
        return text;
    }
    let max_chars = max_tokens * 4;
    let cut = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let head = &text[..cut];
    match head.rfind(char::is_whitespace) {
        Some(ws) if ws > cut / 2 => head[..ws].trim_end(),
        _ => head,
    }
}
