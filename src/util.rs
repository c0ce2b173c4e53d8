// src/util.rs — Text helpers for log and terminal output

/// Truncate a string to at most `max_len` bytes without splitting a UTF-8
/// character. Used to cap verbose prompt/response logging.
pub fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        s
    } else {
        let mut end = max_len;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        &s[..end]
    }
}

/// First non-blank line of `s`, cut to `max_chars` characters with a trailing
/// ellipsis when anything was dropped (further lines included).
pub fn preview(s: &str, max_chars: usize) -> String {
    let mut lines = s.lines().map(str::trim).filter(|l| !l.is_empty());
    let Some(first) = lines.next() else {
        return String::new();
    };
    let more_lines = lines.next().is_some();
    let mut out: String = first.chars().take(max_chars).collect();
    if more_lines || first.chars().count() > max_chars {
        out.push('…');
    }
    out
}
