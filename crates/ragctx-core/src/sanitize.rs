//! Query text clean-up applied before a query is embedded.

/// Default cap for query length, in characters.
pub const MAX_QUERY_CHARS: usize = 1_500;

/// Replace control characters with spaces, collapse whitespace and cap the
/// result at `max_len` characters. Truncated text ends with an ellipsis.
pub fn sanitize_query(text: &str, max_len: usize) -> String {
    let replaced: String = text.chars().map(|c| if c.is_control() { ' ' } else { c }).collect();
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_len {
        return collapsed;
    }
    let mut truncated: String = collapsed.chars().take(max_len).collect();
    truncated.truncate(truncated.trim_end().len());
    truncated.push('…');
    truncated
}
