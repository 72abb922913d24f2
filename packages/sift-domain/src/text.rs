const ELLIPSIS: &str = "...";

/// Cache-key form of a query: trimmed, inner whitespace collapsed, lowercased.
///
/// Providers always receive the original text, never this form.
pub fn normalize_query(query: &str) -> String {
	let mut out = String::with_capacity(query.len());

	for word in query.split_whitespace() {
		if !out.is_empty() {
			out.push(' ');
		}

		out.extend(word.chars().flat_map(char::to_lowercase));
	}

	out
}

/// Shortens `text` to at most `max_chars` characters, ellipsis included.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
	let text = text.trim();

	if text.chars().count() <= max_chars {
		return text.to_string();
	}

	let keep = max_chars.saturating_sub(ELLIPSIS.len());
	let mut out: String = text.chars().take(keep).collect();

	out.truncate(out.trim_end().len());
	out.push_str(ELLIPSIS);

	out
}
