//! HTML normalization and best-effort text derivation
//!
//! Plain-text email bodies are escaped and wrapped into paragraph markup;
//! bodies that already look like HTML pass through unchanged. The reverse
//! transform derives plaintext for SMS previews and the email multipart
//! alternative. Neither direction fails on malformed markup.

use regex::Regex;
use std::sync::LazyLock;

static BR: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("static pattern"));
static P_CLOSE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?i)</p\s*>").expect("static pattern"));

/// Permissive "starts with an HTML tag" heuristic
pub fn looks_like_html(body: &str) -> bool {
	let trimmed = body.trim_start();
	let mut chars = trimmed.chars();
	matches!(
		(chars.next(), chars.next()),
		(Some('<'), Some(c)) if c.is_ascii_alphabetic() || c == '!' || c == '/'
	)
}

pub fn escape_html(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#39;"),
			c => out.push(c),
		}
	}
	out
}

/// Wrap plain text into paragraph/line-break markup. Escaping happens before
/// wrapping so plain-text fields cannot inject markup. HTML-looking input is
/// returned unchanged.
pub fn normalize_html(body: &str) -> String {
	if looks_like_html(body) {
		return body.to_string();
	}
	let escaped = escape_html(body);
	let paragraphs: Vec<String> = escaped
		.split("\n\n")
		.filter(|p| !p.trim().is_empty())
		.map(|p| format!("<p>{}</p>", p.trim().replace('\n', "<br>")))
		.collect();
	if paragraphs.is_empty() {
		String::new()
	} else {
		paragraphs.join("\n")
	}
}

/// Strip tags, turn `<br>`/`</p>` into newlines, decode the five standard
/// entities. Best-effort; never fails on malformed markup.
pub fn html_to_text(html: &str) -> String {
	let with_breaks = BR.replace_all(html, "\n");
	let with_paragraphs = P_CLOSE.replace_all(&with_breaks, "\n\n");

	let mut out = String::with_capacity(with_paragraphs.len());
	let mut in_tag = false;
	for c in with_paragraphs.chars() {
		match c {
			'<' => in_tag = true,
			'>' if in_tag => in_tag = false,
			c if !in_tag => out.push(c),
			_ => {}
		}
	}

	let decoded = out
		.replace("&lt;", "<")
		.replace("&gt;", ">")
		.replace("&quot;", "\"")
		.replace("&#39;", "'")
		.replace("&amp;", "&");
	decoded.trim().to_string()
}


// vim: ts=4
