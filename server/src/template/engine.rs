//! Variable substitution over the dual token syntax
//!
//! Recognizes `{{name}}` and `{name}` equivalently, case-insensitive and
//! whitespace-tolerant inside the braces. A single tokenizer pass over the
//! original string substitutes every token, so a value containing brace-like
//! text is never re-matched.

use regex::Regex;
use std::sync::LazyLock;

use super::context::RenderContext;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
	// Double-brace alternative first so `{{x}}` is not consumed as `{x}`
	Regex::new(r"\{\{\s*([A-Za-z0-9_][A-Za-z0-9_.\-]*)\s*\}\}|\{\s*([A-Za-z0-9_][A-Za-z0-9_.\-]*)\s*\}")
		.expect("static token pattern")
});

/// Substitute every recognized token. Variables absent from the context
/// resolve to the empty string; the function never fails.
pub fn render(template: &str, ctx: &RenderContext) -> String {
	let mut out = String::with_capacity(template.len());
	let mut last = 0;

	for caps in TOKEN.captures_iter(template) {
		let m = match caps.get(0) {
			Some(m) => m,
			None => continue,
		};
		let key = caps.get(1).or_else(|| caps.get(2)).map(|k| k.as_str()).unwrap_or("");
		out.push_str(&template[last..m.start()]);
		if let Some(value) = ctx.get(key) {
			out.push_str(value);
		}
		last = m.end();
	}
	out.push_str(&template[last..]);
	out
}


// vim: ts=4
