//! Template rendering: variable substitution, HTML normalization, and
//! text derivation shared by the email and SMS paths.
//!
//! Rendering is pure and never fails: absent variables resolve to the empty
//! string, malformed markup passes through best-effort.

pub mod context;
pub mod engine;
pub mod handler;
pub mod html;

pub use context::{EntityBundle, RenderContext, format_cents, portal_url, sample_context};
pub use engine::render;
pub use html::{html_to_text, normalize_html};

use crate::meta_adapter::{Channel, Template};

/// Fully rendered per-recipient content, ready for a transport
#[derive(Clone, Debug)]
pub struct RenderedContent {
	pub subject: Option<String>,
	pub body: String,
	/// Plaintext alternative, email only
	pub text_body: Option<String>,
}

/// Render a template for one recipient context. The email path normalizes the
/// body to HTML and derives a plaintext alternative; the SMS path stays plain.
pub fn render_message(template: &Template, ctx: &RenderContext) -> RenderedContent {
	let body = render(&template.body, ctx);
	match template.channel {
		Channel::Email => {
			let html = normalize_html(&body);
			let text = html_to_text(&html);
			RenderedContent {
				subject: template.subject.as_deref().map(|s| render(s, ctx)),
				body: html,
				text_body: Some(text),
			}
		}
		Channel::Sms => RenderedContent { subject: None, body, text_body: None },
	}
}


// vim: ts=4
