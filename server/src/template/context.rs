//! Render context assembly
//!
//! Built-ins are merged in a fixed precedence order (consumer, account,
//! tenant branding, computed fields), then the free-form `x` maps are applied
//! last and only for keys no built-in already claimed. A custom key sharing a
//! built-in's name therefore has no effect; that matches the historical
//! behavior and is intentional.

use std::collections::HashMap;
use url::Url;

use crate::meta_adapter::{Account, Consumer, Tenant};

/// Settlement offer percentages, of the full balance
const SETTLEMENT_PCTS: [(u8, f64); 6] =
	[(50, 0.5), (60, 0.6), (70, 0.7), (80, 0.8), (90, 0.9), (100, 1.0)];

/// Case-insensitive variable map. Keys are normalized to lowercase on insert
/// and lookup.
#[derive(Clone, Debug, Default)]
pub struct RenderContext {
	vars: HashMap<String, String>,
}

impl RenderContext {
	pub fn new() -> Self {
		Self { vars: HashMap::new() }
	}

	/// Insert a built-in; later built-in stages override earlier ones
	pub fn insert(&mut self, key: &str, value: impl Into<String>) {
		self.vars.insert(key.to_ascii_lowercase(), value.into());
	}

	/// Insert a custom key only when no built-in of that name exists
	pub fn insert_custom(&mut self, key: &str, value: impl Into<String>) {
		self.vars.entry(key.to_ascii_lowercase()).or_insert_with(|| value.into());
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.vars.get(&key.to_ascii_lowercase()).map(String::as_str)
	}

	/// Built-in key set, for diagnostics and tests
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.vars.keys().map(String::as_str)
	}
}

/// Everything one render call may draw from
#[derive(Clone, Copy, Debug)]
pub struct EntityBundle<'a> {
	pub consumer: &'a Consumer,
	pub account: Option<&'a Account>,
	pub tenant: &'a Tenant,
	/// Request-origin/config base for portal deep links
	pub portal_base: Option<&'a str>,
}

impl EntityBundle<'_> {
	/// Assemble the full variable map for this recipient
	pub fn context(&self) -> RenderContext {
		let mut ctx = RenderContext::new();
		let consumer = self.consumer;

		// Consumer fields
		ctx.insert("firstname", consumer.first_name.as_ref());
		ctx.insert("lastname", consumer.last_name.as_ref());
		ctx.insert("name", format!("{} {}", consumer.first_name, consumer.last_name));
		ctx.insert("email", consumer.email.as_deref().unwrap_or(""));
		ctx.insert("phone", consumer.phones.first().map(AsRef::as_ref).unwrap_or(""));

		// Account fields
		if let Some(account) = self.account {
			ctx.insert("accountnumber", account.account_number.as_deref().unwrap_or(""));
			ctx.insert("creditor", account.creditor.as_deref().unwrap_or(""));
			ctx.insert("duedate", account.due_date.map(|d| d.format("%m/%d/%Y").to_string()).unwrap_or_default());
			ctx.insert("duedateiso", account.due_date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default());
		}

		// Tenant branding
		let tenant = self.tenant;
		ctx.insert("agencyname", tenant.name.as_ref());
		ctx.insert("agencyemail", tenant.from_email.as_deref().unwrap_or(""));
		ctx.insert("agencyphone", tenant.phone.as_deref().unwrap_or(""));
		if let Some(base) = self.portal_base {
			ctx.insert("portallink", portal_url(base, tenant.portal_slug.as_deref().unwrap_or("")));
		}

		// Computed fields
		let balance = self.account.and_then(|a| a.balance_cents);
		ctx.insert("balance", format_cents(balance));
		for (label, pct) in SETTLEMENT_PCTS {
			let offer = balance.map(|cents| (cents as f64 * pct).round() as i64);
			ctx.insert(&format!("balance{}", label), format_cents(offer));
		}

		// Custom key/value pairs, applied last
		for (key, value) in &consumer.x {
			ctx.insert_custom(key, value.as_ref());
		}
		if let Some(account) = self.account {
			for (key, value) in &account.x {
				ctx.insert_custom(key, value.as_ref());
			}
		}
		for (key, value) in &tenant.x {
			ctx.insert_custom(key, value.as_ref());
		}

		ctx
	}
}

/// Integer cents to `$1234.56`. Missing input renders as the empty string,
/// never `$NaN`.
pub fn format_cents(cents: Option<i64>) -> String {
	match cents {
		Some(cents) => format!("${:.2}", cents as f64 / 100.0),
		None => String::new(),
	}
}

/// Single resolver for portal deep links: configured origin + tenant slug.
pub fn portal_url(base: &str, slug: &str) -> String {
	// A trailing slash keeps Url::join from replacing the last path segment
	let normalized = format!("{}/", base.trim_end_matches('/'));
	match Url::parse(&normalized).and_then(|url| url.join(slug.trim_matches('/'))) {
		Ok(url) => url.to_string().trim_end_matches('/').to_string(),
		Err(_) => format!("{}/{}", base.trim_end_matches('/'), slug.trim_matches('/')),
	}
}

/// Synthetic sample data for template previews
pub fn sample_context(tenant: &Tenant, portal_base: Option<&str>) -> RenderContext {
	let consumer = Consumer {
		consumer_id: 0,
		first_name: "Jordan".into(),
		last_name: "Sample".into(),
		email: Some("jordan.sample@example.com".into()),
		phones: Box::new(["+15550123456".into()]),
		import_batch_id: None,
		x: HashMap::new(),
		created_at: crate::types::Timestamp(0),
	};
	let account = Account {
		account_id: 0,
		consumer_id: 0,
		account_number: Some("ACCT-1001".into()),
		creditor: Some("Acme Bank".into()),
		balance_cents: Some(123_456),
		due_date: chrono::NaiveDate::from_ymd_opt(2025, 6, 1),
		status: Some("open".into()),
		x: HashMap::new(),
	};
	EntityBundle { consumer: &consumer, account: Some(&account), tenant, portal_base }.context()
}


// vim: ts=4
