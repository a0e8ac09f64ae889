//! Per-tenant settings with defaults, used for transport credentials and
//! dispatch tuning.

pub mod service;

pub use service::SettingsService;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Typed setting value as stored in the settings table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
	Bool(bool),
	Int(i64),
	String(String),
}

/// Registered keys and their defaults. Keys without a default must be
/// configured per tenant (or globally) before use.
pub fn defaults() -> HashMap<&'static str, Option<SettingValue>> {
	HashMap::from([
		// Dispatch tuning
		("dispatch.batch_size", Some(SettingValue::Int(10))),
		("dispatch.batch_delay_ms", Some(SettingValue::Int(1000))),
		// Portal deep links
		("portal.base_url", None),
		// SMTP transport
		("email.enabled", Some(SettingValue::Bool(true))),
		("email.smtp.host", None),
		("email.smtp.port", Some(SettingValue::Int(587))),
		("email.smtp.username", None),
		("email.smtp.password", None),
		("email.smtp.tls_mode", Some(SettingValue::String("starttls".into()))),
		("email.smtp.timeout_seconds", Some(SettingValue::Int(30))),
		("email.from.address", None),
		("email.from.name", None),
		// SMS provider
		("sms.enabled", Some(SettingValue::Bool(true))),
		("sms.api_url", None),
		("sms.api_key", None),
		("sms.from", None),
	])
}

// vim: ts=4
