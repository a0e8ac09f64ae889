//! Settings service with caching and tenant/global/default resolution

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::error::{ClResult, Error};
use crate::meta_adapter::MetaAdapter;
use crate::prelude::*;

use super::SettingValue;

const CACHE_SIZE: usize = 256;

/// Main interface for reading and writing per-tenant settings.
/// Resolution order: tenant row, global row (tenant 0), registered default.
pub struct SettingsService {
	meta: Arc<dyn MetaAdapter>,
	defaults: std::collections::HashMap<&'static str, Option<SettingValue>>,
	cache: parking_lot::RwLock<LruCache<(TnId, String), SettingValue>>,
}

impl SettingsService {
	pub fn new(meta: Arc<dyn MetaAdapter>) -> Self {
		let capacity = NonZeroUsize::new(CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
		Self {
			meta,
			defaults: super::defaults(),
			cache: parking_lot::RwLock::new(LruCache::new(capacity)),
		}
	}

	pub async fn get(&self, tn_id: TnId, key: &str) -> ClResult<SettingValue> {
		if let Some(value) = self.cache.write().get(&(tn_id, key.to_string())) {
			return Ok(value.clone());
		}

		let default = self
			.defaults
			.get(key)
			.ok_or_else(|| Error::ValidationError(format!("Unknown setting: {}", key)))?;

		// Tenant-specific, then global
		if tn_id.0 != 0 {
			if let Some(json_value) = self.meta.read_setting(tn_id, key).await? {
				return self.decode_and_cache(tn_id, key, json_value);
			}
		}
		if let Some(json_value) = self.meta.read_setting(TnId(0), key).await? {
			return self.decode_and_cache(tn_id, key, json_value);
		}

		match default {
			Some(value) => {
				let value = value.clone();
				self.cache.write().put((tn_id, key.to_string()), value.clone());
				Ok(value)
			}
			None => Err(Error::ConfigError(format!(
				"Setting '{}' has no default and must be configured",
				key
			))),
		}
	}

	pub async fn set(&self, tn_id: TnId, key: &str, value: SettingValue) -> ClResult<()> {
		if !self.defaults.contains_key(key) {
			return Err(Error::ValidationError(format!("Unknown setting: {}", key)));
		}
		let json_value =
			serde_json::to_value(&value).map_err(|_| Error::Internal)?;
		self.meta.write_setting(tn_id, key, &json_value).await?;
		self.cache.write().pop(&(tn_id, key.to_string()));
		debug!("Setting updated: {}.{}", tn_id, key);
		Ok(())
	}

	pub async fn get_string(&self, tn_id: TnId, key: &str) -> ClResult<String> {
		match self.get(tn_id, key).await? {
			SettingValue::String(s) => Ok(s),
			_ => Err(Error::ConfigError(format!("Setting {} is not a string", key))),
		}
	}

	pub async fn get_int(&self, tn_id: TnId, key: &str) -> ClResult<i64> {
		match self.get(tn_id, key).await? {
			SettingValue::Int(i) => Ok(i),
			_ => Err(Error::ConfigError(format!("Setting {} is not an int", key))),
		}
	}

	pub async fn get_bool(&self, tn_id: TnId, key: &str) -> ClResult<bool> {
		match self.get(tn_id, key).await? {
			SettingValue::Bool(b) => Ok(b),
			_ => Err(Error::ConfigError(format!("Setting {} is not a bool", key))),
		}
	}

	fn decode_and_cache(
		&self,
		tn_id: TnId,
		key: &str,
		json_value: serde_json::Value,
	) -> ClResult<SettingValue> {
		let value = serde_json::from_value::<SettingValue>(json_value)
			.map_err(|e| Error::ValidationError(format!("Invalid setting value: {}", e)))?;
		self.cache.write().put((tn_id, key.to_string()), value.clone());
		Ok(value)
	}
}

// vim: ts=4
