//! HTTP SMS provider transport
//!
//! Posts one JSON message per send to the tenant-configured provider
//! endpoint. Authorization failures are classified as fatal; other provider
//! rejections and network failures stay per-recipient errors.

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::meta_adapter::Channel;
use crate::settings::SettingsService;
use crate::transport_adapter::{OutboundMessage, SendReceipt, TransportAdapter, TransportError};
use crate::types::TnId;

pub struct SmsHttpTransport {
	settings: Arc<SettingsService>,
}

#[derive(Deserialize)]
struct ProviderResponse {
	#[serde(rename = "messageId")]
	message_id: Box<str>,
}

impl std::fmt::Debug for SmsHttpTransport {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SmsHttpTransport").finish_non_exhaustive()
	}
}

impl SmsHttpTransport {
	pub fn new(settings: Arc<SettingsService>) -> Self {
		Self { settings }
	}

	async fn cfg(&self, tn_id: TnId, key: &str) -> Result<String, TransportError> {
		self.settings
			.get_string(tn_id, key)
			.await
			.map_err(|err| TransportError::Unauthorized(format!("SMS not configured: {}", err)))
	}
}

#[async_trait]
impl TransportAdapter for SmsHttpTransport {
	fn channel(&self) -> Channel {
		Channel::Sms
	}

	async fn send(
		&self,
		tn_id: TnId,
		msg: &OutboundMessage,
	) -> Result<SendReceipt, TransportError> {
		let enabled = self.settings.get_bool(tn_id, "sms.enabled").await.unwrap_or(true);
		if !enabled {
			return Err(TransportError::Rejected("SMS sending disabled".into()));
		}
		let api_url = self.cfg(tn_id, "sms.api_url").await?;
		let api_key = self.cfg(tn_id, "sms.api_key").await?;
		let from = self.cfg(tn_id, "sms.from").await?;

		debug!("Sending SMS to {} via {}", msg.to, api_url);

		let connector = HttpsConnectorBuilder::new()
			.with_native_roots()
			.map_err(|e| TransportError::Unavailable(format!("TLS error: {}", e)))?
			.https_or_http()
			.enable_http1()
			.enable_http2()
			.build();
		let client: Client<_, Full<Bytes>> =
			Client::builder(TokioExecutor::new()).build(connector);

		let payload = json!({
			"to": msg.to,
			"from": from,
			"body": msg.body,
			"reference": format!("campaign-{}", msg.campaign_id),
		});
		let request = hyper::Request::builder()
			.method(hyper::Method::POST)
			.uri(&api_url)
			.header("Content-Type", "application/json")
			.header("Authorization", format!("Bearer {}", api_key))
			.body(Full::new(Bytes::from(payload.to_string())))
			.map_err(|e| TransportError::Rejected(format!("Request build error: {}", e)))?;

		let response = client
			.request(request)
			.await
			.map_err(|e| TransportError::Unavailable(format!("Network error: {}", e)))?;

		let status = response.status();
		let body_bytes =
			response.into_body().collect().await.ok().map(|b| b.to_bytes()).unwrap_or_default();
		let body_str = std::str::from_utf8(&body_bytes).unwrap_or("");

		if status.is_success() {
			let message_id = serde_json::from_str::<ProviderResponse>(body_str)
				.map(|r| r.message_id)
				.unwrap_or_else(|_| format!("sms-{}", uuid::Uuid::new_v4()).into());
			Ok(SendReceipt { message_id })
		} else if status == hyper::StatusCode::UNAUTHORIZED
			|| status == hyper::StatusCode::FORBIDDEN
		{
			warn!("SMS provider rejected credentials: HTTP {}", status);
			Err(TransportError::Unauthorized(format!("HTTP {}: {}", status, body_str)))
		} else if status.is_client_error() {
			Err(TransportError::Rejected(format!("HTTP {}: {}", status, body_str)))
		} else {
			Err(TransportError::Unavailable(format!("HTTP {}", status)))
		}
	}
}

// vim: ts=4
