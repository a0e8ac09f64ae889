//! SMTP email transport using lettre
//!
//! Connection parameters come from the tenant's `email.*` settings. A missing
//! or rejected credential set is classified as fatal so a running dispatch
//! aborts instead of burning through the recipient list.

use async_trait::async_trait;
use lettre::transport::smtp::SmtpTransport;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, Transport};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::meta_adapter::Channel;
use crate::settings::SettingsService;
use crate::transport_adapter::{OutboundMessage, SendReceipt, TransportAdapter, TransportError};
use crate::types::TnId;

pub struct SmtpEmailTransport {
	settings: Arc<SettingsService>,
}

struct SmtpConfig {
	host: String,
	port: u16,
	username: String,
	password: String,
	from_address: String,
	from_name: String,
	tls_mode: String,
	timeout_seconds: u64,
}

impl std::fmt::Debug for SmtpEmailTransport {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SmtpEmailTransport").finish_non_exhaustive()
	}
}

impl SmtpEmailTransport {
	pub fn new(settings: Arc<SettingsService>) -> Self {
		Self { settings }
	}

	async fn cfg_str(&self, tn_id: TnId, key: &str) -> Result<String, TransportError> {
		self.settings
			.get_string(tn_id, key)
			.await
			.map_err(|err| TransportError::Unauthorized(format!("SMTP not configured: {}", err)))
	}

	async fn cfg_int(&self, tn_id: TnId, key: &str) -> Result<i64, TransportError> {
		self.settings
			.get_int(tn_id, key)
			.await
			.map_err(|err| TransportError::Unauthorized(format!("SMTP not configured: {}", err)))
	}

	async fn config(&self, tn_id: TnId) -> Result<SmtpConfig, TransportError> {
		Ok(SmtpConfig {
			host: self.cfg_str(tn_id, "email.smtp.host").await?,
			port: self.cfg_int(tn_id, "email.smtp.port").await? as u16,
			username: self.cfg_str(tn_id, "email.smtp.username").await?,
			password: self.cfg_str(tn_id, "email.smtp.password").await?,
			from_address: self.cfg_str(tn_id, "email.from.address").await?,
			from_name: self.cfg_str(tn_id, "email.from.name").await?,
			tls_mode: self.cfg_str(tn_id, "email.smtp.tls_mode").await?,
			timeout_seconds: self.cfg_int(tn_id, "email.smtp.timeout_seconds").await? as u64,
		})
	}
}

#[async_trait]
impl TransportAdapter for SmtpEmailTransport {
	fn channel(&self) -> Channel {
		Channel::Email
	}

	async fn send(
		&self,
		tn_id: TnId,
		msg: &OutboundMessage,
	) -> Result<SendReceipt, TransportError> {
		let enabled = self.settings.get_bool(tn_id, "email.enabled").await.unwrap_or(true);
		if !enabled {
			return Err(TransportError::Rejected("Email sending disabled".into()));
		}
		let config = self.config(tn_id).await?;

		if !msg.to.contains('@') {
			return Err(TransportError::Rejected(format!(
				"Invalid recipient address: {}",
				msg.to
			)));
		}

		debug!("Sending email to {} via {}:{}", msg.to, config.host, config.port);

		let builder = Message::builder()
			.from(
				format!("{} <{}>", config.from_name, config.from_address)
					.parse()
					.map_err(|_| TransportError::Rejected("Invalid from address".into()))?,
			)
			.to(msg
				.to
				.parse()
				.map_err(|_| TransportError::Rejected("Invalid recipient address".into()))?)
			.subject(msg.subject.as_deref().unwrap_or_default());

		let email = match &msg.text_body {
			Some(text_body) => builder.multipart(
				lettre::message::MultiPart::alternative()
					.singlepart(lettre::message::SinglePart::plain(text_body.to_string()))
					.singlepart(lettre::message::SinglePart::html(msg.body.to_string())),
			),
			None => builder.singlepart(lettre::message::SinglePart::html(msg.body.to_string())),
		}
		.map_err(|e| TransportError::Rejected(format!("Failed to build email: {}", e)))?;

		let tls = match config.tls_mode.as_str() {
			"tls" => lettre::transport::smtp::client::Tls::Wrapper(
				lettre::transport::smtp::client::TlsParameters::builder(config.host.clone())
					.build()
					.map_err(|e| {
						TransportError::Unauthorized(format!("TLS configuration error: {}", e))
					})?,
			),
			"starttls" => lettre::transport::smtp::client::Tls::Opportunistic(
				lettre::transport::smtp::client::TlsParameters::builder(config.host.clone())
					.build()
					.map_err(|e| {
						TransportError::Unauthorized(format!("TLS configuration error: {}", e))
					})?,
			),
			"none" => lettre::transport::smtp::client::Tls::None,
			other => {
				return Err(TransportError::Unauthorized(format!(
					"Invalid TLS mode: {}. Must be 'none', 'starttls', or 'tls'",
					other
				)));
			}
		};

		let credentials = Credentials::new(config.username, config.password);
		let mailer = SmtpTransport::builder_dangerous(&config.host)
			.port(config.port)
			.timeout(Some(Duration::from_secs(config.timeout_seconds)))
			.tls(tls)
			.credentials(credentials)
			.build();

		match mailer.send(&email) {
			Ok(_) => Ok(SendReceipt { message_id: format!("smtp-{}", uuid::Uuid::new_v4()).into() }),
			Err(err) => {
				warn!("SMTP send to {} failed: {}", msg.to, err);
				let text = err.to_string();
				if text.contains("535") || text.to_lowercase().contains("authentication") {
					Err(TransportError::Unauthorized(text))
				} else if err.is_permanent() {
					Err(TransportError::Rejected(text))
				} else {
					Err(TransportError::Unavailable(text))
				}
			}
		}
	}
}

// vim: ts=4
