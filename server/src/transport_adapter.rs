//! Outbound transport adapter trait
//!
//! A transport sends one message and returns a provider message id or an
//! error. Errors are classified so the dispatcher can tell a per-recipient
//! failure (recorded, batch continues) from a fatal one (credentials rejected,
//! campaign aborts).

use async_trait::async_trait;
use std::fmt::Debug;

use crate::meta_adapter::Channel;
use crate::types::TnId;

/// One rendered, addressed message ready for a provider
#[derive(Clone, Debug)]
pub struct OutboundMessage {
	pub channel: Channel,
	pub to: Box<str>,
	/// Email only
	pub subject: Option<Box<str>>,
	pub body: Box<str>,
	/// Plaintext alternative for email multipart
	pub text_body: Option<Box<str>>,
	pub campaign_id: u64,
	pub consumer_id: u64,
}

#[derive(Clone, Debug)]
pub struct SendReceipt {
	pub message_id: Box<str>,
}

#[derive(Debug)]
pub enum TransportError {
	/// Provider rejected this message; the batch continues
	Rejected(String),
	/// Credential/authorization rejection; dispatch cannot continue
	Unauthorized(String),
	/// Provider unreachable or timed out; a normal error for this recipient
	Unavailable(String),
}

impl TransportError {
	pub fn is_fatal(&self) -> bool {
		matches!(self, TransportError::Unauthorized(_))
	}
}

impl std::fmt::Display for TransportError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			TransportError::Rejected(msg) => write!(f, "rejected: {}", msg),
			TransportError::Unauthorized(msg) => write!(f, "unauthorized: {}", msg),
			TransportError::Unavailable(msg) => write!(f, "unavailable: {}", msg),
		}
	}
}

#[async_trait]
pub trait TransportAdapter: Debug + Send + Sync {
	fn channel(&self) -> Channel;
	async fn send(&self, tn_id: TnId, msg: &OutboundMessage)
		-> Result<SendReceipt, TransportError>;
}

// vim: ts=4
