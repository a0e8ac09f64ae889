//! Platform error type and result alias
//!
//! One enum covers the whole taxonomy: validation and resolution failures are
//! rejected synchronously before anything is persisted, transport failures are
//! recorded per recipient and never surface through HTTP, fatal dispatch
//! failures flip the campaign to `failed` asynchronously.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub type ClResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	NotFound,
	PermissionDenied,
	DbError,

	/// Malformed payload, missing template, empty folder set
	ValidationError(String),
	/// Targeting rule cannot be evaluated (unknown target group etc.)
	ResolutionError(String),
	/// Lifecycle operation not valid in the campaign's current state
	InvalidTransition(String),
	/// Unrecoverable dispatch condition, aborts remaining batches
	FatalDispatch(String),
	ConfigError(String),
	Internal,

	// externals
	Io(std::io::Error),
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Self::Io(err)
	}
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Error::NotFound => write!(f, "not found"),
			Error::PermissionDenied => write!(f, "permission denied"),
			Error::DbError => write!(f, "database error"),
			Error::ValidationError(msg) => write!(f, "validation error: {}", msg),
			Error::ResolutionError(msg) => write!(f, "resolution error: {}", msg),
			Error::InvalidTransition(msg) => write!(f, "invalid transition: {}", msg),
			Error::FatalDispatch(msg) => write!(f, "fatal dispatch error: {}", msg),
			Error::ConfigError(msg) => write!(f, "config error: {}", msg),
			Error::Internal => write!(f, "internal error"),
			Error::Io(err) => write!(f, "io error: {}", err),
		}
	}
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
	fn into_response(self) -> axum::response::Response {
		let (status, message) = match &self {
			Error::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
			Error::PermissionDenied => (StatusCode::FORBIDDEN, self.to_string()),
			Error::ValidationError(_) | Error::ResolutionError(_) => {
				(StatusCode::BAD_REQUEST, self.to_string())
			}
			Error::InvalidTransition(_) => (StatusCode::CONFLICT, self.to_string()),
			_ => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()),
		};
		(status, Json(json!({ "error": message }))).into_response()
	}
}

// vim: ts=4
