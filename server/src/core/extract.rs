//! Custom Axum extractors
//!
//! Authentication is an external collaborator; the resolved tenant arrives as
//! the `x-tenant-id` header set by the fronting auth layer.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::Error;
use crate::types::TnId;

pub const TENANT_HEADER: &str = "x-tenant-id";

impl<S> FromRequestParts<S> for TnId
where
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		parts
			.headers
			.get(TENANT_HEADER)
			.and_then(|value| value.to_str().ok())
			.and_then(|value| value.parse::<u32>().ok())
			.map(TnId)
			.ok_or(Error::PermissionDenied)
	}
}

// vim: ts=4
