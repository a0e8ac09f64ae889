//! HTTP handlers for template management and preview rendering

use axum::{
	Json,
	extract::{Path, State},
	http::StatusCode,
};
use serde::Serialize;

use crate::meta_adapter::{CreateTemplateData, Template, UpdateTemplateData};
use crate::prelude::*;
use crate::template::{render_message, sample_context};

pub async fn post_template(
	State(app): State<App>,
	tn_id: TnId,
	Json(data): Json<CreateTemplateData>,
) -> ClResult<(StatusCode, Json<Template>)> {
	if data.name.trim().is_empty() {
		return Err(Error::ValidationError("Template name must not be empty".into()));
	}
	if data.body.trim().is_empty() {
		return Err(Error::ValidationError("Template body must not be empty".into()));
	}
	let template = app.meta_adapter.create_template(tn_id, &data).await?;
	Ok((StatusCode::CREATED, Json(template)))
}

pub async fn list_templates(
	State(app): State<App>,
	tn_id: TnId,
) -> ClResult<Json<Vec<Template>>> {
	Ok(Json(app.meta_adapter.list_templates(tn_id).await?))
}

pub async fn get_template(
	State(app): State<App>,
	tn_id: TnId,
	Path(template_id): Path<u64>,
) -> ClResult<Json<Template>> {
	Ok(Json(app.meta_adapter.read_template(tn_id, template_id).await?))
}

/// Edits only affect future sends; a campaign in flight keeps the content it
/// loaded at dispatch start.
pub async fn put_template(
	State(app): State<App>,
	tn_id: TnId,
	Path(template_id): Path<u64>,
	Json(data): Json<UpdateTemplateData>,
) -> ClResult<Json<Template>> {
	app.meta_adapter.update_template(tn_id, template_id, &data).await?;
	Ok(Json(app.meta_adapter.read_template(tn_id, template_id).await?))
}

pub async fn delete_template(
	State(app): State<App>,
	tn_id: TnId,
	Path(template_id): Path<u64>,
) -> ClResult<StatusCode> {
	app.meta_adapter.delete_template(tn_id, template_id).await?;
	Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
	pub subject: Option<String>,
	pub body: String,
	#[serde(rename = "textBody")]
	pub text_body: Option<String>,
}

/// Render a template with synthetic sample data
pub async fn post_preview(
	State(app): State<App>,
	tn_id: TnId,
	Path(template_id): Path<u64>,
) -> ClResult<Json<PreviewResponse>> {
	let template = app.meta_adapter.read_template(tn_id, template_id).await?;
	let tenant = app.meta_adapter.read_tenant(tn_id).await?;
	let portal_base = app.settings.get_string(tn_id, "portal.base_url").await.ok();
	let ctx = sample_context(&tenant, portal_base.as_deref());
	let content = render_message(&template, &ctx);
	Ok(Json(PreviewResponse {
		subject: content.subject,
		body: content.body,
		text_body: content.text_body,
	}))
}

// vim: ts=4
