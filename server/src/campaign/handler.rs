//! HTTP handlers for the campaign lifecycle and progress polling

use axum::{
	Json,
	extract::{Path, Query, State},
	http::StatusCode,
};
use serde::Deserialize;

use crate::campaign::progress::CampaignProgress;
use crate::campaign::state;
use crate::meta_adapter::{
	Campaign, CampaignCounts, CreateCampaignData, Channel, DeliveryOutcome, UsageTotals,
};
use crate::prelude::*;

/// Create a campaign: validate, resolve recipients once, persist in
/// `pending_approval` with the resolved count.
pub async fn post_campaign(
	State(app): State<App>,
	tn_id: TnId,
	Json(data): Json<CreateCampaignData>,
) -> ClResult<(StatusCode, Json<Campaign>)> {
	let campaign = state::create_campaign(&app, tn_id, data).await?;
	Ok((StatusCode::CREATED, Json(campaign)))
}

pub async fn list_campaigns(
	State(app): State<App>,
	tn_id: TnId,
) -> ClResult<Json<Vec<Campaign>>> {
	Ok(Json(app.meta_adapter.list_campaigns(tn_id).await?))
}

pub async fn get_campaign(
	State(app): State<App>,
	tn_id: TnId,
	Path(campaign_id): Path<u64>,
) -> ClResult<Json<Campaign>> {
	Ok(Json(app.meta_adapter.read_campaign(tn_id, campaign_id).await?))
}

/// Progress poll: a cheap counter read
pub async fn get_campaign_status(
	State(app): State<App>,
	tn_id: TnId,
	Path(campaign_id): Path<u64>,
) -> ClResult<Json<CampaignProgress>> {
	let campaign = app.meta_adapter.read_campaign(tn_id, campaign_id).await?;
	Ok(Json(CampaignProgress::from(&campaign)))
}

/// Approve and start dispatch; returns immediately while sending continues
pub async fn post_approve(
	State(app): State<App>,
	tn_id: TnId,
	Path(campaign_id): Path<u64>,
) -> ClResult<(StatusCode, Json<Campaign>)> {
	let campaign = state::approve_campaign(&app, tn_id, campaign_id).await?;
	Ok((StatusCode::ACCEPTED, Json(campaign)))
}

pub async fn post_cancel(
	State(app): State<App>,
	tn_id: TnId,
	Path(campaign_id): Path<u64>,
) -> ClResult<Json<Campaign>> {
	let campaign = state::cancel_campaign(&app, tn_id, campaign_id).await?;
	Ok(Json(campaign))
}

pub async fn delete_campaign(
	State(app): State<App>,
	tn_id: TnId,
	Path(campaign_id): Path<u64>,
) -> ClResult<StatusCode> {
	state::delete_campaign(&app, tn_id, campaign_id).await?;
	Ok(StatusCode::NO_CONTENT)
}

// Delivery events //
//*****************//
#[derive(Debug, Deserialize)]
pub struct DeliveryEventData {
	#[serde(rename = "messageId")]
	pub message_id: Box<str>,
	pub outcome: DeliveryOutcome,
}

/// Ingest a transport delivery callback (delivered/opened/clicked/opt-out)
/// and fold it into the delivery record and campaign counters.
pub async fn post_event(
	State(app): State<App>,
	tn_id: TnId,
	Path(campaign_id): Path<u64>,
	Json(event): Json<DeliveryEventData>,
) -> ClResult<StatusCode> {
	let campaign = app.meta_adapter.read_campaign(tn_id, campaign_id).await?;

	let mut counts = CampaignCounts::default();
	match event.outcome {
		DeliveryOutcome::Delivered => counts.delivered = 1,
		DeliveryOutcome::Opened | DeliveryOutcome::Clicked
			if campaign.channel == Channel::Sms =>
		{
			return Err(Error::ValidationError(
				"Open/click tracking applies to email campaigns only".into(),
			));
		}
		DeliveryOutcome::Opened => counts.opened = 1,
		DeliveryOutcome::Clicked => counts.clicked = 1,
		DeliveryOutcome::OptOut => counts.opt_outs = 1,
		DeliveryOutcome::Sent | DeliveryOutcome::Error => {
			return Err(Error::ValidationError(
				"Only delivery events can be ingested".into(),
			));
		}
	}

	// An opt-out reply suppresses future resolutions but leaves the delivery
	// record as sent, so the message stays billable
	if event.outcome == DeliveryOutcome::OptOut {
		let consumer_id = app
			.meta_adapter
			.read_delivery_consumer(tn_id, campaign_id, &event.message_id)
			.await?
			.ok_or(Error::NotFound)?;
		app.meta_adapter.create_opt_out(tn_id, consumer_id, campaign.channel).await?;
	} else {
		app.meta_adapter
			.update_delivery_outcome(tn_id, campaign_id, &event.message_id, event.outcome)
			.await?
			.ok_or(Error::NotFound)?;
	}

	app.meta_adapter.add_campaign_counts(tn_id, campaign_id, &counts).await?;
	Ok(StatusCode::NO_CONTENT)
}

// Usage //
//*******//
#[derive(Debug, Deserialize)]
pub struct UsageQuery {
	pub from: i64,
	pub until: i64,
}

/// Per-period send counts for the quota/billing collaborator
pub async fn get_usage(
	State(app): State<App>,
	tn_id: TnId,
	Query(query): Query<UsageQuery>,
) -> ClResult<Json<UsageTotals>> {
	let totals = app
		.meta_adapter
		.read_usage(tn_id, Timestamp(query.from), Timestamp(query.until))
		.await?;
	Ok(Json(totals))
}

// vim: ts=4
