//! Campaign lifecycle: status type and the create/approve/cancel/delete
//! operations
//!
//! `pending_approval` is the canonical initial state; older records carry the
//! legacy spelling `pending`, which every input path normalizes to the same
//! state.

use serde::{Deserialize, Serialize};

use crate::campaign::{dispatch, resolver};
use crate::meta_adapter::{Campaign, CreateCampaignData, TargetGroup};
use crate::prelude::*;

// CampaignStatus //
//****************//
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum CampaignStatus {
	#[serde(rename = "pending_approval", alias = "pending")]
	PendingApproval,
	#[serde(rename = "sending")]
	Sending,
	#[serde(rename = "completed")]
	Completed,
	#[serde(rename = "failed")]
	Failed,
	#[serde(rename = "cancelled")]
	Cancelled,
}

impl CampaignStatus {
	/// Canonical storage spelling
	pub fn as_str(&self) -> &'static str {
		match self {
			CampaignStatus::PendingApproval => "pending_approval",
			CampaignStatus::Sending => "sending",
			CampaignStatus::Completed => "completed",
			CampaignStatus::Failed => "failed",
			CampaignStatus::Cancelled => "cancelled",
		}
	}

	/// Parses stored statuses, accepting the legacy `pending` spelling
	pub fn parse(s: &str) -> Option<CampaignStatus> {
		match s {
			"pending_approval" | "pending" => Some(CampaignStatus::PendingApproval),
			"sending" => Some(CampaignStatus::Sending),
			"completed" => Some(CampaignStatus::Completed),
			"failed" => Some(CampaignStatus::Failed),
			"cancelled" => Some(CampaignStatus::Cancelled),
			_ => None,
		}
	}

	/// No further counter changes occur in a terminal state
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			CampaignStatus::Completed | CampaignStatus::Failed | CampaignStatus::Cancelled
		)
	}
}

impl std::fmt::Display for CampaignStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

// Lifecycle operations //
//**********************//

/// Validate a campaign definition, resolve its recipients once, and persist
/// it in `pending_approval` with the resolved count and recipient snapshot.
pub async fn create_campaign(
	app: &App,
	tn_id: TnId,
	data: CreateCampaignData,
) -> ClResult<Campaign> {
	let template = match app.meta_adapter.read_template(tn_id, data.template_id).await {
		Ok(template) => template,
		Err(Error::NotFound) => {
			return Err(Error::ValidationError(format!(
				"Template {} does not exist",
				data.template_id
			)));
		}
		Err(err) => return Err(err),
	};
	if template.channel != data.channel {
		return Err(Error::ValidationError(format!(
			"Template {} is a {} template, campaign channel is {}",
			data.template_id, template.channel, data.channel
		)));
	}
	if data.name.trim().is_empty() {
		return Err(Error::ValidationError("Campaign name must not be empty".into()));
	}
	if data.target_group == TargetGroup::Folder
		&& data.folder_ids.as_deref().unwrap_or_default().is_empty()
	{
		return Err(Error::ValidationError(
			"Folder targeting requires at least one folder".into(),
		));
	}

	let recipients = resolver::resolve(
		app.meta_adapter.as_ref(),
		tn_id,
		data.channel,
		data.target_group,
		data.folder_ids.as_deref().unwrap_or_default(),
		data.phones_to_send.unwrap_or_default(),
	)
	.await?;

	let campaign =
		app.meta_adapter.create_campaign(tn_id, &data, recipients.len() as u32).await?;
	app.meta_adapter
		.create_campaign_recipients(tn_id, campaign.campaign_id, &recipients)
		.await?;

	info!(
		"Campaign {} created for tenant {}: {} recipients",
		campaign.campaign_id, tn_id, campaign.total_recipients
	);
	Ok(campaign)
}

/// Approve a pending campaign and start dispatch. Returns as soon as the
/// dispatch task is running; progress is observable through status polls.
pub async fn approve_campaign(app: &App, tn_id: TnId, campaign_id: u64) -> ClResult<Campaign> {
	let moved = app
		.meta_adapter
		.update_campaign_status(
			tn_id,
			campaign_id,
			&[CampaignStatus::PendingApproval],
			CampaignStatus::Sending,
		)
		.await?;
	if !moved {
		let campaign = app.meta_adapter.read_campaign(tn_id, campaign_id).await?;
		return Err(Error::InvalidTransition(format!(
			"Campaign {} cannot be approved from status {}",
			campaign_id, campaign.status
		)));
	}

	dispatch::spawn_dispatch(app.clone(), tn_id, campaign_id);

	app.meta_adapter.read_campaign(tn_id, campaign_id).await
}

/// Cooperatively cancel a sending campaign. In-flight messages complete, no
/// new batch starts. Cancelling an already-terminal campaign is a no-op.
pub async fn cancel_campaign(app: &App, tn_id: TnId, campaign_id: u64) -> ClResult<Campaign> {
	let campaign = app.meta_adapter.read_campaign(tn_id, campaign_id).await?;
	if campaign.status.is_terminal() {
		// Cancellation race: the dispatcher finished first
		return Ok(campaign);
	}
	let moved = app
		.meta_adapter
		.update_campaign_status(
			tn_id,
			campaign_id,
			&[CampaignStatus::Sending],
			CampaignStatus::Cancelled,
		)
		.await?;
	if moved {
		app.dispatch.cancel(campaign_id);
		info!("Campaign {} cancelled", campaign_id);
	} else {
		let campaign = app.meta_adapter.read_campaign(tn_id, campaign_id).await?;
		if !campaign.status.is_terminal() {
			return Err(Error::InvalidTransition(format!(
				"Campaign {} cannot be cancelled from status {}",
				campaign_id, campaign.status
			)));
		}
		return Ok(campaign);
	}
	app.meta_adapter.read_campaign(tn_id, campaign_id).await
}

/// Delete a campaign. Valid from `pending_approval` and terminal states;
/// deleting a sending campaign cancels it first.
pub async fn delete_campaign(app: &App, tn_id: TnId, campaign_id: u64) -> ClResult<()> {
	let campaign = app.meta_adapter.read_campaign(tn_id, campaign_id).await?;
	if campaign.status == CampaignStatus::Sending {
		// Implicit cancel, idempotent if a cancel already happened
		let moved = app
			.meta_adapter
			.update_campaign_status(
				tn_id,
				campaign_id,
				&[CampaignStatus::Sending],
				CampaignStatus::Cancelled,
			)
			.await?;
		if moved {
			app.dispatch.cancel(campaign_id);
		}
	}
	app.meta_adapter.delete_campaign(tn_id, campaign_id).await?;
	info!("Campaign {} deleted", campaign_id);
	Ok(())
}


// vim: ts=4
