//! Pollable campaign progress
//!
//! A cheap read of the persisted counters, no computation beyond lookup.
//! Clients poll on a fixed interval and stop once a terminal status is
//! observed.

use serde::Serialize;

use crate::campaign::state::CampaignStatus;
use crate::meta_adapter::Campaign;
use crate::types::Timestamp;

#[derive(Clone, Debug, Serialize)]
pub struct CampaignProgress {
	pub status: CampaignStatus,
	#[serde(rename = "totalRecipients")]
	pub total_recipients: u32,
	#[serde(rename = "totalSent")]
	pub total_sent: u32,
	#[serde(rename = "totalDelivered")]
	pub total_delivered: u32,
	#[serde(rename = "totalOpened")]
	pub total_opened: u32,
	#[serde(rename = "totalClicked")]
	pub total_clicked: u32,
	#[serde(rename = "totalErrors")]
	pub total_errors: u32,
	#[serde(rename = "totalOptOuts")]
	pub total_opt_outs: u32,
	#[serde(rename = "completedAt", skip_serializing_if = "Option::is_none")]
	pub completed_at: Option<Timestamp>,
	/// Terminal statuses tell pollers to stop
	pub terminal: bool,
}

impl From<&Campaign> for CampaignProgress {
	fn from(campaign: &Campaign) -> Self {
		Self {
			status: campaign.status,
			total_recipients: campaign.total_recipients,
			total_sent: campaign.total_sent,
			total_delivered: campaign.total_delivered,
			total_opened: campaign.total_opened,
			total_clicked: campaign.total_clicked,
			total_errors: campaign.total_errors,
			total_opt_outs: campaign.total_opt_outs,
			completed_at: campaign.completed_at,
			terminal: campaign.status.is_terminal(),
		}
	}
}


// vim: ts=4
