//! Persistence adapter trait and record types
//!
//! The engine issues idempotent count-increment writes through this trait,
//! never full-object overwrites, so concurrent batch completions cannot
//! clobber each other.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt::Debug};

use crate::campaign::state::CampaignStatus;
use crate::prelude::*;

// Channel //
//*********//
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
	Email,
	Sms,
}

impl std::fmt::Display for Channel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Channel::Email => write!(f, "email"),
			Channel::Sms => write!(f, "sms"),
		}
	}
}

// TargetGroup //
//*************//
/// Declarative selector choosing which consumers receive a campaign
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetGroup {
	All,
	WithBalance,
	Overdue,
	Decline,
	RecentUpload,
	Folder,
}

// PhoneCardinality //
//******************//
/// How many of a consumer's phone numbers an SMS campaign fans out to.
/// Serialized as `1`, `2`, `3` or `"all"`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PhoneCardinality {
	#[default]
	One,
	Two,
	Three,
	All,
}

impl PhoneCardinality {
	/// Number of phones to take from the consumer's ordered list
	pub fn limit(&self) -> usize {
		match self {
			PhoneCardinality::One => 1,
			PhoneCardinality::Two => 2,
			PhoneCardinality::Three => 3,
			PhoneCardinality::All => usize::MAX,
		}
	}
}

impl Serialize for PhoneCardinality {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		match self {
			PhoneCardinality::One => serializer.serialize_u8(1),
			PhoneCardinality::Two => serializer.serialize_u8(2),
			PhoneCardinality::Three => serializer.serialize_u8(3),
			PhoneCardinality::All => serializer.serialize_str("all"),
		}
	}
}

impl<'de> Deserialize<'de> for PhoneCardinality {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Raw {
			Num(u8),
			Str(String),
		}
		match Raw::deserialize(deserializer)? {
			Raw::Num(1) => Ok(PhoneCardinality::One),
			Raw::Num(2) => Ok(PhoneCardinality::Two),
			Raw::Num(3) => Ok(PhoneCardinality::Three),
			Raw::Str(s) if s.eq_ignore_ascii_case("all") => Ok(PhoneCardinality::All),
			Raw::Str(s) if s == "1" => Ok(PhoneCardinality::One),
			Raw::Str(s) if s == "2" => Ok(PhoneCardinality::Two),
			Raw::Str(s) if s == "3" => Ok(PhoneCardinality::Three),
			_ => Err(serde::de::Error::custom("expected 1, 2, 3 or \"all\"")),
		}
	}
}

// Tenant //
//********//
/// Agency record with branding fields used by the template engine
#[derive(Clone, Debug, Serialize)]
pub struct Tenant {
	#[serde(rename = "id")]
	pub tn_id: TnId,
	pub name: Box<str>,
	#[serde(rename = "fromEmail")]
	pub from_email: Option<Box<str>>,
	pub phone: Option<Box<str>>,
	#[serde(rename = "portalSlug")]
	pub portal_slug: Option<Box<str>>,
	#[serde(rename = "createdAt")]
	pub created_at: Timestamp,
	pub x: HashMap<Box<str>, Box<str>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateTenantData {
	pub name: Box<str>,
	#[serde(rename = "fromEmail")]
	pub from_email: Option<Box<str>>,
	pub phone: Option<Box<str>>,
	#[serde(rename = "portalSlug")]
	pub portal_slug: Option<Box<str>>,
}

// Template //
//**********//
#[derive(Clone, Debug, Serialize)]
pub struct Template {
	#[serde(rename = "id")]
	pub template_id: u64,
	#[serde(skip)]
	pub tn_id: TnId,
	pub name: Box<str>,
	pub channel: Channel,
	pub subject: Option<Box<str>>,
	pub body: Box<str>,
	#[serde(rename = "createdAt")]
	pub created_at: Timestamp,
}

#[derive(Debug, Deserialize)]
pub struct CreateTemplateData {
	pub name: Box<str>,
	pub channel: Channel,
	pub subject: Option<Box<str>>,
	pub body: Box<str>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTemplateData {
	#[serde(default)]
	pub name: Patch<Box<str>>,
	#[serde(default)]
	pub subject: Patch<Box<str>>,
	#[serde(default)]
	pub body: Patch<Box<str>>,
}

// Consumer & Account //
//********************//
/// Imported consumer record. `phones` is ordered: primary first, then
/// additional numbers in import order. `x` carries free-form per-entity
/// metadata usable as custom template variables.
#[derive(Clone, Debug)]
pub struct Consumer {
	pub consumer_id: u64,
	pub first_name: Box<str>,
	pub last_name: Box<str>,
	pub email: Option<Box<str>>,
	pub phones: Box<[Box<str>]>,
	pub import_batch_id: Option<u64>,
	pub x: HashMap<Box<str>, Box<str>>,
	pub created_at: Timestamp,
}

#[derive(Debug, Default)]
pub struct CreateConsumerData {
	pub first_name: Box<str>,
	pub last_name: Box<str>,
	pub email: Option<Box<str>>,
	pub phones: Box<[Box<str>]>,
	pub import_batch_id: Option<u64>,
	pub x: HashMap<Box<str>, Box<str>>,
}

#[derive(Clone, Debug)]
pub struct Account {
	pub account_id: u64,
	pub consumer_id: u64,
	pub account_number: Option<Box<str>>,
	pub creditor: Option<Box<str>>,
	pub balance_cents: Option<i64>,
	pub due_date: Option<chrono::NaiveDate>,
	pub status: Option<Box<str>>,
	pub x: HashMap<Box<str>, Box<str>>,
}

#[derive(Debug, Default)]
pub struct CreateAccountData {
	pub consumer_id: u64,
	pub account_number: Option<Box<str>>,
	pub creditor: Option<Box<str>>,
	pub balance_cents: Option<i64>,
	pub due_date: Option<chrono::NaiveDate>,
	pub status: Option<Box<str>>,
	pub x: HashMap<Box<str>, Box<str>>,
}

// Targeting //
//***********//
/// Filtered targeting query issued to the store. The status predicates
/// (`Overdue`, `Decline`) live in the adapter; opt-out exclusion and dedup
/// stay in the resolver so they apply uniformly across all branches.
#[derive(Clone, Debug)]
pub enum TargetFilter {
	All,
	WithBalance,
	Overdue,
	Decline,
	RecentUpload,
	Folders(Box<[u64]>),
}

/// One row of the targeting query. A consumer may repeat when several of its
/// accounts qualify.
#[derive(Clone, Debug)]
pub struct TargetRow {
	pub consumer: Consumer,
	pub account: Option<Account>,
}

// Campaign //
//**********//
#[derive(Clone, Debug, Serialize)]
pub struct Campaign {
	#[serde(rename = "id")]
	pub campaign_id: u64,
	#[serde(skip)]
	pub tn_id: TnId,
	#[serde(rename = "templateId")]
	pub template_id: u64,
	pub name: Box<str>,
	pub channel: Channel,
	#[serde(rename = "targetGroup")]
	pub target_group: TargetGroup,
	#[serde(rename = "folderIds")]
	pub folder_ids: Box<[u64]>,
	#[serde(rename = "phonesToSend")]
	pub phones_to_send: PhoneCardinality,
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
	#[serde(rename = "createdAt")]
	pub created_at: Timestamp,
	#[serde(rename = "completedAt")]
	pub completed_at: Option<Timestamp>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCampaignData {
	#[serde(rename = "templateId")]
	pub template_id: u64,
	pub name: Box<str>,
	pub channel: Channel,
	#[serde(rename = "targetGroup")]
	pub target_group: TargetGroup,
	#[serde(rename = "folderIds", default)]
	pub folder_ids: Option<Box<[u64]>>,
	#[serde(rename = "phonesToSend", default)]
	pub phones_to_send: Option<PhoneCardinality>,
}

/// Counter deltas applied with atomic increments after every batch
#[derive(Clone, Copy, Debug, Default)]
pub struct CampaignCounts {
	pub sent: u32,
	pub delivered: u32,
	pub opened: u32,
	pub clicked: u32,
	pub errors: u32,
	pub opt_outs: u32,
}

impl CampaignCounts {
	pub fn is_zero(&self) -> bool {
		self.sent == 0
			&& self.delivered == 0
			&& self.opened == 0
			&& self.clicked == 0
			&& self.errors == 0
			&& self.opt_outs == 0
	}
}

// Recipient snapshot //
//********************//
/// Consumer/account pairing plus resolved addresses, captured at creation so
/// later consumer edits cannot change an in-flight campaign's target list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecipientSnapshot {
	#[serde(rename = "consumerId")]
	pub consumer_id: u64,
	#[serde(rename = "accountId")]
	pub account_id: Option<u64>,
	pub addresses: Box<[Box<str>]>,
}

// Delivery records //
//******************//
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
	Sent,
	Delivered,
	Opened,
	Clicked,
	Error,
	OptOut,
}

#[derive(Clone, Debug)]
pub struct DeliveryRecord {
	pub campaign_id: u64,
	pub consumer_id: u64,
	pub channel: Channel,
	pub address: Box<str>,
	pub message_id: Box<str>,
	pub outcome: DeliveryOutcome,
	pub at: Timestamp,
}

/// Per-period send totals for the quota/billing collaborator
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct UsageTotals {
	#[serde(rename = "emailSent")]
	pub email_sent: u64,
	#[serde(rename = "smsSent")]
	pub sms_sent: u64,
}

#[async_trait]
pub trait MetaAdapter: Debug + Send + Sync {
	// Tenants
	async fn read_tenant(&self, tn_id: TnId) -> ClResult<Tenant>;
	async fn create_tenant(&self, data: &CreateTenantData) -> ClResult<TnId>;

	// Templates
	async fn create_template(&self, tn_id: TnId, data: &CreateTemplateData) -> ClResult<Template>;
	async fn read_template(&self, tn_id: TnId, template_id: u64) -> ClResult<Template>;
	async fn update_template(
		&self,
		tn_id: TnId,
		template_id: u64,
		data: &UpdateTemplateData,
	) -> ClResult<()>;
	async fn delete_template(&self, tn_id: TnId, template_id: u64) -> ClResult<()>;
	async fn list_templates(&self, tn_id: TnId) -> ClResult<Vec<Template>>;

	// Consumers, accounts, folders
	async fn create_consumer(&self, tn_id: TnId, data: &CreateConsumerData) -> ClResult<u64>;
	async fn read_consumer(&self, tn_id: TnId, consumer_id: u64) -> ClResult<Consumer>;
	async fn create_account(&self, tn_id: TnId, data: &CreateAccountData) -> ClResult<u64>;
	async fn read_account(&self, tn_id: TnId, account_id: u64) -> ClResult<Account>;
	async fn create_folder(&self, tn_id: TnId, name: &str) -> ClResult<u64>;
	async fn add_folder_member(&self, tn_id: TnId, folder_id: u64, consumer_id: u64)
		-> ClResult<()>;
	async fn create_import_batch(&self, tn_id: TnId) -> ClResult<u64>;

	/// Issues the filtered targeting query (insertion order). Rows may repeat
	/// a consumer when several accounts qualify.
	async fn list_targets(&self, tn_id: TnId, filter: &TargetFilter) -> ClResult<Vec<TargetRow>>;

	// Opt-outs
	async fn create_opt_out(&self, tn_id: TnId, consumer_id: u64, channel: Channel) -> ClResult<()>;
	async fn list_opt_outs(&self, tn_id: TnId, channel: Channel) -> ClResult<Vec<u64>>;
	async fn is_opted_out(&self, tn_id: TnId, consumer_id: u64, channel: Channel)
		-> ClResult<bool>;

	// Campaigns
	async fn create_campaign(
		&self,
		tn_id: TnId,
		data: &CreateCampaignData,
		total_recipients: u32,
	) -> ClResult<Campaign>;
	async fn read_campaign(&self, tn_id: TnId, campaign_id: u64) -> ClResult<Campaign>;
	async fn list_campaigns(&self, tn_id: TnId) -> ClResult<Vec<Campaign>>;
	/// Compare-and-set transition. `Ok(false)` when the campaign was not in
	/// any of the `from` states; the caller decides whether that is an error.
	async fn update_campaign_status(
		&self,
		tn_id: TnId,
		campaign_id: u64,
		from: &[CampaignStatus],
		to: CampaignStatus,
	) -> ClResult<bool>;
	async fn set_campaign_completed_at(
		&self,
		tn_id: TnId,
		campaign_id: u64,
		at: Timestamp,
	) -> ClResult<()>;
	/// Atomic counter increments (`counter = counter + delta`)
	async fn add_campaign_counts(
		&self,
		tn_id: TnId,
		campaign_id: u64,
		counts: &CampaignCounts,
	) -> ClResult<()>;
	async fn delete_campaign(&self, tn_id: TnId, campaign_id: u64) -> ClResult<()>;

	// Recipient snapshots
	async fn create_campaign_recipients(
		&self,
		tn_id: TnId,
		campaign_id: u64,
		recipients: &[RecipientSnapshot],
	) -> ClResult<()>;
	async fn list_campaign_recipients(
		&self,
		tn_id: TnId,
		campaign_id: u64,
	) -> ClResult<Vec<RecipientSnapshot>>;

	// Delivery records
	async fn create_delivery(&self, tn_id: TnId, record: &DeliveryRecord) -> ClResult<()>;
	/// Updates the outcome of a recorded message; returns the consumer the
	/// message belonged to when the message id is known.
	async fn update_delivery_outcome(
		&self,
		tn_id: TnId,
		campaign_id: u64,
		message_id: &str,
		outcome: DeliveryOutcome,
	) -> ClResult<Option<u64>>;
	/// Looks up the consumer behind a message id without touching the record
	async fn read_delivery_consumer(
		&self,
		tn_id: TnId,
		campaign_id: u64,
		message_id: &str,
	) -> ClResult<Option<u64>>;
	async fn read_usage(
		&self,
		tn_id: TnId,
		from: Timestamp,
		until: Timestamp,
	) -> ClResult<UsageTotals>;

	// Settings
	async fn read_setting(&self, tn_id: TnId, key: &str)
		-> ClResult<Option<serde_json::Value>>;
	async fn write_setting(
		&self,
		tn_id: TnId,
		key: &str,
		value: &serde_json::Value,
	) -> ClResult<()>;
}


// vim: ts=4
