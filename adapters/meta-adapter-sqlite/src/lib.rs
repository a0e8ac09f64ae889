//! SQLite-backed persistence adapter for the Outreach platform
//!
//! One pooled WAL database holds tenants, consumers, accounts, folders,
//! templates, campaigns, recipient snapshots, opt-outs, delivery records and
//! settings. Counter updates are plain SQL increments so concurrent batch
//! completions never lose updates.

use async_trait::async_trait;
use sqlx::sqlite::{self, SqlitePool};
use std::path::Path;

use outreach::campaign::CampaignStatus;
use outreach::meta_adapter::{
	Account, Campaign, CampaignCounts, Channel, Consumer, CreateAccountData, CreateCampaignData,
	CreateConsumerData, CreateTemplateData, CreateTenantData, DeliveryOutcome, DeliveryRecord,
	MetaAdapter, RecipientSnapshot, TargetFilter, TargetRow, Template, Tenant,
	UpdateTemplateData, UsageTotals,
};
use outreach::prelude::*;

mod campaign;
mod consumer;
mod delivery;
mod schema;
mod setting;
mod template;
mod tenant;
mod utils;

#[derive(Debug)]
pub struct MetaAdapterSqlite {
	db: SqlitePool,
}

impl MetaAdapterSqlite {
	pub async fn new(path: impl AsRef<Path>) -> ClResult<Self> {
		let opts = sqlite::SqliteConnectOptions::new()
			.filename(path.as_ref())
			.create_if_missing(true)
			.journal_mode(sqlite::SqliteJournalMode::Wal);
		let db = sqlite::SqlitePoolOptions::new()
			.max_connections(5)
			.connect_with(opts)
			.await
			.inspect_err(|err| error!("DbError: {:#?}", err))
			.or(Err(Error::DbError))?;

		schema::init_db(&db)
			.await
			.inspect_err(|err| error!("DbError: {:#?}", err))
			.or(Err(Error::DbError))?;

		Ok(Self { db })
	}
}

#[async_trait]
impl MetaAdapter for MetaAdapterSqlite {
	// Tenants
	//*********
	async fn read_tenant(&self, tn_id: TnId) -> ClResult<Tenant> {
		tenant::read(&self.db, tn_id).await
	}
	async fn create_tenant(&self, data: &CreateTenantData) -> ClResult<TnId> {
		tenant::create(&self.db, data).await
	}

	// Templates
	//***********
	async fn create_template(&self, tn_id: TnId, data: &CreateTemplateData) -> ClResult<Template> {
		template::create(&self.db, tn_id, data).await
	}
	async fn read_template(&self, tn_id: TnId, template_id: u64) -> ClResult<Template> {
		template::read(&self.db, tn_id, template_id).await
	}
	async fn update_template(
		&self,
		tn_id: TnId,
		template_id: u64,
		data: &UpdateTemplateData,
	) -> ClResult<()> {
		template::update(&self.db, tn_id, template_id, data).await
	}
	async fn delete_template(&self, tn_id: TnId, template_id: u64) -> ClResult<()> {
		template::delete(&self.db, tn_id, template_id).await
	}
	async fn list_templates(&self, tn_id: TnId) -> ClResult<Vec<Template>> {
		template::list(&self.db, tn_id).await
	}

	// Consumers, accounts, folders
	//******************************
	async fn create_consumer(&self, tn_id: TnId, data: &CreateConsumerData) -> ClResult<u64> {
		consumer::create_consumer(&self.db, tn_id, data).await
	}
	async fn read_consumer(&self, tn_id: TnId, consumer_id: u64) -> ClResult<Consumer> {
		consumer::read_consumer(&self.db, tn_id, consumer_id).await
	}
	async fn create_account(&self, tn_id: TnId, data: &CreateAccountData) -> ClResult<u64> {
		consumer::create_account(&self.db, tn_id, data).await
	}
	async fn read_account(&self, tn_id: TnId, account_id: u64) -> ClResult<Account> {
		consumer::read_account(&self.db, tn_id, account_id).await
	}
	async fn create_folder(&self, tn_id: TnId, name: &str) -> ClResult<u64> {
		consumer::create_folder(&self.db, tn_id, name).await
	}
	async fn add_folder_member(
		&self,
		tn_id: TnId,
		folder_id: u64,
		consumer_id: u64,
	) -> ClResult<()> {
		consumer::add_folder_member(&self.db, tn_id, folder_id, consumer_id).await
	}
	async fn create_import_batch(&self, tn_id: TnId) -> ClResult<u64> {
		consumer::create_import_batch(&self.db, tn_id).await
	}

	async fn list_targets(&self, tn_id: TnId, filter: &TargetFilter) -> ClResult<Vec<TargetRow>> {
		consumer::list_targets(&self.db, tn_id, filter).await
	}

	// Opt-outs
	//**********
	async fn create_opt_out(
		&self,
		tn_id: TnId,
		consumer_id: u64,
		channel: Channel,
	) -> ClResult<()> {
		consumer::create_opt_out(&self.db, tn_id, consumer_id, channel).await
	}
	async fn list_opt_outs(&self, tn_id: TnId, channel: Channel) -> ClResult<Vec<u64>> {
		consumer::list_opt_outs(&self.db, tn_id, channel).await
	}
	async fn is_opted_out(
		&self,
		tn_id: TnId,
		consumer_id: u64,
		channel: Channel,
	) -> ClResult<bool> {
		consumer::is_opted_out(&self.db, tn_id, consumer_id, channel).await
	}

	// Campaigns
	//***********
	async fn create_campaign(
		&self,
		tn_id: TnId,
		data: &CreateCampaignData,
		total_recipients: u32,
	) -> ClResult<Campaign> {
		campaign::create(&self.db, tn_id, data, total_recipients).await
	}
	async fn read_campaign(&self, tn_id: TnId, campaign_id: u64) -> ClResult<Campaign> {
		campaign::read(&self.db, tn_id, campaign_id).await
	}
	async fn list_campaigns(&self, tn_id: TnId) -> ClResult<Vec<Campaign>> {
		campaign::list(&self.db, tn_id).await
	}
	async fn update_campaign_status(
		&self,
		tn_id: TnId,
		campaign_id: u64,
		from: &[CampaignStatus],
		to: CampaignStatus,
	) -> ClResult<bool> {
		campaign::update_status(&self.db, tn_id, campaign_id, from, to).await
	}
	async fn set_campaign_completed_at(
		&self,
		tn_id: TnId,
		campaign_id: u64,
		at: Timestamp,
	) -> ClResult<()> {
		campaign::set_completed_at(&self.db, tn_id, campaign_id, at).await
	}
	async fn add_campaign_counts(
		&self,
		tn_id: TnId,
		campaign_id: u64,
		counts: &CampaignCounts,
	) -> ClResult<()> {
		campaign::add_counts(&self.db, tn_id, campaign_id, counts).await
	}
	async fn delete_campaign(&self, tn_id: TnId, campaign_id: u64) -> ClResult<()> {
		campaign::delete(&self.db, tn_id, campaign_id).await
	}

	// Recipient snapshots
	//*********************
	async fn create_campaign_recipients(
		&self,
		tn_id: TnId,
		campaign_id: u64,
		recipients: &[RecipientSnapshot],
	) -> ClResult<()> {
		campaign::create_recipients(&self.db, tn_id, campaign_id, recipients).await
	}
	async fn list_campaign_recipients(
		&self,
		tn_id: TnId,
		campaign_id: u64,
	) -> ClResult<Vec<RecipientSnapshot>> {
		campaign::list_recipients(&self.db, tn_id, campaign_id).await
	}

	// Delivery records
	//******************
	async fn create_delivery(&self, tn_id: TnId, record: &DeliveryRecord) -> ClResult<()> {
		delivery::create(&self.db, tn_id, record).await
	}
	async fn update_delivery_outcome(
		&self,
		tn_id: TnId,
		campaign_id: u64,
		message_id: &str,
		outcome: DeliveryOutcome,
	) -> ClResult<Option<u64>> {
		delivery::update_outcome(&self.db, tn_id, campaign_id, message_id, outcome).await
	}
	async fn read_delivery_consumer(
		&self,
		tn_id: TnId,
		campaign_id: u64,
		message_id: &str,
	) -> ClResult<Option<u64>> {
		delivery::read_consumer(&self.db, tn_id, campaign_id, message_id).await
	}
	async fn read_usage(
		&self,
		tn_id: TnId,
		from: Timestamp,
		until: Timestamp,
	) -> ClResult<UsageTotals> {
		delivery::read_usage(&self.db, tn_id, from, until).await
	}

	// Settings
	//**********
	async fn read_setting(
		&self,
		tn_id: TnId,
		key: &str,
	) -> ClResult<Option<serde_json::Value>> {
		setting::read(&self.db, tn_id, key).await
	}
	async fn write_setting(
		&self,
		tn_id: TnId,
		key: &str,
		value: &serde_json::Value,
	) -> ClResult<()> {
		setting::write(&self.db, tn_id, key, value).await
	}
}

// vim: ts=4
