//! Shared test fixtures: an in-memory persistence adapter and a scriptable
//! mock transport, wired into a ready-to-use application state.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use outreach::campaign::CampaignStatus;
use outreach::meta_adapter::{
	Account, Campaign, CampaignCounts, Channel, Consumer, CreateAccountData, CreateCampaignData,
	CreateConsumerData, CreateTemplateData, CreateTenantData, DeliveryOutcome, DeliveryRecord,
	MetaAdapter, PhoneCardinality, RecipientSnapshot, TargetFilter, TargetRow, Template, Tenant,
	UpdateTemplateData, UsageTotals,
};
use outreach::prelude::*;
use outreach::transport_adapter::{
	OutboundMessage, SendReceipt, TransportAdapter, TransportError,
};
use outreach::types::now;
use outreach::{App, AppBuilder};

// In-memory meta adapter //
//************************//
#[derive(Debug, Default)]
struct Store {
	next_id: u64,
	tenants: HashMap<u32, Tenant>,
	templates: HashMap<(u32, u64), Template>,
	consumers: Vec<(u32, Consumer)>,
	accounts: Vec<(u32, Account)>,
	folder_members: Vec<(u32, u64, u64)>,
	import_batches: Vec<(u32, u64)>,
	opt_outs: HashSet<(u32, u64, Channel)>,
	campaigns: HashMap<(u32, u64), Campaign>,
	recipients: HashMap<(u32, u64), Vec<RecipientSnapshot>>,
	deliveries: Vec<(u32, DeliveryRecord)>,
	settings: HashMap<(u32, String), serde_json::Value>,
}

impl Store {
	fn next_id(&mut self) -> u64 {
		self.next_id += 1;
		self.next_id
	}

	fn latest_batch(&self, tn_id: u32) -> Option<u64> {
		self.import_batches.iter().filter(|(tn, _)| *tn == tn_id).map(|(_, id)| *id).max()
	}
}

#[derive(Debug, Default)]
pub struct InMemoryMetaAdapter {
	store: Mutex<Store>,
}

impl InMemoryMetaAdapter {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl MetaAdapter for InMemoryMetaAdapter {
	async fn read_tenant(&self, tn_id: TnId) -> ClResult<Tenant> {
		self.store.lock().tenants.get(&tn_id.0).cloned().ok_or(Error::NotFound)
	}

	async fn create_tenant(&self, data: &CreateTenantData) -> ClResult<TnId> {
		let mut store = self.store.lock();
		let tn_id = TnId(store.tenants.len() as u32 + 1);
		store.tenants.insert(
			tn_id.0,
			Tenant {
				tn_id,
				name: data.name.clone(),
				from_email: data.from_email.clone(),
				phone: data.phone.clone(),
				portal_slug: data.portal_slug.clone(),
				created_at: now(),
				x: HashMap::new(),
			},
		);
		Ok(tn_id)
	}

	async fn create_template(
		&self,
		tn_id: TnId,
		data: &CreateTemplateData,
	) -> ClResult<Template> {
		let mut store = self.store.lock();
		let template_id = store.next_id();
		let template = Template {
			template_id,
			tn_id,
			name: data.name.clone(),
			channel: data.channel,
			subject: data.subject.clone(),
			body: data.body.clone(),
			created_at: now(),
		};
		store.templates.insert((tn_id.0, template_id), template.clone());
		Ok(template)
	}

	async fn read_template(&self, tn_id: TnId, template_id: u64) -> ClResult<Template> {
		self.store.lock().templates.get(&(tn_id.0, template_id)).cloned().ok_or(Error::NotFound)
	}

	async fn update_template(
		&self,
		tn_id: TnId,
		template_id: u64,
		data: &UpdateTemplateData,
	) -> ClResult<()> {
		let mut store = self.store.lock();
		let template =
			store.templates.get_mut(&(tn_id.0, template_id)).ok_or(Error::NotFound)?;
		if let Patch::Value(ref name) = data.name {
			template.name = name.clone();
		}
		match &data.subject {
			Patch::Value(subject) => template.subject = Some(subject.clone()),
			Patch::Null => template.subject = None,
			Patch::Undefined => {}
		}
		if let Patch::Value(ref body) = data.body {
			template.body = body.clone();
		}
		Ok(())
	}

	async fn delete_template(&self, tn_id: TnId, template_id: u64) -> ClResult<()> {
		self.store
			.lock()
			.templates
			.remove(&(tn_id.0, template_id))
			.map(|_| ())
			.ok_or(Error::NotFound)
	}

	async fn list_templates(&self, tn_id: TnId) -> ClResult<Vec<Template>> {
		let store = self.store.lock();
		let mut templates: Vec<Template> = store
			.templates
			.iter()
			.filter(|((tn, _), _)| *tn == tn_id.0)
			.map(|(_, t)| t.clone())
			.collect();
		templates.sort_by_key(|t| t.template_id);
		Ok(templates)
	}

	async fn create_consumer(&self, tn_id: TnId, data: &CreateConsumerData) -> ClResult<u64> {
		let mut store = self.store.lock();
		let consumer_id = store.next_id();
		store.consumers.push((
			tn_id.0,
			Consumer {
				consumer_id,
				first_name: data.first_name.clone(),
				last_name: data.last_name.clone(),
				email: data.email.clone(),
				phones: data.phones.clone(),
				import_batch_id: data.import_batch_id,
				x: data.x.clone(),
				created_at: now(),
			},
		));
		Ok(consumer_id)
	}

	async fn read_consumer(&self, tn_id: TnId, consumer_id: u64) -> ClResult<Consumer> {
		self.store
			.lock()
			.consumers
			.iter()
			.find(|(tn, c)| *tn == tn_id.0 && c.consumer_id == consumer_id)
			.map(|(_, c)| c.clone())
			.ok_or(Error::NotFound)
	}

	async fn create_account(&self, tn_id: TnId, data: &CreateAccountData) -> ClResult<u64> {
		let mut store = self.store.lock();
		let account_id = store.next_id();
		store.accounts.push((
			tn_id.0,
			Account {
				account_id,
				consumer_id: data.consumer_id,
				account_number: data.account_number.clone(),
				creditor: data.creditor.clone(),
				balance_cents: data.balance_cents,
				due_date: data.due_date,
				status: data.status.clone(),
				x: data.x.clone(),
			},
		));
		Ok(account_id)
	}

	async fn read_account(&self, tn_id: TnId, account_id: u64) -> ClResult<Account> {
		self.store
			.lock()
			.accounts
			.iter()
			.find(|(tn, a)| *tn == tn_id.0 && a.account_id == account_id)
			.map(|(_, a)| a.clone())
			.ok_or(Error::NotFound)
	}

	async fn create_folder(&self, _tn_id: TnId, _name: &str) -> ClResult<u64> {
		Ok(self.store.lock().next_id())
	}

	async fn add_folder_member(
		&self,
		tn_id: TnId,
		folder_id: u64,
		consumer_id: u64,
	) -> ClResult<()> {
		self.store.lock().folder_members.push((tn_id.0, folder_id, consumer_id));
		Ok(())
	}

	async fn create_import_batch(&self, tn_id: TnId) -> ClResult<u64> {
		let mut store = self.store.lock();
		let batch_id = store.next_id();
		store.import_batches.push((tn_id.0, batch_id));
		Ok(batch_id)
	}

	async fn list_targets(&self, tn_id: TnId, filter: &TargetFilter) -> ClResult<Vec<TargetRow>> {
		let store = self.store.lock();
		let accounts_of = |consumer_id: u64| -> Vec<Account> {
			store
				.accounts
				.iter()
				.filter(|(tn, a)| *tn == tn_id.0 && a.consumer_id == consumer_id)
				.map(|(_, a)| a.clone())
				.collect()
		};
		let today = chrono::Utc::now().date_naive();
		let mut rows = Vec::new();

		for (tn, consumer) in &store.consumers {
			if *tn != tn_id.0 {
				continue;
			}
			let accounts = accounts_of(consumer.consumer_id);
			match filter {
				TargetFilter::All => {
					if accounts.is_empty() {
						rows.push(TargetRow { consumer: consumer.clone(), account: None });
					}
					for account in accounts {
						rows.push(TargetRow {
							consumer: consumer.clone(),
							account: Some(account),
						});
					}
				}
				TargetFilter::WithBalance => {
					for account in accounts {
						if account.balance_cents.unwrap_or(0) > 0 {
							rows.push(TargetRow {
								consumer: consumer.clone(),
								account: Some(account),
							});
						}
					}
				}
				TargetFilter::Overdue => {
					for account in accounts {
						if account.due_date.is_some_and(|d| d < today) {
							rows.push(TargetRow {
								consumer: consumer.clone(),
								account: Some(account),
							});
						}
					}
				}
				TargetFilter::Decline => {
					for account in accounts {
						if account.status.as_deref() == Some("decline") {
							rows.push(TargetRow {
								consumer: consumer.clone(),
								account: Some(account),
							});
						}
					}
				}
				TargetFilter::RecentUpload => {
					if consumer.import_batch_id.is_some()
						&& consumer.import_batch_id == store.latest_batch(tn_id.0)
					{
						rows.push(TargetRow {
							consumer: consumer.clone(),
							account: accounts.into_iter().next(),
						});
					}
				}
				TargetFilter::Folders(folder_ids) => {
					let member = store.folder_members.iter().any(|(tn, folder, member)| {
						*tn == tn_id.0
							&& *member == consumer.consumer_id
							&& folder_ids.contains(folder)
					});
					if member {
						rows.push(TargetRow {
							consumer: consumer.clone(),
							account: accounts.into_iter().next(),
						});
					}
				}
			}
		}
		Ok(rows)
	}

	async fn create_opt_out(
		&self,
		tn_id: TnId,
		consumer_id: u64,
		channel: Channel,
	) -> ClResult<()> {
		self.store.lock().opt_outs.insert((tn_id.0, consumer_id, channel));
		Ok(())
	}

	async fn list_opt_outs(&self, tn_id: TnId, channel: Channel) -> ClResult<Vec<u64>> {
		Ok(self
			.store
			.lock()
			.opt_outs
			.iter()
			.filter(|(tn, _, ch)| *tn == tn_id.0 && *ch == channel)
			.map(|(_, consumer_id, _)| *consumer_id)
			.collect())
	}

	async fn is_opted_out(
		&self,
		tn_id: TnId,
		consumer_id: u64,
		channel: Channel,
	) -> ClResult<bool> {
		Ok(self.store.lock().opt_outs.contains(&(tn_id.0, consumer_id, channel)))
	}

	async fn create_campaign(
		&self,
		tn_id: TnId,
		data: &CreateCampaignData,
		total_recipients: u32,
	) -> ClResult<Campaign> {
		let mut store = self.store.lock();
		let campaign_id = store.next_id();
		let campaign = Campaign {
			campaign_id,
			tn_id,
			template_id: data.template_id,
			name: data.name.clone(),
			channel: data.channel,
			target_group: data.target_group,
			folder_ids: data.folder_ids.clone().unwrap_or_default(),
			phones_to_send: data.phones_to_send.unwrap_or_default(),
			status: CampaignStatus::PendingApproval,
			total_recipients,
			total_sent: 0,
			total_delivered: 0,
			total_opened: 0,
			total_clicked: 0,
			total_errors: 0,
			total_opt_outs: 0,
			created_at: now(),
			completed_at: None,
		};
		store.campaigns.insert((tn_id.0, campaign_id), campaign.clone());
		Ok(campaign)
	}

	async fn read_campaign(&self, tn_id: TnId, campaign_id: u64) -> ClResult<Campaign> {
		self.store.lock().campaigns.get(&(tn_id.0, campaign_id)).cloned().ok_or(Error::NotFound)
	}

	async fn list_campaigns(&self, tn_id: TnId) -> ClResult<Vec<Campaign>> {
		let store = self.store.lock();
		let mut campaigns: Vec<Campaign> = store
			.campaigns
			.iter()
			.filter(|((tn, _), _)| *tn == tn_id.0)
			.map(|(_, c)| c.clone())
			.collect();
		campaigns.sort_by_key(|c| std::cmp::Reverse(c.campaign_id));
		Ok(campaigns)
	}

	async fn update_campaign_status(
		&self,
		tn_id: TnId,
		campaign_id: u64,
		from: &[CampaignStatus],
		to: CampaignStatus,
	) -> ClResult<bool> {
		let mut store = self.store.lock();
		let campaign =
			store.campaigns.get_mut(&(tn_id.0, campaign_id)).ok_or(Error::NotFound)?;
		if from.contains(&campaign.status) {
			campaign.status = to;
			Ok(true)
		} else {
			Ok(false)
		}
	}

	async fn set_campaign_completed_at(
		&self,
		tn_id: TnId,
		campaign_id: u64,
		at: Timestamp,
	) -> ClResult<()> {
		let mut store = self.store.lock();
		let campaign =
			store.campaigns.get_mut(&(tn_id.0, campaign_id)).ok_or(Error::NotFound)?;
		campaign.completed_at = Some(at);
		Ok(())
	}

	async fn add_campaign_counts(
		&self,
		tn_id: TnId,
		campaign_id: u64,
		counts: &CampaignCounts,
	) -> ClResult<()> {
		let mut store = self.store.lock();
		let campaign =
			store.campaigns.get_mut(&(tn_id.0, campaign_id)).ok_or(Error::NotFound)?;
		campaign.total_sent += counts.sent;
		campaign.total_delivered += counts.delivered;
		campaign.total_opened += counts.opened;
		campaign.total_clicked += counts.clicked;
		campaign.total_errors += counts.errors;
		campaign.total_opt_outs += counts.opt_outs;
		Ok(())
	}

	async fn delete_campaign(&self, tn_id: TnId, campaign_id: u64) -> ClResult<()> {
		let mut store = self.store.lock();
		store.recipients.remove(&(tn_id.0, campaign_id));
		store
			.campaigns
			.remove(&(tn_id.0, campaign_id))
			.map(|_| ())
			.ok_or(Error::NotFound)
	}

	async fn create_campaign_recipients(
		&self,
		tn_id: TnId,
		campaign_id: u64,
		recipients: &[RecipientSnapshot],
	) -> ClResult<()> {
		self.store.lock().recipients.insert((tn_id.0, campaign_id), recipients.to_vec());
		Ok(())
	}

	async fn list_campaign_recipients(
		&self,
		tn_id: TnId,
		campaign_id: u64,
	) -> ClResult<Vec<RecipientSnapshot>> {
		Ok(self.store.lock().recipients.get(&(tn_id.0, campaign_id)).cloned().unwrap_or_default())
	}

	async fn create_delivery(&self, tn_id: TnId, record: &DeliveryRecord) -> ClResult<()> {
		self.store.lock().deliveries.push((tn_id.0, record.clone()));
		Ok(())
	}

	async fn update_delivery_outcome(
		&self,
		tn_id: TnId,
		campaign_id: u64,
		message_id: &str,
		outcome: DeliveryOutcome,
	) -> ClResult<Option<u64>> {
		let mut store = self.store.lock();
		for (tn, record) in store.deliveries.iter_mut() {
			if *tn == tn_id.0
				&& record.campaign_id == campaign_id
				&& record.message_id.as_ref() == message_id
			{
				record.outcome = outcome;
				return Ok(Some(record.consumer_id));
			}
		}
		Ok(None)
	}

	async fn read_delivery_consumer(
		&self,
		tn_id: TnId,
		campaign_id: u64,
		message_id: &str,
	) -> ClResult<Option<u64>> {
		Ok(self
			.store
			.lock()
			.deliveries
			.iter()
			.find(|(tn, record)| {
				*tn == tn_id.0
					&& record.campaign_id == campaign_id
					&& record.message_id.as_ref() == message_id
			})
			.map(|(_, record)| record.consumer_id))
	}

	async fn read_usage(
		&self,
		tn_id: TnId,
		from: Timestamp,
		until: Timestamp,
	) -> ClResult<UsageTotals> {
		let store = self.store.lock();
		let mut totals = UsageTotals::default();
		for (tn, record) in &store.deliveries {
			if *tn != tn_id.0 || record.at < from || record.at >= until {
				continue;
			}
			if matches!(record.outcome, DeliveryOutcome::Error | DeliveryOutcome::OptOut) {
				continue;
			}
			match record.channel {
				Channel::Email => totals.email_sent += 1,
				Channel::Sms => totals.sms_sent += 1,
			}
		}
		Ok(totals)
	}

	async fn read_setting(
		&self,
		tn_id: TnId,
		key: &str,
	) -> ClResult<Option<serde_json::Value>> {
		Ok(self.store.lock().settings.get(&(tn_id.0, key.to_string())).cloned())
	}

	async fn write_setting(
		&self,
		tn_id: TnId,
		key: &str,
		value: &serde_json::Value,
	) -> ClResult<()> {
		self.store.lock().settings.insert((tn_id.0, key.to_string()), value.clone());
		Ok(())
	}
}

// Mock transport //
//****************//
#[derive(Debug)]
pub struct MockTransport {
	channel: Channel,
	counter: AtomicU64,
	fatal: AtomicBool,
	send_delay_ms: AtomicU64,
	fail_addresses: Mutex<HashSet<String>>,
	pub sent: Mutex<Vec<OutboundMessage>>,
}

impl MockTransport {
	pub fn new(channel: Channel) -> Self {
		Self {
			channel,
			counter: AtomicU64::new(0),
			fatal: AtomicBool::new(false),
			send_delay_ms: AtomicU64::new(0),
			fail_addresses: Mutex::new(HashSet::new()),
			sent: Mutex::new(Vec::new()),
		}
	}

	/// Every subsequent send fails like a credential rejection
	pub fn set_fatal(&self) {
		self.fatal.store(true, Ordering::Relaxed);
	}

	/// Sends to this address are rejected (per-recipient error)
	pub fn fail_address(&self, address: &str) {
		self.fail_addresses.lock().insert(address.to_string());
	}

	pub fn set_send_delay_ms(&self, ms: u64) {
		self.send_delay_ms.store(ms, Ordering::Relaxed);
	}

	pub fn sent_count(&self) -> usize {
		self.sent.lock().len()
	}
}

#[async_trait]
impl TransportAdapter for MockTransport {
	fn channel(&self) -> Channel {
		self.channel
	}

	async fn send(
		&self,
		_tn_id: TnId,
		msg: &OutboundMessage,
	) -> Result<SendReceipt, TransportError> {
		let delay = self.send_delay_ms.load(Ordering::Relaxed);
		if delay > 0 {
			tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
		}
		if self.fatal.load(Ordering::Relaxed) {
			return Err(TransportError::Unauthorized("credentials rejected".into()));
		}
		if self.fail_addresses.lock().contains(msg.to.as_ref()) {
			return Err(TransportError::Rejected("address blocked".into()));
		}
		self.sent.lock().push(msg.clone());
		let n = self.counter.fetch_add(1, Ordering::Relaxed);
		Ok(SendReceipt { message_id: format!("mock-{}", n).into() })
	}
}

// Test application //
//******************//
pub struct TestApp {
	pub app: App,
	pub meta: Arc<InMemoryMetaAdapter>,
	pub email: Arc<MockTransport>,
	pub sms: Arc<MockTransport>,
	pub tn_id: TnId,
}

/// Build an application state around the in-memory adapter with one seeded
/// tenant and fast dispatch settings.
pub async fn test_app() -> TestApp {
	let meta = Arc::new(InMemoryMetaAdapter::new());
	let email = Arc::new(MockTransport::new(Channel::Email));
	let sms = Arc::new(MockTransport::new(Channel::Sms));

	let tn_id = meta
		.create_tenant(&CreateTenantData {
			name: "Test Agency".into(),
			from_email: Some("billing@test.example".into()),
			phone: None,
			portal_slug: Some("test-agency".into()),
		})
		.await
		.expect("seed tenant");

	// Keep batches snappy for tests
	meta.write_setting(tn_id, "dispatch.batch_delay_ms", &serde_json::json!(20))
		.await
		.expect("seed settings");

	let mut builder = AppBuilder::new();
	builder
		.meta_adapter(meta.clone())
		.email_transport(email.clone())
		.sms_transport(sms.clone());
	let app = builder.build().expect("build app");

	TestApp { app, meta, email, sms, tn_id }
}

impl TestApp {
	pub async fn seed_template(&self, channel: Channel, subject: Option<&str>, body: &str) -> u64 {
		self.meta
			.create_template(
				self.tn_id,
				&CreateTemplateData {
					name: "test template".into(),
					channel,
					subject: subject.map(Into::into),
					body: body.into(),
				},
			)
			.await
			.expect("seed template")
			.template_id
	}

	pub async fn seed_consumer(&self, first: &str, email: Option<&str>, phones: &[&str]) -> u64 {
		self.meta
			.create_consumer(
				self.tn_id,
				&CreateConsumerData {
					first_name: first.into(),
					last_name: "Test".into(),
					email: email.map(Into::into),
					phones: phones.iter().map(|p| Box::from(*p)).collect(),
					import_batch_id: None,
					x: HashMap::new(),
				},
			)
			.await
			.expect("seed consumer")
	}

	pub async fn seed_account(&self, consumer_id: u64, balance_cents: i64) -> u64 {
		self.meta
			.create_account(
				self.tn_id,
				&CreateAccountData {
					consumer_id,
					account_number: None,
					creditor: None,
					balance_cents: Some(balance_cents),
					due_date: None,
					status: None,
					x: HashMap::new(),
				},
			)
			.await
			.expect("seed account")
	}

	/// Poll campaign status until `pred` holds or the timeout elapses
	pub async fn wait_for(
		&self,
		campaign_id: u64,
		pred: impl Fn(&Campaign) -> bool,
		timeout_ms: u64,
	) -> Campaign {
		let deadline =
			std::time::Instant::now() + std::time::Duration::from_millis(timeout_ms);
		loop {
			let campaign = self
				.meta
				.read_campaign(self.tn_id, campaign_id)
				.await
				.expect("campaign exists");
			if pred(&campaign) {
				return campaign;
			}
			assert!(
				std::time::Instant::now() < deadline,
				"timed out waiting for campaign {} (status {}, sent {})",
				campaign_id,
				campaign.status,
				campaign.total_sent
			);
			tokio::time::sleep(std::time::Duration::from_millis(10)).await;
		}
	}
}

/// Default campaign payload builder
pub fn campaign_data(
	template_id: u64,
	channel: Channel,
	target_group: outreach::meta_adapter::TargetGroup,
) -> CreateCampaignData {
	CreateCampaignData {
		template_id,
		name: "test campaign".into(),
		channel,
		target_group,
		folder_ids: None,
		phones_to_send: Some(PhoneCardinality::One),
	}
}

// vim: ts=4
