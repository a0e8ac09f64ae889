//! Batched campaign dispatch
//!
//! One tokio task per approved campaign, independent of the request that
//! triggered approval. Recipients are processed in fixed-size batches with
//! bounded concurrency and an inter-batch delay; counters are persisted after
//! every batch so polling reflects near-real-time progress. Cancellation is
//! cooperative: a registry flag is checked at each batch boundary (persisted
//! status as backstop), in-flight sends complete, no new batch starts.

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::campaign::state::CampaignStatus;
use crate::meta_adapter::{
	Campaign, CampaignCounts, DeliveryOutcome, DeliveryRecord, RecipientSnapshot, Template,
	Tenant,
};
use crate::prelude::*;
use crate::template::{EntityBundle, render_message};
use crate::transport_adapter::{OutboundMessage, TransportAdapter};
use crate::types::now;

// DispatchRegistry //
//******************//
/// Cancellation flags for running dispatch tasks, keyed by campaign id.
/// Tripping the flag avoids a storage round-trip at every batch boundary.
#[derive(Debug, Default)]
pub struct DispatchRegistry {
	inner: parking_lot::Mutex<HashMap<u64, Arc<AtomicBool>>>,
}

impl DispatchRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	fn register(&self, campaign_id: u64) -> Arc<AtomicBool> {
		let flag = Arc::new(AtomicBool::new(false));
		self.inner.lock().insert(campaign_id, flag.clone());
		flag
	}

	fn remove(&self, campaign_id: u64) {
		self.inner.lock().remove(&campaign_id);
	}

	/// Trip the cancellation flag. Returns whether a dispatch task was
	/// actually running; a miss is a no-op (cancellation race).
	pub fn cancel(&self, campaign_id: u64) -> bool {
		match self.inner.lock().get(&campaign_id) {
			Some(flag) => {
				flag.store(true, Ordering::Relaxed);
				true
			}
			None => false,
		}
	}

	pub fn is_running(&self, campaign_id: u64) -> bool {
		self.inner.lock().contains_key(&campaign_id)
	}
}

/// Per-recipient outcome within a batch
enum RecipientOutcome {
	Sent,
	Error,
	OptOut,
	/// Unrecoverable transport condition; aborts the remaining batches
	Fatal(String),
}

/// Start the dispatch task for an approved campaign (fire-and-continue).
pub fn spawn_dispatch(app: App, tn_id: TnId, campaign_id: u64) {
	let cancel = app.dispatch.register(campaign_id);
	tokio::spawn(async move {
		match run_dispatch(&app, tn_id, campaign_id, &cancel).await {
			Ok(()) => {}
			Err(err) => error!("Dispatch for campaign {} aborted: {}", campaign_id, err),
		}
		app.dispatch.remove(campaign_id);
	});
}

async fn run_dispatch(
	app: &App,
	tn_id: TnId,
	campaign_id: u64,
	cancel: &AtomicBool,
) -> ClResult<()> {
	let campaign = app.meta_adapter.read_campaign(tn_id, campaign_id).await?;
	let template = app.meta_adapter.read_template(tn_id, campaign.template_id).await?;
	let tenant = app.meta_adapter.read_tenant(tn_id).await?;
	let recipients = app.meta_adapter.list_campaign_recipients(tn_id, campaign_id).await?;

	let batch_size =
		app.settings.get_int(tn_id, "dispatch.batch_size").await?.clamp(1, 100) as usize;
	let batch_delay = std::time::Duration::from_millis(
		app.settings.get_int(tn_id, "dispatch.batch_delay_ms").await?.clamp(0, 60_000) as u64,
	);
	let portal_base = app.settings.get_string(tn_id, "portal.base_url").await.ok();
	let transport = app.transport(campaign.channel);

	info!(
		"Dispatching campaign {} ({} recipients, batches of {})",
		campaign_id,
		recipients.len(),
		batch_size
	);

	for (index, batch) in recipients.chunks(batch_size).enumerate() {
		if index > 0 {
			tokio::time::sleep(batch_delay).await;
		}

		// Cancellation flag first, persisted status as backstop
		if cancel.load(Ordering::Relaxed) {
			info!("Campaign {} cancelled, stopping before batch {}", campaign_id, index);
			return Ok(());
		}
		let current = app.meta_adapter.read_campaign(tn_id, campaign_id).await?;
		if current.status != CampaignStatus::Sending {
			info!(
				"Campaign {} left sending state ({}), stopping dispatch",
				campaign_id, current.status
			);
			return Ok(());
		}

		let outcomes = join_all(batch.iter().map(|recipient| {
			send_recipient(
				app,
				tn_id,
				&campaign,
				&template,
				&tenant,
				portal_base.as_deref(),
				transport.as_ref(),
				recipient,
			)
		}))
		.await;

		let mut counts = CampaignCounts::default();
		let mut fatal = None;
		for outcome in outcomes {
			match outcome {
				RecipientOutcome::Sent => counts.sent += 1,
				RecipientOutcome::Error => counts.errors += 1,
				RecipientOutcome::OptOut => counts.opt_outs += 1,
				RecipientOutcome::Fatal(msg) => {
					counts.errors += 1;
					fatal = Some(msg);
				}
			}
		}
		// Progress stays observable: persist after every batch, not at the end
		app.meta_adapter.add_campaign_counts(tn_id, campaign_id, &counts).await?;

		if let Some(msg) = fatal {
			let moved = app
				.meta_adapter
				.update_campaign_status(
					tn_id,
					campaign_id,
					&[CampaignStatus::Sending],
					CampaignStatus::Failed,
				)
				.await?;
			if moved {
				warn!("Campaign {} failed, counters preserved as of abort", campaign_id);
			}
			return Err(Error::FatalDispatch(msg));
		}
	}

	// Recipient list exhausted without a fatal error
	let moved = app
		.meta_adapter
		.update_campaign_status(
			tn_id,
			campaign_id,
			&[CampaignStatus::Sending],
			CampaignStatus::Completed,
		)
		.await?;
	if moved {
		app.meta_adapter.set_campaign_completed_at(tn_id, campaign_id, now()).await?;
		info!("Campaign {} completed", campaign_id);
	}
	Ok(())
}

/// Render and send every address of one recipient. The recipient counts as
/// sent when at least one address was accepted; SMS fan-out messages are
/// billed individually through their delivery records.
#[allow(clippy::too_many_arguments)]
async fn send_recipient(
	app: &App,
	tn_id: TnId,
	campaign: &Campaign,
	template: &Template,
	tenant: &Tenant,
	portal_base: Option<&str>,
	transport: &dyn TransportAdapter,
	recipient: &RecipientSnapshot,
) -> RecipientOutcome {
	// Opt-outs recorded since the snapshot still win
	match app.meta_adapter.is_opted_out(tn_id, recipient.consumer_id, campaign.channel).await {
		Ok(true) => {
			record_delivery(
				app,
				tn_id,
				campaign,
				recipient.consumer_id,
				recipient.addresses.first().map(AsRef::as_ref).unwrap_or(""),
				&local_message_id(),
				DeliveryOutcome::OptOut,
			)
			.await;
			return RecipientOutcome::OptOut;
		}
		Ok(false) => {}
		Err(err) => {
			warn!("Opt-out check failed for consumer {}: {}", recipient.consumer_id, err);
			return RecipientOutcome::Error;
		}
	}

	let consumer = match app.meta_adapter.read_consumer(tn_id, recipient.consumer_id).await {
		Ok(consumer) => consumer,
		Err(err) => {
			warn!("Missing consumer {} for campaign {}: {}", recipient.consumer_id, campaign.campaign_id, err);
			return RecipientOutcome::Error;
		}
	};
	let account = match recipient.account_id {
		Some(account_id) => app.meta_adapter.read_account(tn_id, account_id).await.ok(),
		None => None,
	};

	let ctx =
		EntityBundle { consumer: &consumer, account: account.as_ref(), tenant, portal_base }
			.context();
	let content = render_message(template, &ctx);

	let mut sent_any = false;
	for address in &recipient.addresses {
		let msg = OutboundMessage {
			channel: campaign.channel,
			to: address.clone(),
			subject: content.subject.clone().map(Into::into),
			body: content.body.clone().into(),
			text_body: content.text_body.clone().map(Into::into),
			campaign_id: campaign.campaign_id,
			consumer_id: recipient.consumer_id,
		};
		match transport.send(tn_id, &msg).await {
			Ok(receipt) => {
				sent_any = true;
				record_delivery(
					app,
					tn_id,
					campaign,
					recipient.consumer_id,
					address,
					&receipt.message_id,
					DeliveryOutcome::Sent,
				)
				.await;
			}
			Err(err) if err.is_fatal() => {
				warn!("Fatal transport error for campaign {}: {}", campaign.campaign_id, err);
				return RecipientOutcome::Fatal(err.to_string());
			}
			Err(err) => {
				debug!("Send to {} failed: {}", address, err);
				record_delivery(
					app,
					tn_id,
					campaign,
					recipient.consumer_id,
					address,
					&local_message_id(),
					DeliveryOutcome::Error,
				)
				.await;
			}
		}
	}

	if sent_any { RecipientOutcome::Sent } else { RecipientOutcome::Error }
}

async fn record_delivery(
	app: &App,
	tn_id: TnId,
	campaign: &Campaign,
	consumer_id: u64,
	address: &str,
	message_id: &str,
	outcome: DeliveryOutcome,
) {
	let record = DeliveryRecord {
		campaign_id: campaign.campaign_id,
		consumer_id,
		channel: campaign.channel,
		address: address.into(),
		message_id: message_id.into(),
		outcome,
		at: now(),
	};
	// Bookkeeping must not abort the batch
	if let Err(err) = app.meta_adapter.create_delivery(tn_id, &record).await {
		warn!("Failed to record delivery for campaign {}: {}", campaign.campaign_id, err);
	}
}

/// Local id for rows that never reached the provider
fn local_message_id() -> String {
	format!("local-{}", uuid::Uuid::new_v4())
}

// vim: ts=4
