//! Delivery records and per-period usage totals

use sqlx::{Row, SqlitePool};

use outreach::meta_adapter::{Channel, DeliveryOutcome, DeliveryRecord, UsageTotals};
use outreach::prelude::*;

use crate::utils::*;

fn outcome_to_str(outcome: DeliveryOutcome) -> &'static str {
	match outcome {
		DeliveryOutcome::Sent => "sent",
		DeliveryOutcome::Delivered => "delivered",
		DeliveryOutcome::Opened => "opened",
		DeliveryOutcome::Clicked => "clicked",
		DeliveryOutcome::Error => "error",
		DeliveryOutcome::OptOut => "opt_out",
	}
}

pub(crate) async fn create(
	db: &SqlitePool,
	tn_id: TnId,
	record: &DeliveryRecord,
) -> ClResult<()> {
	sqlx::query(
		"INSERT INTO deliveries (tn_id, campaign_id, consumer_id, channel, address, message_id, outcome, created_at)
		VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
	)
	.bind(tn_id.0)
	.bind(record.campaign_id as i64)
	.bind(record.consumer_id as i64)
	.bind(record.channel.to_string())
	.bind(record.address.as_ref())
	.bind(record.message_id.as_ref())
	.bind(outcome_to_str(record.outcome))
	.bind(record.at.0)
	.execute(db)
	.await
	.inspect_err(inspect)
	.map_err(|_| Error::DbError)?;
	Ok(())
}

pub(crate) async fn update_outcome(
	db: &SqlitePool,
	tn_id: TnId,
	campaign_id: u64,
	message_id: &str,
	outcome: DeliveryOutcome,
) -> ClResult<Option<u64>> {
	let res = sqlx::query(
		"UPDATE deliveries SET outcome=?
		WHERE tn_id=? AND campaign_id=? AND message_id=?
		RETURNING consumer_id",
	)
	.bind(outcome_to_str(outcome))
	.bind(tn_id.0)
	.bind(campaign_id as i64)
	.bind(message_id)
	.fetch_optional(db)
	.await
	.inspect_err(inspect)
	.map_err(|_| Error::DbError)?;

	match res {
		Some(row) => Ok(Some(
			row.try_get::<i64, _>("consumer_id").map_err(|_| Error::DbError)? as u64,
		)),
		None => Ok(None),
	}
}

pub(crate) async fn read_consumer(
	db: &SqlitePool,
	tn_id: TnId,
	campaign_id: u64,
	message_id: &str,
) -> ClResult<Option<u64>> {
	let res = sqlx::query(
		"SELECT consumer_id FROM deliveries
		WHERE tn_id=? AND campaign_id=? AND message_id=? LIMIT 1",
	)
	.bind(tn_id.0)
	.bind(campaign_id as i64)
	.bind(message_id)
	.fetch_optional(db)
	.await
	.inspect_err(inspect)
	.map_err(|_| Error::DbError)?;

	match res {
		Some(row) => Ok(Some(
			row.try_get::<i64, _>("consumer_id").map_err(|_| Error::DbError)? as u64,
		)),
		None => Ok(None),
	}
}

/// Per-channel totals of messages handed to a transport in the period.
/// Outcomes that follow a successful send (delivered/opened/clicked) still
/// count; errors and opt-outs do not.
pub(crate) async fn read_usage(
	db: &SqlitePool,
	tn_id: TnId,
	from: Timestamp,
	until: Timestamp,
) -> ClResult<UsageTotals> {
	let res = sqlx::query(
		"SELECT channel, COUNT(*) as cnt FROM deliveries
		WHERE tn_id=? AND created_at >= ? AND created_at < ?
			AND outcome IN ('sent', 'delivered', 'opened', 'clicked')
		GROUP BY channel",
	)
	.bind(tn_id.0)
	.bind(from.0)
	.bind(until.0)
	.fetch_all(db)
	.await
	.inspect_err(inspect)
	.map_err(|_| Error::DbError)?;

	let mut totals = UsageTotals::default();
	for row in res {
		let channel: &str = row.try_get("channel").map_err(|_| Error::DbError)?;
		let count: i64 = row.try_get("cnt").map_err(|_| Error::DbError)?;
		match channel_from_str(channel)? {
			Channel::Email => totals.email_sent = count as u64,
			Channel::Sms => totals.sms_sent = count as u64,
		}
	}
	Ok(totals)
}

// vim: ts=4
