//! Campaign persistence: records, CAS status transitions, atomic counter
//! increments, and recipient snapshots

use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use outreach::campaign::CampaignStatus;
use outreach::meta_adapter::{
	Campaign, CampaignCounts, CreateCampaignData, RecipientSnapshot,
};
use outreach::prelude::*;

use crate::utils::*;

fn from_row(tn_id: TnId, row: &SqliteRow) -> Result<Campaign, sqlx::Error> {
	let channel: &str = row.try_get("channel")?;
	let target_group: &str = row.try_get("target_group")?;
	let phones_to_send: &str = row.try_get("phones_to_send")?;
	let status: &str = row.try_get("status")?;
	let folder_ids: Option<&str> = row.try_get("folder_ids")?;
	Ok(Campaign {
		campaign_id: row.try_get::<i64, _>("campaign_id")? as u64,
		tn_id,
		template_id: row.try_get::<i64, _>("template_id")? as u64,
		name: row.try_get("name")?,
		channel: channel_from_str(channel)
			.map_err(|_| sqlx::Error::Decode("invalid channel".into()))?,
		target_group: target_group_from_str(target_group)
			.map_err(|_| sqlx::Error::Decode("invalid target group".into()))?,
		folder_ids: json_u64_list(folder_ids),
		phones_to_send: cardinality_from_str(phones_to_send)
			.map_err(|_| sqlx::Error::Decode("invalid phone cardinality".into()))?,
		// Legacy records may carry the `pending` spelling
		status: CampaignStatus::parse(status)
			.ok_or_else(|| sqlx::Error::Decode("invalid status".into()))?,
		total_recipients: row.try_get::<i64, _>("total_recipients")? as u32,
		total_sent: row.try_get::<i64, _>("total_sent")? as u32,
		total_delivered: row.try_get::<i64, _>("total_delivered")? as u32,
		total_opened: row.try_get::<i64, _>("total_opened")? as u32,
		total_clicked: row.try_get::<i64, _>("total_clicked")? as u32,
		total_errors: row.try_get::<i64, _>("total_errors")? as u32,
		total_opt_outs: row.try_get::<i64, _>("total_opt_outs")? as u32,
		created_at: row.try_get("created_at").map(Timestamp)?,
		completed_at: row.try_get::<Option<i64>, _>("completed_at")?.map(Timestamp),
	})
}

const CAMPAIGN_COLUMNS: &str = "campaign_id, template_id, name, channel, target_group,
	folder_ids, phones_to_send, status, total_recipients, total_sent, total_delivered,
	total_opened, total_clicked, total_errors, total_opt_outs, created_at, completed_at";

pub(crate) async fn create(
	db: &SqlitePool,
	tn_id: TnId,
	data: &CreateCampaignData,
	total_recipients: u32,
) -> ClResult<Campaign> {
	let folder_ids = data.folder_ids.clone().unwrap_or_default();
	let res = sqlx::query(&format!(
		"INSERT INTO campaigns (tn_id, template_id, name, channel, target_group, folder_ids,
			phones_to_send, status, total_recipients)
		VALUES (?, ?, ?, ?, ?, ?, ?, 'pending_approval', ?)
		RETURNING {}",
		CAMPAIGN_COLUMNS
	))
	.bind(tn_id.0)
	.bind(data.template_id as i64)
	.bind(data.name.as_ref())
	.bind(data.channel.to_string())
	.bind(target_group_to_str(data.target_group))
	.bind(to_json(&folder_ids)?)
	.bind(cardinality_to_str(data.phones_to_send.unwrap_or_default()))
	.bind(total_recipients as i64)
	.fetch_one(db)
	.await;

	map_res(res, |row| from_row(tn_id, &row))
}

pub(crate) async fn read(db: &SqlitePool, tn_id: TnId, campaign_id: u64) -> ClResult<Campaign> {
	let res = sqlx::query(&format!(
		"SELECT {} FROM campaigns WHERE tn_id=? AND campaign_id=?",
		CAMPAIGN_COLUMNS
	))
	.bind(tn_id.0)
	.bind(campaign_id as i64)
	.fetch_one(db)
	.await;

	map_res(res, |row| from_row(tn_id, &row))
}

pub(crate) async fn list(db: &SqlitePool, tn_id: TnId) -> ClResult<Vec<Campaign>> {
	let res = sqlx::query(&format!(
		"SELECT {} FROM campaigns WHERE tn_id=? ORDER BY campaign_id DESC",
		CAMPAIGN_COLUMNS
	))
	.bind(tn_id.0)
	.fetch_all(db)
	.await
	.inspect_err(inspect)
	.map_err(|_| Error::DbError)?;

	collect_res(res.iter().map(|row| from_row(tn_id, row)))
}

/// Compare-and-set status transition. The WHERE clause carries every accepted
/// source spelling, so concurrent transitions cannot both win.
pub(crate) async fn update_status(
	db: &SqlitePool,
	tn_id: TnId,
	campaign_id: u64,
	from: &[CampaignStatus],
	to: CampaignStatus,
) -> ClResult<bool> {
	let mut query = sqlx::QueryBuilder::new("UPDATE campaigns SET status=");
	query.push_bind(to.as_str());
	query.push(" WHERE tn_id=").push_bind(tn_id.0);
	query.push(" AND campaign_id=").push_bind(campaign_id as i64);
	query.push(" AND status IN (");
	let mut first = true;
	for status in from {
		if !first {
			query.push(", ");
		}
		query.push_bind(status.as_str());
		first = false;
		if *status == CampaignStatus::PendingApproval {
			// Legacy alias
			query.push(", ").push_bind("pending");
		}
	}
	query.push(")");

	let res = query
		.build()
		.execute(db)
		.await
		.inspect_err(inspect)
		.map_err(|_| Error::DbError)?;
	Ok(res.rows_affected() > 0)
}

pub(crate) async fn set_completed_at(
	db: &SqlitePool,
	tn_id: TnId,
	campaign_id: u64,
	at: Timestamp,
) -> ClResult<()> {
	sqlx::query("UPDATE campaigns SET completed_at=? WHERE tn_id=? AND campaign_id=?")
		.bind(at.0)
		.bind(tn_id.0)
		.bind(campaign_id as i64)
		.execute(db)
		.await
		.inspect_err(inspect)
		.map_err(|_| Error::DbError)?;
	Ok(())
}

/// Counter increments, applied atomically so out-of-order batch completions
/// never lose updates
pub(crate) async fn add_counts(
	db: &SqlitePool,
	tn_id: TnId,
	campaign_id: u64,
	counts: &CampaignCounts,
) -> ClResult<()> {
	if counts.is_zero() {
		return Ok(());
	}
	sqlx::query(
		"UPDATE campaigns SET
			total_sent = total_sent + ?,
			total_delivered = total_delivered + ?,
			total_opened = total_opened + ?,
			total_clicked = total_clicked + ?,
			total_errors = total_errors + ?,
			total_opt_outs = total_opt_outs + ?
		WHERE tn_id=? AND campaign_id=?",
	)
	.bind(counts.sent as i64)
	.bind(counts.delivered as i64)
	.bind(counts.opened as i64)
	.bind(counts.clicked as i64)
	.bind(counts.errors as i64)
	.bind(counts.opt_outs as i64)
	.bind(tn_id.0)
	.bind(campaign_id as i64)
	.execute(db)
	.await
	.inspect_err(inspect)
	.map_err(|_| Error::DbError)?;
	Ok(())
}

pub(crate) async fn delete(db: &SqlitePool, tn_id: TnId, campaign_id: u64) -> ClResult<()> {
	let mut tx = db.begin().await.map_err(|_| Error::DbError)?;

	sqlx::query("DELETE FROM campaign_recipients WHERE tn_id=? AND campaign_id=?")
		.bind(tn_id.0)
		.bind(campaign_id as i64)
		.execute(&mut *tx)
		.await
		.inspect_err(inspect)
		.map_err(|_| Error::DbError)?;
	let res = sqlx::query("DELETE FROM campaigns WHERE tn_id=? AND campaign_id=?")
		.bind(tn_id.0)
		.bind(campaign_id as i64)
		.execute(&mut *tx)
		.await
		.inspect_err(inspect)
		.map_err(|_| Error::DbError)?;
	if res.rows_affected() == 0 {
		return Err(Error::NotFound);
	}

	tx.commit().await.map_err(|_| Error::DbError)?;
	Ok(())
}

// Recipient snapshots
//*********************
pub(crate) async fn create_recipients(
	db: &SqlitePool,
	tn_id: TnId,
	campaign_id: u64,
	recipients: &[RecipientSnapshot],
) -> ClResult<()> {
	let mut tx = db.begin().await.map_err(|_| Error::DbError)?;

	for (seq, recipient) in recipients.iter().enumerate() {
		sqlx::query(
			"INSERT INTO campaign_recipients (tn_id, campaign_id, seq, consumer_id, account_id, addresses)
			VALUES (?, ?, ?, ?, ?, ?)",
		)
		.bind(tn_id.0)
		.bind(campaign_id as i64)
		.bind(seq as i64)
		.bind(recipient.consumer_id as i64)
		.bind(recipient.account_id.map(|id| id as i64))
		.bind(to_json(&recipient.addresses)?)
		.execute(&mut *tx)
		.await
		.inspect_err(inspect)
		.map_err(|_| Error::DbError)?;
	}

	tx.commit().await.map_err(|_| Error::DbError)?;
	Ok(())
}

pub(crate) async fn list_recipients(
	db: &SqlitePool,
	tn_id: TnId,
	campaign_id: u64,
) -> ClResult<Vec<RecipientSnapshot>> {
	let res = sqlx::query(
		"SELECT consumer_id, account_id, addresses
		FROM campaign_recipients WHERE tn_id=? AND campaign_id=? ORDER BY seq",
	)
	.bind(tn_id.0)
	.bind(campaign_id as i64)
	.fetch_all(db)
	.await
	.inspect_err(inspect)
	.map_err(|_| Error::DbError)?;

	collect_res(res.iter().map(|row| {
		let addresses: Option<&str> = row.try_get("addresses")?;
		Ok(RecipientSnapshot {
			consumer_id: row.try_get::<i64, _>("consumer_id")? as u64,
			account_id: row.try_get::<Option<i64>, _>("account_id")?.map(|id| id as u64),
			addresses: json_str_list(addresses),
		})
	}))
}

// vim: ts=4
