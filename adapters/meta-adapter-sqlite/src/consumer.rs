//! Consumers, accounts, folders, import batches, opt-outs, and the filtered
//! targeting query

use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use outreach::meta_adapter::{
	Account, Channel, Consumer, CreateAccountData, CreateConsumerData, TargetFilter, TargetRow,
};
use outreach::prelude::*;

use crate::utils::*;

pub(crate) fn consumer_from_row(row: &SqliteRow) -> Result<Consumer, sqlx::Error> {
	let phones: Option<&str> = row.try_get("phones")?;
	let x: Option<&str> = row.try_get("x")?;
	Ok(Consumer {
		consumer_id: row.try_get::<i64, _>("consumer_id")? as u64,
		first_name: row.try_get("first_name")?,
		last_name: row.try_get("last_name")?,
		email: row.try_get("email")?,
		phones: json_str_list(phones),
		import_batch_id: row.try_get::<Option<i64>, _>("import_batch_id")?.map(|id| id as u64),
		x: json_map(x),
		created_at: row.try_get("created_at").map(Timestamp)?,
	})
}

fn account_from_row(row: &SqliteRow) -> Result<Option<Account>, sqlx::Error> {
	let account_id: Option<i64> = row.try_get("account_id")?;
	let Some(account_id) = account_id else {
		return Ok(None);
	};
	let due_date: Option<&str> = row.try_get("due_date")?;
	let x: Option<&str> = row.try_get("account_x")?;
	Ok(Some(Account {
		account_id: account_id as u64,
		consumer_id: row.try_get::<i64, _>("consumer_id")? as u64,
		account_number: row.try_get("account_number")?,
		creditor: row.try_get("creditor")?,
		balance_cents: row.try_get("balance_cents")?,
		due_date: due_date.and_then(|d| chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
		status: row.try_get("status")?,
		x: json_map(x),
	}))
}

pub(crate) async fn create_consumer(
	db: &SqlitePool,
	tn_id: TnId,
	data: &CreateConsumerData,
) -> ClResult<u64> {
	let res = sqlx::query(
		"INSERT INTO consumers (tn_id, first_name, last_name, email, phones, import_batch_id, x)
		VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING consumer_id",
	)
	.bind(tn_id.0)
	.bind(data.first_name.as_ref())
	.bind(data.last_name.as_ref())
	.bind(data.email.as_deref())
	.bind(to_json(&data.phones)?)
	.bind(data.import_batch_id.map(|id| id as i64))
	.bind(to_json(&data.x)?)
	.fetch_one(db)
	.await;

	map_res(res, |row| Ok(row.try_get::<i64, _>("consumer_id")? as u64))
}

pub(crate) async fn read_consumer(
	db: &SqlitePool,
	tn_id: TnId,
	consumer_id: u64,
) -> ClResult<Consumer> {
	let res = sqlx::query(
		"SELECT consumer_id, first_name, last_name, email, phones, import_batch_id, x, created_at
		FROM consumers WHERE tn_id=? AND consumer_id=?",
	)
	.bind(tn_id.0)
	.bind(consumer_id as i64)
	.fetch_one(db)
	.await;

	map_res(res, |row| consumer_from_row(&row))
}

pub(crate) async fn create_account(
	db: &SqlitePool,
	tn_id: TnId,
	data: &CreateAccountData,
) -> ClResult<u64> {
	let res = sqlx::query(
		"INSERT INTO accounts (tn_id, consumer_id, account_number, creditor, balance_cents, due_date, status, x)
		VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING account_id",
	)
	.bind(tn_id.0)
	.bind(data.consumer_id as i64)
	.bind(data.account_number.as_deref())
	.bind(data.creditor.as_deref())
	.bind(data.balance_cents)
	.bind(data.due_date.map(|d| d.format("%Y-%m-%d").to_string()))
	.bind(data.status.as_deref())
	.bind(to_json(&data.x)?)
	.fetch_one(db)
	.await;

	map_res(res, |row| Ok(row.try_get::<i64, _>("account_id")? as u64))
}

pub(crate) async fn read_account(
	db: &SqlitePool,
	tn_id: TnId,
	account_id: u64,
) -> ClResult<Account> {
	let res = sqlx::query(
		"SELECT account_id, consumer_id, account_number, creditor, balance_cents, due_date, status, x as account_x
		FROM accounts WHERE tn_id=? AND account_id=?",
	)
	.bind(tn_id.0)
	.bind(account_id as i64)
	.fetch_one(db)
	.await;

	map_res(res, |row| {
		account_from_row(&row)?.ok_or_else(|| sqlx::Error::RowNotFound)
	})
}

pub(crate) async fn create_folder(db: &SqlitePool, tn_id: TnId, name: &str) -> ClResult<u64> {
	let res = sqlx::query("INSERT INTO folders (tn_id, name) VALUES (?, ?) RETURNING folder_id")
		.bind(tn_id.0)
		.bind(name)
		.fetch_one(db)
		.await;

	map_res(res, |row| Ok(row.try_get::<i64, _>("folder_id")? as u64))
}

pub(crate) async fn add_folder_member(
	db: &SqlitePool,
	tn_id: TnId,
	folder_id: u64,
	consumer_id: u64,
) -> ClResult<()> {
	sqlx::query(
		"INSERT OR IGNORE INTO folder_members (tn_id, folder_id, consumer_id) VALUES (?, ?, ?)",
	)
	.bind(tn_id.0)
	.bind(folder_id as i64)
	.bind(consumer_id as i64)
	.execute(db)
	.await
	.inspect_err(inspect)
	.map_err(|_| Error::DbError)?;
	Ok(())
}

pub(crate) async fn create_import_batch(db: &SqlitePool, tn_id: TnId) -> ClResult<u64> {
	let res = sqlx::query("INSERT INTO import_batches (tn_id) VALUES (?) RETURNING batch_id")
		.bind(tn_id.0)
		.fetch_one(db)
		.await;

	map_res(res, |row| Ok(row.try_get::<i64, _>("batch_id")? as u64))
}

// Opt-outs
//**********
pub(crate) async fn create_opt_out(
	db: &SqlitePool,
	tn_id: TnId,
	consumer_id: u64,
	channel: Channel,
) -> ClResult<()> {
	sqlx::query("INSERT OR IGNORE INTO opt_outs (tn_id, consumer_id, channel) VALUES (?, ?, ?)")
		.bind(tn_id.0)
		.bind(consumer_id as i64)
		.bind(channel.to_string())
		.execute(db)
		.await
		.inspect_err(inspect)
		.map_err(|_| Error::DbError)?;
	Ok(())
}

pub(crate) async fn list_opt_outs(
	db: &SqlitePool,
	tn_id: TnId,
	channel: Channel,
) -> ClResult<Vec<u64>> {
	let res = sqlx::query("SELECT consumer_id FROM opt_outs WHERE tn_id=? AND channel=?")
		.bind(tn_id.0)
		.bind(channel.to_string())
		.fetch_all(db)
		.await
		.inspect_err(inspect)
		.map_err(|_| Error::DbError)?;

	collect_res(res.iter().map(|row| Ok(row.try_get::<i64, _>("consumer_id")? as u64)))
}

pub(crate) async fn is_opted_out(
	db: &SqlitePool,
	tn_id: TnId,
	consumer_id: u64,
	channel: Channel,
) -> ClResult<bool> {
	let res = sqlx::query(
		"SELECT 1 FROM opt_outs WHERE tn_id=? AND consumer_id=? AND channel=? LIMIT 1",
	)
	.bind(tn_id.0)
	.bind(consumer_id as i64)
	.bind(channel.to_string())
	.fetch_optional(db)
	.await
	.inspect_err(inspect)
	.map_err(|_| Error::DbError)?;
	Ok(res.is_some())
}

// Targeting
//***********
const TARGET_COLUMNS: &str = "c.consumer_id, c.first_name, c.last_name, c.email, c.phones,
	c.import_batch_id, c.x, c.created_at,
	a.account_id, a.account_number, a.creditor, a.balance_cents, a.due_date, a.status,
	a.x as account_x";

/// Run the filtered targeting query. Rows come back in consumer insertion
/// order and may repeat a consumer when several accounts qualify; the
/// resolver applies opt-out exclusion and dedup.
pub(crate) async fn list_targets(
	db: &SqlitePool,
	tn_id: TnId,
	filter: &TargetFilter,
) -> ClResult<Vec<TargetRow>> {
	let mut query = sqlx::QueryBuilder::new(format!("SELECT {} FROM consumers c ", TARGET_COLUMNS));

	match filter {
		TargetFilter::All => {
			query.push("LEFT JOIN accounts a ON a.consumer_id=c.consumer_id AND a.tn_id=c.tn_id ");
			query.push("WHERE c.tn_id=").push_bind(tn_id.0);
		}
		TargetFilter::WithBalance => {
			query.push("JOIN accounts a ON a.consumer_id=c.consumer_id AND a.tn_id=c.tn_id ");
			query.push("WHERE c.tn_id=").push_bind(tn_id.0);
			query.push(" AND a.balance_cents > 0");
		}
		TargetFilter::Overdue => {
			query.push("JOIN accounts a ON a.consumer_id=c.consumer_id AND a.tn_id=c.tn_id ");
			query.push("WHERE c.tn_id=").push_bind(tn_id.0);
			query.push(" AND a.due_date IS NOT NULL AND a.due_date < date('now')");
		}
		TargetFilter::Decline => {
			query.push("JOIN accounts a ON a.consumer_id=c.consumer_id AND a.tn_id=c.tn_id ");
			query.push("WHERE c.tn_id=").push_bind(tn_id.0);
			query.push(" AND a.status='decline'");
		}
		TargetFilter::RecentUpload => {
			query.push("LEFT JOIN accounts a ON a.consumer_id=c.consumer_id AND a.tn_id=c.tn_id ");
			query.push("WHERE c.tn_id=").push_bind(tn_id.0);
			query.push(
				" AND c.import_batch_id = (SELECT batch_id FROM import_batches WHERE tn_id=",
			);
			query.push_bind(tn_id.0);
			query.push(" ORDER BY created_at DESC, batch_id DESC LIMIT 1)");
		}
		TargetFilter::Folders(folder_ids) => {
			query.push("JOIN folder_members fm ON fm.consumer_id=c.consumer_id AND fm.tn_id=c.tn_id ");
			query.push("LEFT JOIN accounts a ON a.consumer_id=c.consumer_id AND a.tn_id=c.tn_id ");
			query.push("WHERE c.tn_id=").push_bind(tn_id.0);
			query.push(" AND fm.folder_id IN ");
			query = push_in_u64(query, folder_ids);
		}
	}
	query.push(" ORDER BY c.consumer_id, a.account_id");

	let res = query
		.build()
		.fetch_all(db)
		.await
		.inspect_err(inspect)
		.map_err(|_| Error::DbError)?;

	collect_res(res.iter().map(|row| {
		Ok(TargetRow { consumer: consumer_from_row(row)?, account: account_from_row(row)? })
	}))
}

// vim: ts=4
