//! Settings key/value persistence

use sqlx::{Row, SqlitePool};

use outreach::prelude::*;

use crate::utils::inspect;

pub(crate) async fn read(
	db: &SqlitePool,
	tn_id: TnId,
	key: &str,
) -> ClResult<Option<serde_json::Value>> {
	let res = sqlx::query("SELECT value FROM settings WHERE tn_id=? AND name=?")
		.bind(tn_id.0)
		.bind(key)
		.fetch_optional(db)
		.await
		.inspect_err(inspect)
		.map_err(|_| Error::DbError)?;

	match res {
		Some(row) => {
			let value: Option<&str> = row.try_get("value").map_err(|_| Error::DbError)?;
			Ok(value.and_then(|v| serde_json::from_str(v).ok()))
		}
		None => Ok(None),
	}
}

pub(crate) async fn write(
	db: &SqlitePool,
	tn_id: TnId,
	key: &str,
	value: &serde_json::Value,
) -> ClResult<()> {
	sqlx::query(
		"INSERT INTO settings (tn_id, name, value) VALUES (?, ?, ?)
		ON CONFLICT(tn_id, name) DO UPDATE SET value=excluded.value",
	)
	.bind(tn_id.0)
	.bind(key)
	.bind(value.to_string())
	.execute(db)
	.await
	.inspect_err(inspect)
	.map_err(|_| Error::DbError)?;
	Ok(())
}

// vim: ts=4
