//! Tenant persistence

use sqlx::{Row, SqlitePool};

use outreach::meta_adapter::{CreateTenantData, Tenant};
use outreach::prelude::*;

use crate::utils::*;

pub(crate) async fn read(db: &SqlitePool, tn_id: TnId) -> ClResult<Tenant> {
	let res = sqlx::query(
		"SELECT tn_id, name, from_email, phone, portal_slug, x, created_at
		FROM tenants WHERE tn_id=?",
	)
	.bind(tn_id.0)
	.fetch_one(db)
	.await;

	map_res(res, |row| {
		let x: Option<&str> = row.try_get("x")?;
		Ok(Tenant {
			tn_id,
			name: row.try_get("name")?,
			from_email: row.try_get("from_email")?,
			phone: row.try_get("phone")?,
			portal_slug: row.try_get("portal_slug")?,
			created_at: row.try_get("created_at").map(Timestamp)?,
			x: json_map(x),
		})
	})
}

pub(crate) async fn create(db: &SqlitePool, data: &CreateTenantData) -> ClResult<TnId> {
	let res = sqlx::query(
		"INSERT INTO tenants (name, from_email, phone, portal_slug, x)
		VALUES (?, ?, ?, ?, '{}') RETURNING tn_id",
	)
	.bind(data.name.as_ref())
	.bind(data.from_email.as_deref())
	.bind(data.phone.as_deref())
	.bind(data.portal_slug.as_deref())
	.fetch_one(db)
	.await;

	map_res(res, |row| Ok(TnId(row.try_get("tn_id")?)))
}

// vim: ts=4
