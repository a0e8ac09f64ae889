//! Template persistence

use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use outreach::meta_adapter::{CreateTemplateData, Template, UpdateTemplateData};
use outreach::prelude::*;

use crate::utils::*;

fn from_row(tn_id: TnId, row: &SqliteRow) -> Result<Template, sqlx::Error> {
	let channel: &str = row.try_get("channel")?;
	Ok(Template {
		template_id: row.try_get::<i64, _>("template_id")? as u64,
		tn_id,
		name: row.try_get("name")?,
		channel: channel_from_str(channel).map_err(|_| sqlx::Error::Decode("invalid channel".into()))?,
		subject: row.try_get("subject")?,
		body: row.try_get("body")?,
		created_at: row.try_get("created_at").map(Timestamp)?,
	})
}

pub(crate) async fn create(
	db: &SqlitePool,
	tn_id: TnId,
	data: &CreateTemplateData,
) -> ClResult<Template> {
	let res = sqlx::query(
		"INSERT INTO templates (tn_id, name, channel, subject, body)
		VALUES (?, ?, ?, ?, ?)
		RETURNING template_id, name, channel, subject, body, created_at",
	)
	.bind(tn_id.0)
	.bind(data.name.as_ref())
	.bind(data.channel.to_string())
	.bind(data.subject.as_deref())
	.bind(data.body.as_ref())
	.fetch_one(db)
	.await;

	map_res(res, |row| from_row(tn_id, &row))
}

pub(crate) async fn read(db: &SqlitePool, tn_id: TnId, template_id: u64) -> ClResult<Template> {
	let res = sqlx::query(
		"SELECT template_id, name, channel, subject, body, created_at
		FROM templates WHERE tn_id=? AND template_id=?",
	)
	.bind(tn_id.0)
	.bind(template_id as i64)
	.fetch_one(db)
	.await;

	map_res(res, |row| from_row(tn_id, &row))
}

pub(crate) async fn update(
	db: &SqlitePool,
	tn_id: TnId,
	template_id: u64,
	data: &UpdateTemplateData,
) -> ClResult<()> {
	let mut query = sqlx::QueryBuilder::new("UPDATE templates SET ");
	let mut has_fields = false;

	if let Patch::Value(ref name) = data.name {
		query.push("name=").push_bind(name.as_ref());
		has_fields = true;
	}
	match &data.subject {
		Patch::Value(subject) => {
			if has_fields {
				query.push(", ");
			}
			query.push("subject=").push_bind(subject.as_ref());
			has_fields = true;
		}
		Patch::Null => {
			if has_fields {
				query.push(", ");
			}
			query.push("subject=NULL");
			has_fields = true;
		}
		Patch::Undefined => {}
	}
	if let Patch::Value(ref body) = data.body {
		if has_fields {
			query.push(", ");
		}
		query.push("body=").push_bind(body.as_ref());
		has_fields = true;
	}

	if !has_fields {
		return Ok(());
	}
	query.push(" WHERE tn_id=").push_bind(tn_id.0);
	query.push(" AND template_id=").push_bind(template_id as i64);

	let res = query
		.build()
		.execute(db)
		.await
		.inspect_err(inspect)
		.map_err(|_| Error::DbError)?;
	if res.rows_affected() == 0 {
		return Err(Error::NotFound);
	}
	Ok(())
}

pub(crate) async fn delete(db: &SqlitePool, tn_id: TnId, template_id: u64) -> ClResult<()> {
	let res = sqlx::query("DELETE FROM templates WHERE tn_id=? AND template_id=?")
		.bind(tn_id.0)
		.bind(template_id as i64)
		.execute(db)
		.await
		.inspect_err(inspect)
		.map_err(|_| Error::DbError)?;
	if res.rows_affected() == 0 {
		return Err(Error::NotFound);
	}
	Ok(())
}

pub(crate) async fn list(db: &SqlitePool, tn_id: TnId) -> ClResult<Vec<Template>> {
	let res = sqlx::query(
		"SELECT template_id, name, channel, subject, body, created_at
		FROM templates WHERE tn_id=? ORDER BY template_id",
	)
	.bind(tn_id.0)
	.fetch_all(db)
	.await
	.inspect_err(inspect)
	.map_err(|_| Error::DbError)?;

	collect_res(res.iter().map(|row| from_row(tn_id, row)))
}

// vim: ts=4
