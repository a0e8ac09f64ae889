//! Shared row-mapping and query helpers

use sqlx::sqlite::SqliteRow;
use std::collections::HashMap;

use outreach::prelude::*;

pub(crate) fn inspect(err: &sqlx::Error) {
	warn!("DB: {:#?}", err);
}

pub(crate) fn map_res<T, F>(row: Result<SqliteRow, sqlx::Error>, f: F) -> ClResult<T>
where
	F: FnOnce(SqliteRow) -> Result<T, sqlx::Error>,
{
	match row {
		Ok(row) => f(row).inspect_err(inspect).map_err(|_| Error::DbError),
		Err(sqlx::Error::RowNotFound) => Err(Error::NotFound),
		Err(err) => {
			inspect(&err);
			Err(Error::DbError)
		}
	}
}

pub(crate) fn collect_res<T>(
	iter: impl Iterator<Item = Result<T, sqlx::Error>>,
) -> ClResult<Vec<T>> {
	let mut items = Vec::new();
	for item in iter {
		items.push(item.inspect_err(inspect).map_err(|_| Error::DbError)?);
	}
	Ok(items)
}

/// Append a bound `(?, ?, ...)` list to a query
pub(crate) fn push_in_u64<'a>(
	mut query: sqlx::QueryBuilder<'a, sqlx::Sqlite>,
	values: &'a [u64],
) -> sqlx::QueryBuilder<'a, sqlx::Sqlite> {
	query.push("(");
	for (i, value) in values.iter().enumerate() {
		if i > 0 {
			query.push(", ");
		}
		query.push_bind(*value as i64);
	}
	query.push(")");
	query
}

/// Decode a JSON object column into the open string map; missing or invalid
/// values decode to an empty map.
pub(crate) fn json_map(s: Option<&str>) -> HashMap<Box<str>, Box<str>> {
	s.and_then(|s| serde_json::from_str(s).ok()).unwrap_or_default()
}

pub(crate) fn json_str_list(s: Option<&str>) -> Box<[Box<str>]> {
	s.and_then(|s| serde_json::from_str(s).ok()).unwrap_or_default()
}

pub(crate) fn json_u64_list(s: Option<&str>) -> Box<[u64]> {
	s.and_then(|s| serde_json::from_str(s).ok()).unwrap_or_default()
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> ClResult<String> {
	serde_json::to_string(value).map_err(|_| Error::DbError)
}

// Enum <-> column text //
//**********************//
use outreach::meta_adapter::{Channel, PhoneCardinality, TargetGroup};

pub(crate) fn channel_from_str(s: &str) -> ClResult<Channel> {
	match s {
		"email" => Ok(Channel::Email),
		"sms" => Ok(Channel::Sms),
		_ => Err(Error::DbError),
	}
}

pub(crate) fn target_group_to_str(tg: TargetGroup) -> &'static str {
	match tg {
		TargetGroup::All => "all",
		TargetGroup::WithBalance => "with-balance",
		TargetGroup::Overdue => "overdue",
		TargetGroup::Decline => "decline",
		TargetGroup::RecentUpload => "recent-upload",
		TargetGroup::Folder => "folder",
	}
}

pub(crate) fn target_group_from_str(s: &str) -> ClResult<TargetGroup> {
	match s {
		"all" => Ok(TargetGroup::All),
		"with-balance" => Ok(TargetGroup::WithBalance),
		"overdue" => Ok(TargetGroup::Overdue),
		"decline" => Ok(TargetGroup::Decline),
		"recent-upload" => Ok(TargetGroup::RecentUpload),
		"folder" => Ok(TargetGroup::Folder),
		_ => Err(Error::DbError),
	}
}

pub(crate) fn cardinality_to_str(c: PhoneCardinality) -> &'static str {
	match c {
		PhoneCardinality::One => "1",
		PhoneCardinality::Two => "2",
		PhoneCardinality::Three => "3",
		PhoneCardinality::All => "all",
	}
}

pub(crate) fn cardinality_from_str(s: &str) -> ClResult<PhoneCardinality> {
	match s {
		"1" => Ok(PhoneCardinality::One),
		"2" => Ok(PhoneCardinality::Two),
		"3" => Ok(PhoneCardinality::Three),
		"all" => Ok(PhoneCardinality::All),
		_ => Err(Error::DbError),
	}
}

// vim: ts=4
