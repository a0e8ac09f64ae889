//! Database schema initialization
//!
//! Creates tables and indexes on startup; every statement is idempotent.

use sqlx::SqlitePool;

pub(crate) async fn init_db(db: &SqlitePool) -> Result<(), sqlx::Error> {
	let mut tx = db.begin().await?;

	// Tenants
	//*********
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS tenants (
		tn_id integer PRIMARY KEY AUTOINCREMENT,
		name text NOT NULL,
		from_email text,
		phone text,
		portal_slug text,
		x json,
		created_at datetime DEFAULT (unixepoch())
	)",
	)
	.execute(&mut *tx)
	.await?;

	// Templates
	//***********
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS templates (
		template_id integer PRIMARY KEY AUTOINCREMENT,
		tn_id integer NOT NULL,
		name text NOT NULL,
		channel text NOT NULL,
		subject text,
		body text NOT NULL,
		created_at datetime DEFAULT (unixepoch())
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_templates_tnid ON templates(tn_id)")
		.execute(&mut *tx)
		.await?;

	// Consumers
	//***********
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS consumers (
		consumer_id integer PRIMARY KEY AUTOINCREMENT,
		tn_id integer NOT NULL,
		first_name text NOT NULL,
		last_name text NOT NULL,
		email text,
		phones json,
		import_batch_id integer,
		x json,
		created_at datetime DEFAULT (unixepoch())
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_consumers_tnid ON consumers(tn_id)")
		.execute(&mut *tx)
		.await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS accounts (
		account_id integer PRIMARY KEY AUTOINCREMENT,
		tn_id integer NOT NULL,
		consumer_id integer NOT NULL,
		account_number text,
		creditor text,
		balance_cents integer,
		due_date text,
		status text,
		x json
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_accounts_consumer ON accounts(tn_id, consumer_id)",
	)
	.execute(&mut *tx)
	.await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS folders (
		folder_id integer PRIMARY KEY AUTOINCREMENT,
		tn_id integer NOT NULL,
		name text NOT NULL
	)",
	)
	.execute(&mut *tx)
	.await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS folder_members (
		tn_id integer NOT NULL,
		folder_id integer NOT NULL,
		consumer_id integer NOT NULL,
		PRIMARY KEY(folder_id, consumer_id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS import_batches (
		batch_id integer PRIMARY KEY AUTOINCREMENT,
		tn_id integer NOT NULL,
		created_at datetime DEFAULT (unixepoch())
	)",
	)
	.execute(&mut *tx)
	.await?;

	// Opt-outs
	//**********
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS opt_outs (
		tn_id integer NOT NULL,
		consumer_id integer NOT NULL,
		channel text NOT NULL,
		created_at datetime DEFAULT (unixepoch()),
		PRIMARY KEY(tn_id, consumer_id, channel)
	)",
	)
	.execute(&mut *tx)
	.await?;

	// Campaigns
	//***********
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS campaigns (
		campaign_id integer PRIMARY KEY AUTOINCREMENT,
		tn_id integer NOT NULL,
		template_id integer NOT NULL,
		name text NOT NULL,
		channel text NOT NULL,
		target_group text NOT NULL,
		folder_ids json,
		phones_to_send text NOT NULL DEFAULT '1',
		status text NOT NULL DEFAULT 'pending_approval',
		total_recipients integer NOT NULL DEFAULT 0,
		total_sent integer NOT NULL DEFAULT 0,
		total_delivered integer NOT NULL DEFAULT 0,
		total_opened integer NOT NULL DEFAULT 0,
		total_clicked integer NOT NULL DEFAULT 0,
		total_errors integer NOT NULL DEFAULT 0,
		total_opt_outs integer NOT NULL DEFAULT 0,
		created_at datetime DEFAULT (unixepoch()),
		completed_at datetime
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_campaigns_tnid ON campaigns(tn_id)")
		.execute(&mut *tx)
		.await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS campaign_recipients (
		tn_id integer NOT NULL,
		campaign_id integer NOT NULL,
		seq integer NOT NULL,
		consumer_id integer NOT NULL,
		account_id integer,
		addresses json NOT NULL,
		PRIMARY KEY(campaign_id, seq)
	)",
	)
	.execute(&mut *tx)
	.await?;

	// Delivery records
	//******************
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS deliveries (
		delivery_id integer PRIMARY KEY AUTOINCREMENT,
		tn_id integer NOT NULL,
		campaign_id integer NOT NULL,
		consumer_id integer NOT NULL,
		channel text NOT NULL,
		address text NOT NULL,
		message_id text NOT NULL,
		outcome text NOT NULL,
		created_at integer NOT NULL
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_deliveries_campaign ON deliveries(tn_id, campaign_id)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_deliveries_message ON deliveries(campaign_id, message_id)",
	)
	.execute(&mut *tx)
	.await?;

	// Settings
	//**********
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS settings (
		tn_id integer NOT NULL,
		name text NOT NULL,
		value text,
		PRIMARY KEY(tn_id, name)
	)",
	)
	.execute(&mut *tx)
	.await?;

	tx.commit().await?;
	Ok(())
}

// vim: ts=4
