//! Minimal runnable server: SQLite persistence plus the real SMTP and SMS
//! transports, configured through environment variables.

use std::{env, path::PathBuf, sync::Arc};

use outreach::AppBuilder;
use outreach::settings::SettingsService;
use outreach::transport::{SmsHttpTransport, SmtpEmailTransport};
use outreach_meta_adapter_sqlite::MetaAdapterSqlite;

#[tokio::main]
async fn main() {
	let db_dir = PathBuf::from(env::var("DB_DIR").unwrap_or_else(|_| "./data".to_string()));
	let listen = env::var("LISTEN").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

	if let Err(err) = std::fs::create_dir_all(&db_dir) {
		eprintln!("FATAL: Cannot create data dir {}: {}", db_dir.display(), err);
		std::process::exit(1);
	}

	let meta_adapter = match MetaAdapterSqlite::new(db_dir.join("outreach.db")).await {
		Ok(adapter) => Arc::new(adapter),
		Err(err) => {
			eprintln!("FATAL: Cannot open database: {}", err);
			std::process::exit(1);
		}
	};

	// Transports read per-tenant credentials through the settings service
	let settings = Arc::new(SettingsService::new(meta_adapter.clone()));

	let mut builder = AppBuilder::new();
	builder
		.listen(listen)
		.meta_adapter(meta_adapter)
		.email_transport(Arc::new(SmtpEmailTransport::new(settings.clone())))
		.sms_transport(Arc::new(SmsHttpTransport::new(settings.clone())))
		.settings(settings);

	if let Err(err) = builder.run().await {
		eprintln!("FATAL: {}", err);
		std::process::exit(1);
	}
}

// vim: ts=4
