//! App state type and builder

use std::sync::Arc;

use crate::campaign::dispatch::DispatchRegistry;
use crate::meta_adapter::{Channel, MetaAdapter};
use crate::prelude::*;
use crate::routes;
use crate::settings::SettingsService;
use crate::transport_adapter::TransportAdapter;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct AppState {
	pub meta_adapter: Arc<dyn MetaAdapter>,
	pub email_transport: Arc<dyn TransportAdapter>,
	pub sms_transport: Arc<dyn TransportAdapter>,
	pub settings: Arc<SettingsService>,
	pub dispatch: DispatchRegistry,
	pub opts: AppBuilderOpts,
}

pub type App = Arc<AppState>;

impl AppState {
	pub fn transport(&self, channel: Channel) -> Arc<dyn TransportAdapter> {
		match channel {
			Channel::Email => self.email_transport.clone(),
			Channel::Sms => self.sms_transport.clone(),
		}
	}
}

#[derive(Debug)]
pub struct AppBuilderOpts {
	listen: Box<str>,
}

pub struct AppBuilder {
	opts: AppBuilderOpts,
	meta_adapter: Option<Arc<dyn MetaAdapter>>,
	email_transport: Option<Arc<dyn TransportAdapter>>,
	sms_transport: Option<Arc<dyn TransportAdapter>>,
	settings: Option<Arc<SettingsService>>,
}

impl AppBuilder {
	pub fn new() -> Self {
		AppBuilder {
			opts: AppBuilderOpts { listen: "127.0.0.1:8080".into() },
			meta_adapter: None,
			email_transport: None,
			sms_transport: None,
			settings: None,
		}
	}

	// Opts
	pub fn listen(&mut self, listen: impl Into<Box<str>>) -> &mut Self {
		self.opts.listen = listen.into();
		self
	}

	// Adapters
	pub fn meta_adapter(&mut self, meta_adapter: Arc<dyn MetaAdapter>) -> &mut Self {
		self.meta_adapter = Some(meta_adapter);
		self
	}
	pub fn email_transport(&mut self, transport: Arc<dyn TransportAdapter>) -> &mut Self {
		self.email_transport = Some(transport);
		self
	}
	pub fn sms_transport(&mut self, transport: Arc<dyn TransportAdapter>) -> &mut Self {
		self.sms_transport = Some(transport);
		self
	}
	/// Share one settings service between the app and transports that were
	/// built around it; a fresh one is created otherwise.
	pub fn settings(&mut self, settings: Arc<SettingsService>) -> &mut Self {
		self.settings = Some(settings);
		self
	}

	/// Assemble the application state without starting the server
	pub fn build(self) -> ClResult<App> {
		let meta_adapter = self
			.meta_adapter
			.ok_or_else(|| Error::ConfigError("No meta adapter configured".into()))?;
		let email_transport = self
			.email_transport
			.ok_or_else(|| Error::ConfigError("No email transport configured".into()))?;
		let sms_transport = self
			.sms_transport
			.ok_or_else(|| Error::ConfigError("No SMS transport configured".into()))?;
		let settings = self
			.settings
			.unwrap_or_else(|| Arc::new(SettingsService::new(meta_adapter.clone())));

		Ok(Arc::new(AppState {
			meta_adapter,
			email_transport,
			sms_transport,
			settings,
			dispatch: DispatchRegistry::new(),
			opts: self.opts,
		}))
	}

	pub async fn run(self) -> ClResult<()> {
		tracing_subscriber::fmt()
			.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
			.with_target(false)
			.init();
		info!("Outreach v{}", VERSION);

		let app = self.build()?;
		let router = routes::init(app.clone());

		let listener = tokio::net::TcpListener::bind(app.opts.listen.as_ref()).await?;
		info!("Listening on {}", app.opts.listen);
		axum::serve(listener, router).await?;

		Ok(())
	}
}

impl Default for AppBuilder {
	fn default() -> Self {
		Self::new()
	}
}

// vim: ts=4
