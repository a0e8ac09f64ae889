use axum::{
	Router,
	routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::campaign;
use crate::prelude::*;
use crate::template;

pub fn init(app: App) -> Router {
	Router::new()
		.route(
			"/api/campaign",
			post(campaign::handler::post_campaign).get(campaign::handler::list_campaigns),
		)
		.route(
			"/api/campaign/{id}",
			get(campaign::handler::get_campaign).delete(campaign::handler::delete_campaign),
		)
		.route("/api/campaign/{id}/status", get(campaign::handler::get_campaign_status))
		.route("/api/campaign/{id}/approve", post(campaign::handler::post_approve))
		.route("/api/campaign/{id}/cancel", post(campaign::handler::post_cancel))
		.route("/api/campaign/{id}/event", post(campaign::handler::post_event))
		.route(
			"/api/template",
			post(template::handler::post_template).get(template::handler::list_templates),
		)
		.route(
			"/api/template/{id}",
			get(template::handler::get_template)
				.put(template::handler::put_template)
				.delete(template::handler::delete_template),
		)
		.route("/api/template/{id}/preview", post(template::handler::post_preview))
		.route("/api/usage", get(campaign::handler::get_usage))
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
		.with_state(app)
}

// vim: ts=4
