//! Outreach is a multi-tenant platform for agencies to message their
//! consumers by email and SMS, track delivery outcomes, and enforce usage
//! quotas.
//!
//! # Features
//!
//! - Communication campaign engine
//!		- declarative targeting rules resolved to a recipient snapshot
//!		- template variable substitution shared between email and SMS
//!		- approval/send/cancel lifecycle with batched, rate-limited dispatch
//!		- pollable progress with per-message delivery records
//!	- Multi-tenant (per-agency data, settings, and transports)
//!	- Pluggable persistence (`MetaAdapter`) and transports (`TransportAdapter`)
//!	- Usage counters feeding the billing collaborator

#![forbid(unsafe_code)]

pub mod error;
pub mod core;
pub mod campaign;
pub mod settings;
pub mod template;
pub mod transport;
pub mod meta_adapter;
pub mod transport_adapter;
pub mod prelude;
pub mod types;
pub mod routes;

pub use crate::core::app::{App, AppBuilder, AppState};

// vim: ts=4
