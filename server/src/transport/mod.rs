//! Outbound transport implementations
//!
//! Both transports read their provider configuration through the per-tenant
//! settings service, so tenants can carry distinct credentials on one
//! instance.

pub mod sms;
pub mod smtp;

pub use sms::SmsHttpTransport;
pub use smtp::SmtpEmailTransport;

// vim: ts=4
