//! HTTP handlers for contact-service.

pub mod contact;
pub mod health;

pub use contact::{relay_submission, submit_contact};
pub use health::{health_check, metrics_endpoint};
