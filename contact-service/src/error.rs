use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use service_core::error::ErrorResponse;
use thiserror::Error;

use crate::services::record_submission;

/// Terminal outcomes of a contact submission. Nothing is retried.
#[derive(Debug, Error)]
pub enum ContactError {
    /// One of the four fields is absent or empty. No provider was called.
    #[error("Missing fields")]
    MissingFields,

    /// The verifier said no, or could not be reached. No message was sent.
    #[error("Invalid or unverifiable email address")]
    EmailRejected,

    /// The messaging provider failed; carries the underlying reason.
    #[error("{0}")]
    Delivery(String),
}

impl ContactError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ContactError::MissingFields | ContactError::EmailRejected => StatusCode::BAD_REQUEST,
            ContactError::Delivery(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn outcome(&self) -> &'static str {
        match self {
            ContactError::MissingFields => "missing_fields",
            ContactError::EmailRejected => "email_rejected",
            ContactError::Delivery(_) => "delivery_failed",
        }
    }
}

impl IntoResponse for ContactError {
    fn into_response(self) -> Response {
        record_submission(self.outcome());
        (self.status_code(), Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}
