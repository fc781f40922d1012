use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use service_core::error::AppError;

use crate::error::ContactError;
use crate::models::{format_notification, ContactSubmission, SubmitContactResponse};
use crate::services::{record_submission, EmailVerifier, NotificationSender};
use crate::startup::AppState;

/// `POST /submit-contact`
#[tracing::instrument(skip(state, payload))]
pub async fn submit_contact(
    State(state): State<AppState>,
    payload: Result<Json<ContactSubmission>, JsonRejection>,
) -> Response {
    let submission = match payload {
        Ok(Json(submission)) => submission,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Rejected malformed submission body");
            return AppError::BadRequest(anyhow::anyhow!(rejection.body_text())).into_response();
        }
    };

    match relay_submission(
        state.email_verifier.as_ref(),
        state.notification_sender.as_ref(),
        &submission,
        Utc::now(),
    )
    .await
    {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Validate, verify, then send. The send never starts before verification
/// has resolved, and each early exit skips every later provider call.
pub async fn relay_submission(
    verifier: &dyn EmailVerifier,
    sender: &dyn NotificationSender,
    submission: &ContactSubmission,
    received_at: DateTime<Utc>,
) -> Result<SubmitContactResponse, ContactError> {
    submission.ensure_complete()?;

    if !verifier.is_valid(&submission.email).await {
        tracing::info!(service = %submission.service, "Submission rejected: email not verified");
        return Err(ContactError::EmailRejected);
    }

    let notification = format_notification(submission, received_at);

    let response = sender.send(&notification.body).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to deliver contact notification");
        ContactError::Delivery(e.to_string())
    })?;

    tracing::info!(sid = %response.provider_id, "Contact notification delivered");
    record_submission("delivered");

    Ok(SubmitContactResponse::delivered(response.provider_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{EmailCheck, MockEmailVerifier, MockNotificationSender};
    use chrono::TimeZone;

    fn asha() -> ContactSubmission {
        ContactSubmission {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            service: "Consulting".to_string(),
            message: "Please call me".to_string(),
        }
    }

    fn received_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 15, 37, 2).unwrap()
    }

    #[tokio::test]
    async fn test_delivers_verified_submission() {
        let verifier = MockEmailVerifier::accepting();
        let sender = MockNotificationSender::with_sid("SM123");

        let response = relay_submission(&verifier, &sender, &asha(), received_at())
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.message, "Valid email. WhatsApp message sent!");
        assert_eq!(response.sid, "SM123");
        assert_eq!(
            sender.sent_bodies(),
            vec![format_notification(&asha(), received_at()).body]
        );
    }

    #[tokio::test]
    async fn test_missing_field_makes_no_provider_calls() {
        let verifier = MockEmailVerifier::accepting();
        let sender = MockNotificationSender::new();
        let mut submission = asha();
        submission.service.clear();

        let result = relay_submission(&verifier, &sender, &submission, received_at()).await;

        assert!(matches!(result, Err(ContactError::MissingFields)));
        assert_eq!(verifier.call_count(), 0);
        assert_eq!(sender.send_count(), 0);
    }

    #[tokio::test]
    async fn test_unverified_email_is_not_relayed() {
        for check in [
            EmailCheck {
                format_valid: true,
                smtp_check: false,
            },
            EmailCheck {
                format_valid: false,
                smtp_check: true,
            },
        ] {
            let verifier = MockEmailVerifier::with_check(check);
            let sender = MockNotificationSender::new();

            let result = relay_submission(&verifier, &sender, &asha(), received_at()).await;

            assert!(matches!(result, Err(ContactError::EmailRejected)));
            assert_eq!(sender.send_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_unreachable_verifier_is_a_rejection_not_a_server_error() {
        let verifier = MockEmailVerifier::unreachable();
        let sender = MockNotificationSender::new();

        let result = relay_submission(&verifier, &sender, &asha(), received_at()).await;

        let err = result.unwrap_err();
        assert!(matches!(err, ContactError::EmailRejected));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(sender.send_count(), 0);
    }

    #[tokio::test]
    async fn test_sender_failure_is_a_delivery_error() {
        let verifier = MockEmailVerifier::accepting();
        let sender = MockNotificationSender::failing("Authenticate");

        let result = relay_submission(&verifier, &sender, &asha(), received_at()).await;

        match result {
            Err(ContactError::Delivery(reason)) => assert_eq!(reason, "Authenticate"),
            other => panic!("expected Delivery error, got {:?}", other),
        }
    }
}
