pub mod email;
pub mod whatsapp;

use async_trait::async_trait;
use thiserror::Error;

pub use email::{MailboxLayerVerifier, MockEmailVerifier};
pub use whatsapp::{MockNotificationSender, TwilioProvider};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider not enabled: {0}")]
    NotEnabled(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// The provider answered with an error payload. Displays the provider's
    /// own message so it can be surfaced verbatim.
    #[error("{message}")]
    Rejected { code: Option<i64>, message: String },
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub provider_id: String,
}

impl ProviderResponse {
    pub fn success(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
        }
    }
}

/// Raw verdict from an email verification provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmailCheck {
    pub format_valid: bool,
    pub smtp_check: bool,
}

impl EmailCheck {
    /// Valid only when both the syntax and the SMTP deliverability checks pass.
    pub fn is_deliverable(&self) -> bool {
        self.format_valid && self.smtp_check
    }
}

#[async_trait]
pub trait EmailVerifier: Send + Sync {
    /// One outbound verification call.
    async fn check(&self, email: &str) -> Result<EmailCheck, ProviderError>;

    /// Fail-closed verdict: an address that cannot be verified is invalid.
    async fn is_valid(&self, email: &str) -> bool {
        match self.check(email).await {
            Ok(check) => {
                if !check.is_deliverable() {
                    tracing::info!(
                        format_valid = check.format_valid,
                        smtp_check = check.smtp_check,
                        "Email address failed verification"
                    );
                }
                check.is_deliverable()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Email verification unavailable, treating address as invalid");
                false
            }
        }
    }
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Deliver `body` from the configured sender to the configured recipient.
    async fn send(&self, body: &str) -> Result<ProviderResponse, ProviderError>;
}
