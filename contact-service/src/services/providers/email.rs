use super::{EmailCheck, EmailVerifier, ProviderError};
use crate::config::MailboxLayerConfig;
use crate::services::record_provider_call;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use service_core::observability::TracedClientExt;
use std::sync::atomic::{AtomicU64, Ordering};

const PROVIDER: &str = "mailboxlayer";

/// Email verification through MailboxLayer's `check` endpoint with both the
/// format and SMTP checks requested.
pub struct MailboxLayerVerifier {
    config: MailboxLayerConfig,
    client: Client,
}

/// MailboxLayer replies 200 for both verdicts and API errors; errors carry
/// `success: false` and an `error` object instead of the check fields.
#[derive(Debug, Deserialize)]
struct MailboxLayerResponse {
    #[serde(default)]
    format_valid: Option<bool>,
    #[serde(default)]
    smtp_check: Option<bool>,
    #[serde(default)]
    error: Option<MailboxLayerError>,
}

#[derive(Debug, Deserialize)]
struct MailboxLayerError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    info: Option<String>,
}

impl MailboxLayerResponse {
    fn into_check(self) -> Result<EmailCheck, ProviderError> {
        if let Some(error) = self.error {
            let message = error
                .info
                .or(error.kind)
                .unwrap_or_else(|| "unknown MailboxLayer error".to_string());
            return Err(ProviderError::Rejected {
                code: error.code,
                message,
            });
        }

        Ok(EmailCheck {
            format_valid: self.format_valid.unwrap_or(false),
            smtp_check: self.smtp_check.unwrap_or(false),
        })
    }
}

impl MailboxLayerVerifier {
    pub fn new(config: MailboxLayerConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn check_url(&self) -> String {
        format!("{}/check", self.config.api_base_url.trim_end_matches('/'))
    }

    async fn request_check(&self, email: &str) -> Result<EmailCheck, ProviderError> {
        if !self.config.enabled {
            return Err(ProviderError::NotEnabled(
                "MailboxLayer verifier is not enabled".to_string(),
            ));
        }

        let response = self
            .client
            .traced_get(&self.check_url())
            .query(&[
                ("access_key", self.config.access_key.expose_secret().as_str()),
                ("email", email),
                ("smtp", "1"),
                ("format", "1"),
            ])
            .send()
            .await
            .map_err(|e| {
                ProviderError::Connection(format!("Failed to connect to MailboxLayer: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected {
                code: Some(i64::from(status.as_u16())),
                message: format!("MailboxLayer returned status {}: {}", status, body),
            });
        }

        let parsed: MailboxLayerResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse MailboxLayer response: {}", e))
        })?;

        parsed.into_check()
    }
}

#[async_trait]
impl EmailVerifier for MailboxLayerVerifier {
    async fn check(&self, email: &str) -> Result<EmailCheck, ProviderError> {
        let result = self.request_check(email).await;
        record_provider_call(PROVIDER, if result.is_ok() { "success" } else { "error" });
        result
    }
}

enum MockVerdict {
    Check(EmailCheck),
    Unreachable,
}

/// Mock verifier for testing.
pub struct MockEmailVerifier {
    verdict: MockVerdict,
    call_count: AtomicU64,
}

impl MockEmailVerifier {
    pub fn with_check(check: EmailCheck) -> Self {
        Self {
            verdict: MockVerdict::Check(check),
            call_count: AtomicU64::new(0),
        }
    }

    pub fn accepting() -> Self {
        Self::with_check(EmailCheck {
            format_valid: true,
            smtp_check: true,
        })
    }

    pub fn rejecting() -> Self {
        Self::with_check(EmailCheck::default())
    }

    /// Every call fails as if the provider could not be reached.
    pub fn unreachable() -> Self {
        Self {
            verdict: MockVerdict::Unreachable,
            call_count: AtomicU64::new(0),
        }
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmailVerifier for MockEmailVerifier {
    async fn check(&self, _email: &str) -> Result<EmailCheck, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        match &self.verdict {
            MockVerdict::Check(check) => {
                tracing::info!("[MOCK] Email verification skipped");
                Ok(*check)
            }
            MockVerdict::Unreachable => Err(ProviderError::Connection(
                "mock verifier is unreachable".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: serde_json::Value) -> Result<EmailCheck, ProviderError> {
        serde_json::from_value::<MailboxLayerResponse>(value)
            .unwrap()
            .into_check()
    }

    #[test]
    fn test_decodes_verdict() {
        let check = decode(json!({
            "email": "asha@example.com",
            "format_valid": true,
            "mx_found": true,
            "smtp_check": true,
            "score": 0.8
        }))
        .unwrap();
        assert!(check.is_deliverable());
    }

    #[test]
    fn test_missing_or_null_flags_are_false() {
        let check = decode(json!({ "format_valid": true, "smtp_check": null })).unwrap();
        assert_eq!(
            check,
            EmailCheck {
                format_valid: true,
                smtp_check: false
            }
        );
    }

    #[test]
    fn test_api_error_payload_is_an_error() {
        let result = decode(json!({
            "success": false,
            "error": {
                "code": 101,
                "type": "invalid_access_key",
                "info": "You have not supplied a valid API Access Key."
            }
        }));

        match result {
            Err(ProviderError::Rejected { code, message }) => {
                assert_eq!(code, Some(101));
                assert_eq!(message, "You have not supplied a valid API Access Key.");
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_check_url_tolerates_trailing_slash() {
        let verifier = MailboxLayerVerifier::new(MailboxLayerConfig {
            access_key: secrecy::Secret::new("key".to_string()),
            api_base_url: "http://apilayer.net/api/".to_string(),
            enabled: true,
        });
        assert_eq!(verifier.check_url(), "http://apilayer.net/api/check");
    }

    #[tokio::test]
    async fn test_disabled_verifier_fails_closed() {
        let verifier = MailboxLayerVerifier::new(MailboxLayerConfig {
            access_key: secrecy::Secret::new(String::new()),
            api_base_url: "http://127.0.0.1:9".to_string(),
            enabled: false,
        });
        assert!(!verifier.is_valid("asha@example.com").await);
    }
}
