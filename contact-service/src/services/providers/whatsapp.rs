use super::{NotificationSender, ProviderError, ProviderResponse};
use crate::config::TwilioConfig;
use crate::services::record_provider_call;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service_core::observability::TracedClientExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

const PROVIDER: &str = "twilio";

/// Twilio Programmable Messaging client. With `whatsapp:`-prefixed numbers
/// the message goes out over WhatsApp.
pub struct TwilioProvider {
    config: TwilioConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct TwilioMessageRequest<'a> {
    #[serde(rename = "To")]
    to: &'a str,
    #[serde(rename = "From")]
    from: &'a str,
    #[serde(rename = "Body")]
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct TwilioMessageResponse {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorResponse {
    #[serde(default)]
    code: Option<i64>,
    message: String,
}

impl TwilioProvider {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.account_sid
        )
    }

    fn ensure_configured(&self) -> Result<(), ProviderError> {
        let missing = [
            ("account_sid", self.config.account_sid.is_empty()),
            ("auth_token", self.config.auth_token.expose_secret().is_empty()),
            ("from_number", self.config.from_number.is_empty()),
            ("to_number", self.config.to_number.is_empty()),
        ]
        .into_iter()
        .filter_map(|(name, empty)| empty.then_some(name))
        .collect::<Vec<_>>();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ProviderError::Configuration(format!(
                "Twilio {} not configured",
                missing.join(", ")
            )))
        }
    }

    async fn create_message(&self, body: &str) -> Result<ProviderResponse, ProviderError> {
        if !self.config.enabled {
            return Err(ProviderError::NotEnabled(
                "Twilio provider is not enabled".to_string(),
            ));
        }
        self.ensure_configured()?;

        let request = TwilioMessageRequest {
            to: &self.config.to_number,
            from: &self.config.from_number,
            body,
        };

        let response = self
            .client
            .traced_post(&self.messages_url())
            .basic_auth(
                &self.config.account_sid,
                Some(self.config.auth_token.expose_secret()),
            )
            .form(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(format!("Failed to connect to Twilio: {}", e)))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to read Twilio response: {}", e))
        })?;

        if !status.is_success() {
            let error = serde_json::from_str::<TwilioErrorResponse>(&text).unwrap_or_else(|_| {
                TwilioErrorResponse {
                    code: Some(i64::from(status.as_u16())),
                    message: format!("Twilio API returned error status {}: {}", status, text),
                }
            });
            tracing::error!(
                status = %status,
                code = ?error.code,
                message = %error.message,
                "Twilio rejected message"
            );
            return Err(ProviderError::Rejected {
                code: error.code,
                message: error.message,
            });
        }

        let message: TwilioMessageResponse = serde_json::from_str(&text).map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse Twilio response: {}", e))
        })?;

        tracing::info!(sid = %message.sid, "WhatsApp message sent via Twilio");

        Ok(ProviderResponse::success(message.sid))
    }
}

#[async_trait]
impl NotificationSender for TwilioProvider {
    async fn send(&self, body: &str) -> Result<ProviderResponse, ProviderError> {
        let result = self.create_message(body).await;
        record_provider_call(PROVIDER, if result.is_ok() { "success" } else { "error" });
        result
    }
}

/// Mock sender for testing. Keeps every body it was asked to send.
pub struct MockNotificationSender {
    sid: Option<String>,
    failure: Option<String>,
    send_count: AtomicU64,
    sent: Mutex<Vec<String>>,
}

impl Default for MockNotificationSender {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNotificationSender {
    /// Succeeds with generated `mock-whatsapp-N` ids.
    pub fn new() -> Self {
        Self {
            sid: None,
            failure: None,
            send_count: AtomicU64::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Succeeds with a fixed message id.
    pub fn with_sid(sid: impl Into<String>) -> Self {
        Self {
            sid: Some(sid.into()),
            ..Self::new()
        }
    }

    /// Fails every send with a provider rejection carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new()
        }
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }

    pub fn sent_bodies(&self) -> Vec<String> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSender for MockNotificationSender {
    async fn send(&self, body: &str) -> Result<ProviderResponse, ProviderError> {
        let count = self.send_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(body.to_string());
        }

        if let Some(message) = &self.failure {
            return Err(ProviderError::Rejected {
                code: None,
                message: message.clone(),
            });
        }

        tracing::info!(body_length = %body.len(), "[MOCK] WhatsApp message would be sent");

        Ok(ProviderResponse::success(
            self.sid
                .clone()
                .unwrap_or_else(|| format!("mock-whatsapp-{}", count)),
        ))
    }
}
