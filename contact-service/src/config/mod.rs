use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

const DEFAULT_TWILIO_API_BASE_URL: &str = "https://api.twilio.com";
const DEFAULT_MAILBOXLAYER_API_BASE_URL: &str = "http://apilayer.net/api";

#[derive(Debug, Clone)]
pub struct ContactConfig {
    pub common: core_config::Config,
    pub twilio: TwilioConfig,
    pub mailboxlayer: MailboxLayerConfig,
    pub cors: CorsConfig,
}

/// Messaging provider credentials plus the sender and recipient identities.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: Secret<String>,
    /// Sender identity, e.g. `whatsapp:+14155238886`.
    pub from_number: String,
    /// Recipient identity for every notification.
    pub to_number: String,
    pub api_base_url: String,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct MailboxLayerConfig {
    pub access_key: Secret<String>,
    pub api_base_url: String,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Empty means any origin is allowed.
    pub allowed_origins: Vec<String>,
}

impl ContactConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(ContactConfig {
            common: common_config,
            twilio: TwilioConfig {
                account_sid: get_env("TWILIO_ACCOUNT_SID", Some(""), is_prod)?,
                auth_token: Secret::new(get_env("TWILIO_AUTH_TOKEN", Some(""), is_prod)?),
                from_number: get_env("TWILIO_WHATSAPP_NUMBER", Some(""), is_prod)?,
                to_number: get_env("TO_WHATSAPP_NUMBER", Some(""), is_prod)?,
                api_base_url: env::var("TWILIO_API_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_TWILIO_API_BASE_URL.to_string()),
                enabled: parse_flag("TWILIO_ENABLED", true),
            },
            mailboxlayer: MailboxLayerConfig {
                access_key: Secret::new(get_env("MAILBOXLAYER_API_KEY", Some(""), is_prod)?),
                api_base_url: env::var("MAILBOXLAYER_API_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_MAILBOXLAYER_API_BASE_URL.to_string()),
                enabled: parse_flag("MAILBOXLAYER_ENABLED", true),
            },
            cors: CorsConfig {
                allowed_origins: parse_origins(&env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default()),
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
