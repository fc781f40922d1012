pub mod metrics;
pub mod providers;

pub use self::metrics::{get_metrics, init_metrics, record_provider_call, record_submission};
pub use self::providers::{
    EmailCheck, EmailVerifier, MailboxLayerVerifier, MockEmailVerifier, MockNotificationSender,
    NotificationSender, ProviderError, ProviderResponse, TwilioProvider,
};
