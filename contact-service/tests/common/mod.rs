use contact_service::config::{ContactConfig, CorsConfig, MailboxLayerConfig, TwilioConfig};
use contact_service::startup::Application;
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ACCOUNT_SID: &str = "AC00000000000000000000000000000000";
pub const FROM_NUMBER: &str = "whatsapp:+14155238886";
pub const TO_NUMBER: &str = "whatsapp:+919800000000";
pub const ACCESS_KEY: &str = "test-access-key";

pub fn messages_path() -> String {
    format!("/2010-04-01/Accounts/{}/Messages.json", ACCOUNT_SID)
}

pub fn asha() -> Value {
    json!({
        "name": "Asha",
        "email": "asha@example.com",
        "service": "Consulting",
        "message": "Please call me"
    })
}

pub struct TestApp {
    pub address: String,
    pub mailboxlayer: MockServer,
    pub twilio: MockServer,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let mailboxlayer = MockServer::start().await;
        let twilio = MockServer::start().await;
        let verifier_url = mailboxlayer.uri();

        Self::spawn_with(mailboxlayer, twilio, verifier_url).await
    }

    /// Point the verifier at an address nothing listens on.
    pub async fn spawn_with_unreachable_verifier() -> Self {
        let mailboxlayer = MockServer::start().await;
        let twilio = MockServer::start().await;

        Self::spawn_with(mailboxlayer, twilio, "http://127.0.0.1:1".to_string()).await
    }

    async fn spawn_with(mailboxlayer: MockServer, twilio: MockServer, verifier_url: String) -> Self {
        // Use random port for testing (port 0)
        let config = ContactConfig {
            common: CoreConfig { port: 0 },
            twilio: TwilioConfig {
                account_sid: ACCOUNT_SID.to_string(),
                auth_token: Secret::new("test-token".to_string()),
                from_number: FROM_NUMBER.to_string(),
                to_number: TO_NUMBER.to_string(),
                api_base_url: twilio.uri(),
                enabled: true,
            },
            mailboxlayer: MailboxLayerConfig {
                access_key: Secret::new(ACCESS_KEY.to_string()),
                api_base_url: verifier_url,
                enabled: true,
            },
            cors: CorsConfig {
                allowed_origins: Vec::new(),
            },
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            mailboxlayer,
            twilio,
            client,
        }
    }

    pub async fn mock_verdict(&self, format_valid: bool, smtp_check: bool) {
        Mock::given(method("GET"))
            .and(path("/check"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "email": "asha@example.com",
                "format_valid": format_valid,
                "mx_found": true,
                "smtp_check": smtp_check,
                "score": 0.8
            })))
            .mount(&self.mailboxlayer)
            .await;
    }

    pub async fn mock_message_created(&self, sid: &str) {
        Mock::given(method("POST"))
            .and(path(messages_path()))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "sid": sid,
                "status": "queued",
                "to": TO_NUMBER,
                "from": FROM_NUMBER
            })))
            .mount(&self.twilio)
            .await;
    }

    pub async fn mock_message_rejected(&self, status: u16, code: i64, message: &str) {
        Mock::given(method("POST"))
            .and(path(messages_path()))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "code": code,
                "message": message,
                "more_info": format!("https://www.twilio.com/docs/errors/{}", code),
                "status": status
            })))
            .mount(&self.twilio)
            .await;
    }

    pub async fn submit(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}/submit-contact", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn twilio_requests(&self) -> Vec<wiremock::Request> {
        self.twilio.received_requests().await.unwrap_or_default()
    }

    pub async fn mailboxlayer_requests(&self) -> Vec<wiremock::Request> {
        self.mailboxlayer.received_requests().await.unwrap_or_default()
    }
}
