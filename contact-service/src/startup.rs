//! Application startup and lifecycle management.
//!
//! Providers are constructed once here and injected into the handlers through
//! [`AppState`]; nothing reads credentials from globals after startup.

use crate::config::{ContactConfig, CorsConfig};
use crate::handlers::{health_check, metrics_endpoint, submit_contact};
use crate::services::{EmailVerifier, MailboxLayerVerifier, NotificationSender, TwilioProvider};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware, REQUEST_ID_HEADER,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: ContactConfig,
    pub email_verifier: Arc<dyn EmailVerifier>,
    pub notification_sender: Arc<dyn NotificationSender>,
}

impl AppState {
    /// Wire the real providers. A disabled provider stays in place and fails
    /// every call: no email verifies and no notification is reported as sent.
    pub fn from_config(config: ContactConfig) -> Self {
        if config.mailboxlayer.enabled {
            tracing::info!("MailboxLayer email verifier initialized");
        } else {
            tracing::warn!("MailboxLayer disabled, every submission will be rejected");
        }
        let email_verifier: Arc<dyn EmailVerifier> =
            Arc::new(MailboxLayerVerifier::new(config.mailboxlayer.clone()));

        if config.twilio.enabled {
            tracing::info!("Twilio WhatsApp provider initialized");
        } else {
            tracing::warn!("Twilio disabled, verified submissions will fail delivery");
        }
        let notification_sender: Arc<dyn NotificationSender> =
            Arc::new(TwilioProvider::new(config.twilio.clone()));

        Self {
            config,
            email_verifier,
            notification_sender,
        }
    }
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::HeaderName::from_static(REQUEST_ID_HEADER)]);

    if cors.allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", origin, e);
                None
            }
        })
        .collect::<Vec<_>>();

    layer.allow_origin(AllowOrigin::list(origins))
}

/// Build the HTTP router with its middleware stack.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors);

    Router::new()
        .route("/submit-contact", post(submit_contact))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: ContactConfig) -> Result<Self, AppError> {
        let state = AppState::from_config(config);
        Self::build_with_state(state).await
    }

    /// Build around pre-wired providers (test doubles, custom clients).
    pub async fn build_with_state(state: AppState) -> Result<Self, AppError> {
        // port 0 = random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], state.config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Contact service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until Ctrl-C or SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                e
            })
    }
}
