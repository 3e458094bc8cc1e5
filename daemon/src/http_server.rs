use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use line_messaging::signature::SIGNATURE_HEADER;
use line_messaging::webhook::parse_request;
use line_messaging::WebhookError;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::dispatcher::Dispatcher;

/// Application state shared with all routes
#[derive(Clone)]
pub struct AppState {
    channel_secret: Arc<str>,
    dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(channel_secret: &str, dispatcher: Dispatcher) -> Self {
        Self {
            channel_secret: Arc::from(channel_secret),
            dispatcher: Arc::new(dispatcher),
        }
    }
}

/// Ways a webhook request is refused before any event runs
#[derive(Debug)]
pub enum ApiError {
    InvalidSignature,
    MalformedBody(String),
}

impl From<WebhookError> for ApiError {
    fn from(e: WebhookError) -> Self {
        match e {
            WebhookError::InvalidSignature => ApiError::InvalidSignature,
            WebhookError::Parse(e) => ApiError::MalformedBody(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidSignature => {
                warn!("Rejected webhook with invalid signature");
                StatusCode::BAD_REQUEST.into_response()
            }
            Self::MalformedBody(e) => {
                error!(error = %e, "Failed to parse webhook body");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Build the router: `POST /` receives webhooks, `GET /` answers liveness probes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health).post(handle_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server and run until Ctrl-C
pub async fn run_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    info!("Starting HTTP server on {}", addr);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run HTTP server: {}", e))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Health check handler
async fn health() -> impl IntoResponse {
    "linebot is running"
}

/// Verifies, decodes and dispatches one webhook request.
///
/// Once the body is accepted the answer is 200 whatever happens to the
/// individual events.
async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("webhook", %request_id);

    async move {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok());
        let request = match parse_request(&state.channel_secret, signature, &body) {
            Ok(request) => request,
            Err(e) => return Err(ApiError::from(e)),
        };

        let report = state.dispatcher.dispatch(&request.events).await;
        info!(
            events = request.events.len(),
            succeeded = report.succeeded,
            failed = report.failed,
            "Processed webhook"
        );
        Ok(StatusCode::OK)
    }
    .instrument(span)
    .await
}
