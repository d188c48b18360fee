//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum Router with the single proxy handler
//! - Wire up middleware (tracing, panic containment)
//! - Classify every request and either answer it or forward it
//! - Attach the outcome record to every exit path
//! - Serve on a listener until shutdown is signalled

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::forward::{build_forwarder, BackendTarget, Forwarder};
use crate::http::response::{blocked_response, forward_error_response, panic_response, track_body};
use crate::lifecycle::startup::StartupError;
use crate::observability::OutcomeGuard;
use crate::policy::{AllowRules, PolicyEvaluator};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub evaluator: PolicyEvaluator,
    pub forwarder: Arc<dyn Forwarder>,
}

/// HTTP server for the filtering proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a server for `config`, building the backend target, the
    /// allowlist and the configured forwarding strategy.
    pub fn new(config: ProxyConfig) -> Result<Self, StartupError> {
        let target = Arc::new(BackendTarget::parse(&config.backend.url)?);
        let forwarder = build_forwarder(config.backend.strategy, target, &config.timeouts)?;
        Ok(Self::with_forwarder(config, forwarder))
    }

    /// Create a server that relays allowed requests through `forwarder`.
    pub fn with_forwarder(config: ProxyConfig, forwarder: Arc<dyn Forwarder>) -> Self {
        let evaluator = PolicyEvaluator::new(Arc::new(AllowRules::from_config(&config.policy)));
        tracing::debug!(
            entries = evaluator.rules().len(),
            strategy = %forwarder.strategy(),
            "Allowlist compiled"
        );
        let state = AppState { evaluator, forwarder };
        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Every method and path reaches `proxy_handler`; the policy decides.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Classifies the request, then answers it locally or relays it.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let mut outcome = OutcomeGuard::begin(&request);

    let classification =
        state
            .evaluator
            .classify(request.method(), request.uri().path(), request.headers());
    outcome.classified(classification);

    tracing::debug!(
        request_id = %outcome.record().request_id,
        method = %request.method(),
        path = %request.uri().path(),
        classification = %classification,
        "Request classified"
    );

    if !classification.is_allowed() {
        return blocked_response(classification);
    }

    let method = request.method().clone();
    match state.forwarder.forward(request).await {
        Ok(response) => {
            outcome.forwarded(response.status());
            track_body(response, &method, outcome)
        }
        Err(e) => {
            tracing::debug!(
                request_id = %outcome.record().request_id,
                kind = e.kind(),
                strategy = %state.forwarder.strategy(),
                "Forwarding failed"
            );
            outcome.failed(StatusCode::BAD_GATEWAY, &e.describe());
            forward_error_response()
        }
    }
}
