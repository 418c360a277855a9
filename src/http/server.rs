//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the shared subsystems (client, hub, discovery, proxy, presets)
//! - Create the Axum Router with all handlers
//! - Wire up middleware (CORS, request ID, body read timeout, tracing)
//! - Serve with graceful shutdown, ending SSE streams and discovery first

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Request,
    middleware,
    routing::{get, post},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::RequestBodyTimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::SessionStore;
use crate::config::ServerConfig;
use crate::discovery::DiscoveryEngine;
use crate::events::EventHub;
use crate::http::handlers;
use crate::http::middleware::cors_middleware;
use crate::http::response::method_not_allowed;
use crate::net::{build_client, ClientError};
use crate::presets::{PresetError, PresetStore};
use crate::proxy::RequestProxy;

/// Errors raised while assembling the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Presets(#[from] PresetError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub proxy: RequestProxy,
    pub hub: Arc<EventHub>,
    pub discovery: Arc<DiscoveryEngine>,
    pub presets: Arc<PresetStore>,
    pub sessions: SessionStore,
}

/// Span for one inbound request, tagged with the id set by the outer layer.
fn request_span(request: &Request) -> tracing::Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id
    )
}

/// HTTP server for the workbench backend.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server, loading presets from the configured path.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let presets = PresetStore::load(&config.presets.path)?;
        Self::with_presets(config, presets)
    }

    /// Create a new HTTP server around an already opened preset store.
    pub fn with_presets(config: ServerConfig, presets: PresetStore) -> Result<Self, ServerError> {
        let client = build_client(&config.client)?;
        let hub = Arc::new(EventHub::new(config.events.subscriber_capacity));
        let discovery = Arc::new(DiscoveryEngine::new(
            Arc::clone(&hub),
            client.clone(),
            config.discovery.clone(),
        ));
        let proxy = RequestProxy::new(client, config.proxy.clone());

        let state = AppState {
            config: Arc::new(config),
            proxy,
            hub,
            discovery,
            presets: Arc::new(presets),
            sessions: SessionStore::new(),
        };

        let router = Self::build_router(state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let read_timeout = Duration::from_secs(state.config.listener.read_timeout_secs);
        let static_root = ServeDir::new(&state.config.static_files.root);

        Router::new()
            .route("/api/send", post(handlers::send).fallback(method_not_allowed))
            .route("/api/discover/events", get(handlers::discover_events).fallback(method_not_allowed))
            .route("/api/discover/start", post(handlers::discover_start).fallback(method_not_allowed))
            .route("/api/discover/stop", post(handlers::discover_stop).fallback(method_not_allowed))
            .route(
                "/api/presets",
                get(handlers::list_presets)
                    .post(handlers::save_preset)
                    .fallback(method_not_allowed),
            )
            .route("/api/auth/login", post(handlers::login).fallback(method_not_allowed))
            .route("/api/auth/me", get(handlers::me).fallback(method_not_allowed))
            .fallback_service(static_root)
            .with_state(state)
            .layer(middleware::from_fn(cors_middleware))
            .layer(RequestBodyTimeoutLayer::new(read_timeout))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Shared application state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let discovery = Arc::clone(&self.state.discovery);
        let hub = Arc::clone(&self.state.hub);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
                discovery.stop();
                // Open SSE responses never end on their own.
                hub.close();
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
