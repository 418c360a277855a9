//! At-most-one background discovery task.
//!
//! # State Machine
//! ```text
//! idle ──start──▶ running ──finish | cancelled | panic──▶ idle
//! ```
//!
//! # Design Decisions
//! - The task is detached from the HTTP request that started it; its only
//!   handle is the `CancellationToken` stored in the engine
//! - `running` is represented by the token being present, so the two can
//!   never disagree
//! - The token is cleared by a drop guard inside the task, which also covers
//!   panics, and only then is `discover_finished` broadcast
//! - Cancellation is checked between probes; an in-flight probe is raced
//!   against the token and fails as a regular warning

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::DiscoveryConfig;
use crate::discovery::host::{extract_host, known_domain, probe_urls, KnownDomain};
use crate::events::{DiscoveryEvent, EventHub, EventKind};
use crate::net::{error_chain, read_capped};
use crate::observability::metrics;

/// Errors returned synchronously by [`DiscoveryEngine::start`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    /// The target was empty or whitespace.
    #[error("bad request")]
    EmptyTarget,

    /// Another discovery task is still running.
    #[error("already running")]
    AlreadyRunning,
}

/// How a discovery run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Suggestion,
    Finding,
    Exhausted,
    Cancelled,
    /// The task unwound or was dropped before returning.
    Aborted,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Suggestion => "suggestion",
            RunOutcome::Finding => "finding",
            RunOutcome::Exhausted => "exhausted",
            RunOutcome::Cancelled => "cancelled",
            RunOutcome::Aborted => "aborted",
        }
    }
}

#[derive(Default)]
struct EngineState {
    /// Present exactly while a task is running.
    cancel: Option<CancellationToken>,
}

/// Result of one successful probe.
struct ProbeResult {
    status: u16,
    content_type: String,
    body: Vec<u8>,
}

impl ProbeResult {
    fn looks_like_openapi(&self) -> bool {
        self.content_type.to_ascii_lowercase().contains("json")
            && self.body.windows(b"\"openapi\"".len()).any(|w| w == b"\"openapi\"")
    }
}

/// Runs discovery probes and reports progress through the event hub.
pub struct DiscoveryEngine {
    hub: Arc<EventHub>,
    client: Client,
    config: DiscoveryConfig,
    state: Mutex<EngineState>,
}

impl DiscoveryEngine {
    pub fn new(hub: Arc<EventHub>, client: Client, config: DiscoveryConfig) -> Self {
        Self {
            hub,
            client,
            config,
            state: Mutex::new(EngineState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a discovery task is currently running.
    pub fn is_running(&self) -> bool {
        self.lock().cancel.is_some()
    }

    /// Start discovery against `target` in the background.
    ///
    /// Returns as soon as the task is spawned; progress is only observable
    /// through the event hub.
    pub fn start(self: &Arc<Self>, target: &str) -> Result<(), DiscoveryError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(DiscoveryError::EmptyTarget);
        }

        let token = {
            let mut state = self.lock();
            if state.cancel.is_some() {
                tracing::debug!(target, "Discovery already running");
                return Err(DiscoveryError::AlreadyRunning);
            }
            let token = CancellationToken::new();
            state.cancel = Some(token.clone());
            token
        };

        let host = extract_host(target);
        tracing::info!(target, host = %host, "Discovery started");

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut guard = RunGuard {
                engine: Arc::clone(&engine),
                outcome: RunOutcome::Aborted,
            };
            guard.outcome = engine.run(&host, &token).await;
        });

        Ok(())
    }

    /// Signal the running task, if any, to stop.
    ///
    /// Returns whether a task was signalled. The task may still be finishing
    /// its current probe when this returns.
    pub fn stop(&self) -> bool {
        let state = self.lock();
        match &state.cancel {
            Some(token) => {
                token.cancel();
                tracing::info!("Discovery stop requested");
                true
            }
            None => false,
        }
    }

    fn emit(&self, event: DiscoveryEvent) {
        self.hub.broadcast(&event);
    }

    async fn run(&self, host: &str, token: &CancellationToken) -> RunOutcome {
        self.emit(DiscoveryEvent::info(format!("Discovering: {host}")));

        if let Some(known) = known_domain(host) {
            self.emit(suggestion(known));
            return RunOutcome::Suggestion;
        }

        for url in probe_urls(&self.config.probe_scheme, host) {
            if token.is_cancelled() {
                self.emit(DiscoveryEvent::warning("discover_cancelled"));
                return RunOutcome::Cancelled;
            }

            self.emit(DiscoveryEvent::new(EventKind::Probe, format!("GET {url}")));

            let result = match self.probe(&url, token).await {
                Ok(result) => result,
                Err(message) => {
                    tracing::debug!(url = %url, error = %message, "Probe failed");
                    self.emit(DiscoveryEvent::warning(format!("fail: {message}")));
                    continue;
                }
            };

            tracing::debug!(url = %url, status = result.status, content_type = %result.content_type, "Probe answered");
            self.emit(DiscoveryEvent::new(
                EventKind::ProbeResult,
                format!("{} {}", result.status, result.content_type),
            ));

            if result.looks_like_openapi() {
                self.emit(
                    DiscoveryEvent::new(EventKind::Finding, "Looks like OpenAPI").with_meta("openapi_url", url),
                );
                return RunOutcome::Finding;
            }
        }

        RunOutcome::Exhausted
    }

    async fn probe(&self, url: &str, token: &CancellationToken) -> Result<ProbeResult, String> {
        let deadline = (self.config.probe_timeout_secs > 0)
            .then(|| Instant::now() + Duration::from_secs(self.config.probe_timeout_secs));

        let send = self
            .client
            .get(url)
            .header(USER_AGENT, self.config.user_agent.as_str())
            .send();

        let sent = async {
            match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, send).await {
                    Ok(result) => result.map_err(|e| error_chain(&e)),
                    Err(_) => Err("probe timed out".to_string()),
                },
                None => send.await.map_err(|e| error_chain(&e)),
            }
        };

        let response = tokio::select! {
            _ = token.cancelled() => return Err("request cancelled".to_string()),
            result = sent => result?,
        };

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = read_capped(response, self.config.max_body_bytes, deadline).await;

        Ok(ProbeResult {
            status,
            content_type,
            body,
        })
    }

    fn finish(&self, outcome: RunOutcome) {
        self.lock().cancel = None;
        metrics::record_discovery_run(outcome.as_str());
        tracing::info!(outcome = outcome.as_str(), "Discovery finished");
        self.emit(DiscoveryEvent::info("discover_finished"));
    }
}

/// Resets the engine and announces completion however the task ends.
struct RunGuard {
    engine: Arc<DiscoveryEngine>,
    outcome: RunOutcome,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.engine.finish(self.outcome);
    }
}

fn suggestion(known: &KnownDomain) -> DiscoveryEvent {
    DiscoveryEvent::new(EventKind::Suggestion, format!("Known domain: {}", known.host))
        .with_meta("docs_url", known.docs_url)
        .with_meta("api_base", known.api_base)
        .with_meta("auth", known.auth)
        .with_meta("openapi_source", known.openapi_source)
}
