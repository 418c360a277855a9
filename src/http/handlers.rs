//! API endpoint handlers.
//!
//! Bodies are taken as raw bytes and decoded here so that every malformed
//! payload maps to the same plain `400 bad request`, whatever its
//! content type.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{bearer_token, LoginRequest};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::presets::Preset;
use crate::proxy::{ProxyReply, ProxyRequest};

fn decode<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "Rejected malformed JSON body");
        ApiError::bad_request()
    })
}

/// `POST /api/send`
pub async fn send(State(state): State<AppState>, body: Bytes) -> Result<Json<ProxyReply>, ApiError> {
    let request: ProxyRequest = decode(&body)?;
    let reply = state.proxy.forward(request).await?;
    Ok(Json(reply))
}

/// `GET /api/discover/events`
pub async fn discover_events(State(state): State<AppState>) -> Response {
    let subscription = state.hub.subscribe();
    tracing::info!(subscriber = %subscription.id(), "SSE stream opened");

    let stream = subscription.map(|payload| Ok::<_, Infallible>(Event::default().data(&*payload)));
    let headers = [(header::CONNECTION, "keep-alive")];

    match state.config.events.keep_alive_secs {
        0 => (headers, Sse::new(stream)).into_response(),
        secs => (
            headers,
            Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(secs))),
        )
            .into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DiscoverRequest {
    target: String,
}

/// `POST /api/discover/start`
pub async fn discover_start(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let request: DiscoverRequest = decode(&body)?;
    state.discovery.start(&request.target)?;
    Ok(Json(json!({ "status": "started" })))
}

/// `POST /api/discover/stop`
pub async fn discover_stop(State(state): State<AppState>) -> Json<Value> {
    state.discovery.stop();
    Json(json!({ "status": "stopping" }))
}

/// `GET /api/presets`
pub async fn list_presets(State(state): State<AppState>) -> Json<Vec<Preset>> {
    Json(state.presets.list())
}

/// `POST /api/presets`
pub async fn save_preset(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let preset: Preset = decode(&body)?;
    let saved = state.presets.upsert(preset).await?;
    Ok(Json(json!({ "ok": true, "id": saved.id })))
}

/// `POST /api/auth/login`
pub async fn login(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    // An undecodable body is treated like an empty form.
    let request: LoginRequest = serde_json::from_slice(&body).unwrap_or_default();
    match state.sessions.login(&request.username) {
        Some((token, profile)) => Json(json!({ "ok": true, "token": token, "profile": profile })),
        None => Json(json!({ "ok": false, "error": "missing username" })),
    }
}

/// `GET /api/auth/me`
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let authorization = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    let token = bearer_token(authorization);
    if token.is_empty() {
        return Json(json!({ "ok": false }));
    }
    let profile = state.sessions.lookup(token);
    Json(json!({ "ok": profile.is_some(), "profile": profile }))
}
