//! Forwarding of caller-described requests.
//!
//! # Responsibilities
//! - Normalise and validate the caller's method and URL
//! - Compose the per-call deadline with the inbound connection's lifetime
//! - Apply header defaults without overriding the caller
//! - Capture a bounded body and flatten response headers
//!
//! # Design Decisions
//! - Inbound cancellation is the drop of the handler future when the client
//!   goes away; the deadline is layered on top with `timeout_at`
//! - Only a bad URL is an endpoint error, everything upstream is `ok: false`

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, Response};
use thiserror::Error;
use tokio::time::Instant;

use crate::config::ProxyConfig;
use crate::net::{error_chain, read_capped};
use crate::observability::metrics;
use crate::proxy::types::{ProxyReply, ProxyRequest};

/// Errors reported as HTTP errors of the proxy endpoint itself.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProxyError {
    #[error("url must start with http:// or https://")]
    InvalidUrl,
}

/// Stateless forwarder over the shared outbound client.
#[derive(Clone)]
pub struct RequestProxy {
    client: Client,
    config: ProxyConfig,
}

impl RequestProxy {
    pub fn new(client: Client, config: ProxyConfig) -> Self {
        Self { client, config }
    }

    /// Forward one request and describe the upstream answer.
    pub async fn forward(&self, request: ProxyRequest) -> Result<ProxyReply, ProxyError> {
        let method = normalize_method(&request.method);
        let url = request.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ProxyError::InvalidUrl);
        }

        let timeout = if request.timeout_ms > 0 {
            Duration::from_millis(request.timeout_ms as u64)
        } else {
            Duration::from_millis(self.config.default_timeout_ms)
        };
        let deadline = Instant::now() + timeout;

        let parsed_method = match Method::from_bytes(method.as_bytes()) {
            Ok(m) => m,
            Err(_) => return Ok(ProxyReply::failure(format!("invalid method {method:?}"), 0)),
        };

        let send_body = !request.body.is_empty() && method != "GET" && method != "HEAD";
        let headers = match self.outbound_headers(&request.headers, send_body) {
            Ok(headers) => headers,
            Err(message) => return Ok(ProxyReply::failure(message, 0)),
        };

        let mut builder = self.client.request(parsed_method, url).headers(headers);
        if send_body {
            builder = builder.body(request.body);
        }

        let start = Instant::now();
        let result = tokio::time::timeout_at(deadline, builder.send()).await;
        let elapsed = start.elapsed();
        let duration_ms = elapsed.as_millis() as u64;

        let response = match result {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let message = error_chain(&e);
                tracing::info!(method = %method, url, duration_ms, error = %message, "Upstream request failed");
                metrics::record_proxy_request("error", elapsed);
                return Ok(ProxyReply::failure(message, duration_ms));
            }
            Err(_) => {
                let message = format!("{method} {url}: timed out after {}ms", timeout.as_millis());
                tracing::info!(method = %method, url, duration_ms, "Upstream request timed out");
                metrics::record_proxy_request("error", elapsed);
                return Ok(ProxyReply::failure(message, duration_ms));
            }
        };

        metrics::record_proxy_request("ok", elapsed);
        tracing::info!(
            method = %method,
            url,
            status = response.status().as_u16(),
            duration_ms,
            "Upstream request completed"
        );

        Ok(self.reply(response, duration_ms, deadline).await)
    }

    fn outbound_headers(
        &self,
        caller: &BTreeMap<String, String>,
        send_body: bool,
    ) -> Result<HeaderMap, String> {
        let mut headers = HeaderMap::new();
        for (name, value) in caller {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| format!("invalid header name {name:?}"))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| format!("invalid value for header {name:?}"))?;
            headers.insert(header_name, header_value);
        }

        if !headers.contains_key(USER_AGENT) {
            let agent = HeaderValue::from_str(&self.config.user_agent)
                .map_err(|_| "invalid configured user agent".to_string())?;
            headers.insert(USER_AGENT, agent);
        }
        if send_body && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        Ok(headers)
    }

    async fn reply(&self, response: Response, duration_ms: u64, deadline: Instant) -> ProxyReply {
        let status = response.status();
        let status_text = match status.canonical_reason() {
            Some(reason) => format!("{} {}", status.as_u16(), reason),
            None => status.as_u16().to_string(),
        };
        let headers = flatten_headers(response.headers());
        let body = read_capped(response, self.config.max_body_bytes, Some(deadline)).await;

        ProxyReply {
            ok: true,
            error: None,
            status: status.as_u16(),
            status_text,
            duration_ms,
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
        }
    }
}

/// Uppercase and trim a method, defaulting to `GET`.
pub fn normalize_method(method: &str) -> String {
    let method = method.trim().to_uppercase();
    if method.is_empty() {
        "GET".to_string()
    } else {
        method
    }
}

/// Keep the first value of every header, keyed by its canonical name.
pub fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for name in headers.keys() {
        if let Some(value) = headers.get(name) {
            out.insert(
                canonical_header_name(name.as_str()),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }
    }
    out
}

/// Canonical MIME form: `content-type` → `Content-Type`.
///
/// Names containing anything other than token characters are returned as-is.
pub fn canonical_header_name(name: &str) -> String {
    if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)) {
        return name.to_string();
    }
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() };
            upper = c == '-';
            out
        })
        .collect()
}
