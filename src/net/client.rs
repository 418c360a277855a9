//! Outbound HTTP client factory.
//!
//! # Responsibilities
//! - Build the process-wide `reqwest::Client` shared by proxy and discovery
//! - Enforce connect timeout, TCP keep-alive and a TLS 1.2 floor
//! - Cap redirect chains with a dedicated error
//!
//! # Design Decisions
//! - No overall client timeout: callers impose per-call deadlines, because the
//!   discovery task outlives any single probe
//! - Environment proxy variables are honoured unless `use_env_proxy` is off

use std::time::Duration;

use reqwest::{redirect, tls, Client};
use thiserror::Error;

use crate::config::ClientConfig;

/// Returned through the redirect policy once the chain grows past the cap.
#[derive(Debug, Error)]
#[error("stopped after {0} redirects")]
pub struct RedirectLimitExceeded(pub usize);

/// Errors raised while constructing the client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Build the shared outbound client.
pub fn build_client(config: &ClientConfig) -> Result<Client, ClientError> {
    let max_redirects = config.max_redirects;
    let policy = redirect::Policy::custom(move |attempt| {
        // `previous` holds the original URL plus every redirect already taken.
        if attempt.previous().len() > max_redirects {
            attempt.error(RedirectLimitExceeded(max_redirects))
        } else {
            attempt.follow()
        }
    });

    let keep_alive = (config.keep_alive_secs > 0).then(|| Duration::from_secs(config.keep_alive_secs));

    let mut builder = Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .tcp_keepalive(keep_alive)
        .min_tls_version(tls::Version::TLS_1_2)
        .redirect(policy);
    if !config.use_env_proxy {
        builder = builder.no_proxy();
    }
    let client = builder.build()?;

    tracing::debug!(
        connect_timeout_secs = config.connect_timeout_secs,
        keep_alive_secs = config.keep_alive_secs,
        max_redirects,
        use_env_proxy = config.use_env_proxy,
        "Outbound HTTP client built"
    );

    Ok(client)
}

/// Render an error together with its source chain, `outer: inner: root`.
///
/// reqwest keeps the interesting cause (DNS failure, redirect cap, TLS alert)
/// in `source()`, so `to_string()` alone loses it.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
