//! Wire types for `/api/send`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::wire::null_as_default;

/// A caller-described outbound HTTP call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProxyRequest {
    /// HTTP method, case-insensitive. Empty means `GET`.
    #[serde(deserialize_with = "null_as_default")]
    pub method: String,

    /// Absolute `http://` or `https://` URL.
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,

    /// Request headers, one value per name. Empty names are ignored.
    #[serde(deserialize_with = "null_as_default")]
    pub headers: BTreeMap<String, String>,

    /// Request body. Never sent with `GET` or `HEAD`.
    #[serde(deserialize_with = "null_as_default")]
    pub body: String,

    /// Per-call timeout in milliseconds; zero or negative selects the default.
    #[serde(alias = "timeout_ms", deserialize_with = "null_as_default")]
    pub timeout_ms: i64,
}

/// Structured result of a forwarded call.
///
/// Transport failures are reported with `ok = false` rather than as an HTTP
/// error of the proxy endpoint itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProxyReply {
    pub ok: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Upstream status code, 0 on transport failure.
    pub status: u16,

    /// Upstream status line, e.g. `"200 OK"`.
    pub status_text: String,

    /// Wall-clock time of the upstream dispatch.
    pub duration_ms: u64,

    /// Upstream response headers. Only the first value of each name is kept,
    /// so repeated headers such as `Set-Cookie` are lossy.
    pub headers: BTreeMap<String, String>,

    /// Upstream body, truncated at the configured cap.
    pub body: String,
}

impl ProxyReply {
    /// A transport-level failure.
    pub fn failure(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            duration_ms,
            ..Self::default()
        }
    }
}
