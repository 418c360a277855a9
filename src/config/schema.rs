//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the workbench backend.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, read timeout).
    pub listener: ListenerConfig,

    /// Outbound HTTP client settings shared by the proxy and discovery.
    pub client: ClientConfig,

    /// Request proxy (`/api/send`) settings.
    pub proxy: ProxyConfig,

    /// Discovery engine settings.
    pub discovery: DiscoveryConfig,

    /// SSE event hub settings.
    pub events: EventsConfig,

    /// Preset persistence.
    pub presets: PresetsConfig,

    /// Static UI bundle.
    pub static_files: StaticConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Timeout for reading an inbound request body, in seconds.
    /// Responses are never time-limited so SSE streams stay open.
    pub read_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            read_timeout_secs: 20,
        }
    }
}

/// Outbound HTTP client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// TCP keep-alive interval in seconds.
    pub keep_alive_secs: u64,

    /// Maximum number of redirects followed before the request fails.
    pub max_redirects: usize,

    /// Honour `HTTP_PROXY` / `HTTPS_PROXY` / `NO_PROXY` from the environment.
    pub use_env_proxy: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 8,
            keep_alive_secs: 30,
            max_redirects: 10,
            use_env_proxy: true,
        }
    }
}

/// Request proxy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Timeout applied when the caller passes `timeoutMs = 0`.
    pub default_timeout_ms: u64,

    /// Upstream response bodies are truncated at this many bytes.
    pub max_body_bytes: usize,

    /// User-Agent sent when the caller does not set one.
    pub user_agent: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 25_000,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
            user_agent: "Stressless-win/0.1".to_string(),
        }
    }
}

/// Discovery engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// User-Agent sent with every probe.
    pub user_agent: String,

    /// Probe bodies are read up to this many bytes.
    pub max_body_bytes: usize,

    /// Scheme used to build probe URLs ("https" or "http").
    pub probe_scheme: String,

    /// Upper bound for a single probe in seconds (0 = unbounded).
    pub probe_timeout_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            user_agent: "Stressless-win-Discover/0.1".to_string(),
            max_body_bytes: 64 * 1024,
            probe_scheme: "https".to_string(),
            probe_timeout_secs: 15,
        }
    }
}

/// SSE event hub configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Pending events buffered per subscriber before new ones are dropped.
    pub subscriber_capacity: usize,

    /// Interval of SSE comment heartbeats in seconds (0 = disabled).
    pub keep_alive_secs: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            subscriber_capacity: 128,
            keep_alive_secs: 30,
        }
    }
}

/// Preset store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PresetsConfig {
    /// JSON file the presets are written through to.
    pub path: String,
}

impl Default for PresetsConfig {
    fn default() -> Self {
        Self {
            path: "data/presets.json".to_string(),
        }
    }
}

/// Static UI bundle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticConfig {
    /// Directory served for every non-API path.
    pub root: String,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            root: "web-dist".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
