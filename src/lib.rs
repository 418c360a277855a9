//! Stressless workbench backend.
//!
//! A local HTTP API behind a browser UI: forwards ad-hoc requests on the
//! caller's behalf, runs one background API discovery at a time and streams
//! its progress over Server-Sent Events.

pub mod auth;
pub mod config;
pub mod discovery;
pub mod events;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod presets;
pub mod proxy;
pub mod wire;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
