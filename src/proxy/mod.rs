//! Request proxy subsystem.
//!
//! # Data Flow
//! ```text
//! POST /api/send {method, url, headers, body, timeoutMs}
//!     → forward.rs (validate, normalise, apply defaults)
//!     → shared reqwest client (deadline ∩ inbound connection)
//!     → net::read_capped (2 MiB)
//!     → ProxyReply {ok, status, statusText, durationMs, headers, body}
//! ```

pub mod forward;
pub mod types;

pub use forward::{RequestProxy, ProxyError};
pub use types::{ProxyReply, ProxyRequest};
