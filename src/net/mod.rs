//! Outbound networking subsystem.
//!
//! # Data Flow
//! ```text
//! proxy / discovery
//!     → client.rs (shared reqwest client: dialer, TLS floor, redirect cap)
//!     → upstream server
//!     → body.rs (capped body capture)
//!     → caller
//! ```

pub mod body;
pub mod client;

pub use body::read_capped;
pub use client::{build_client, error_chain, ClientError, RedirectLimitExceeded};
