//! Process lifecycle.
//!
//! # Data Flow
//! ```text
//! SIGTERM / Ctrl-C (signals.rs)
//!     → Shutdown::trigger (shutdown.rs)
//!     → HttpServer::run stops discovery, closes the event hub, drains
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
