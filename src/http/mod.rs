//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → middleware/cors.rs (allow headers, OPTIONS → 204)
//!     → handlers.rs (decode JSON, call proxy / discovery / presets / auth)
//!     → response.rs (endpoint errors as plain text)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod server;

pub use response::ApiError;
pub use server::{AppState, HttpServer, ServerError};
