//! Stub single-user authentication.
//!
//! Sessions are process-local and never expire; any non-blank username
//! logs in. Used by the UI to show a profile, not to protect endpoints.

pub mod session;

pub use session::{bearer_token, LoginRequest, Profile, SessionStore};
