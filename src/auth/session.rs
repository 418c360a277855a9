//! In-memory single-user sessions.

use std::sync::Arc;

use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Role handed to every logged-in user.
pub const DEFAULT_ROLE: &str = "alpha-tester";

/// Profile attached to a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub role: String,
}

/// Login form. Missing fields deserialize as empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Token → profile map. No passwords are checked and nothing expires.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, Profile>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token for `username`. Returns `None` for a blank username.
    pub fn login(&self, username: &str) -> Option<(String, Profile)> {
        let username = username.trim();
        if username.is_empty() {
            return None;
        }

        let token = random_token();
        let profile = Profile {
            username: username.to_string(),
            role: DEFAULT_ROLE.to_string(),
        };
        self.sessions.insert(token.clone(), profile.clone());
        tracing::info!(username, "Session created");
        Some((token, profile))
    }

    pub fn lookup(&self, token: &str) -> Option<Profile> {
        self.sessions.get(token).map(|entry| entry.value().clone())
    }
}

/// Extract the token from an `Authorization` header value.
///
/// Strips the literal prefix `Bearer` (no trailing space required) and trims,
/// so `Bearer abc` and `Bearerabc` both yield `abc`.
pub fn bearer_token(header: Option<&str>) -> &str {
    let value = header.unwrap_or_default();
    value.strip_prefix("Bearer").unwrap_or(value).trim()
}

fn random_token() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
