//! Session/admin authentication and CORS configuration.

use super::defaults::{default_allowed_origins, default_session_cookie_name};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SecurityConfig {
    /// Shared secret compared against the `x-api-key` header for admin endpoints.
    #[serde(default)]
    pub admin_api_key: Option<String>,
    /// Origins allowed for CORS and WebSocket upgrade origin checks.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Name of the signed session cookie.
    #[serde(default = "default_session_cookie_name")]
    pub session_cookie_name: String,
    /// HMAC key used to sign/verify the session cookie.
    #[serde(default)]
    pub session_secret: Option<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            admin_api_key: None,
            allowed_origins: default_allowed_origins(),
            session_cookie_name: default_session_cookie_name(),
            session_secret: None,
        }
    }
}
