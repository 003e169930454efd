use serde::{Deserialize, Serialize};

pub const AUTH_CONFIG_ROUTE: &str = "/api/auth/config";
pub const AUTH_LOGOUT_ROUTE: &str = "/api/auth/logout";
pub const HEALTHZ_ROUTE: &str = "/healthz";

pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";
pub const REFRESH_TOKEN_COOKIE: &str = "sb-refresh-token";

/// Connection parameters for the hosted auth service, served same-origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    pub supabase_url: String,
    pub supabase_key: String,
}

impl AuthConfig {
    pub fn is_complete(&self) -> bool {
        !self.supabase_url.trim().is_empty() && !self.supabase_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}
