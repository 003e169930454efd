//! Failure taxonomy of the auth path.
//!
//! Every variant degrades to the signed-out state at the call site; none of
//! them is shown to the user as a blocking error.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("auth configuration unavailable: {0}")]
    ConfigUnavailable(String),
    #[error("session query failed: {0}")]
    SessionQueryFailed(String),
    #[error("client sign-out failed: {0}")]
    SignOutFailed(String),
    #[error("server logout failed: {0}")]
    ServerLogoutFailed(String),
    #[error("invalid controller settings: {0}")]
    InvalidSettings(String),
}

impl SessionError {
    pub fn config_unavailable(err: impl std::fmt::Display) -> Self {
        Self::ConfigUnavailable(err.to_string())
    }
}
