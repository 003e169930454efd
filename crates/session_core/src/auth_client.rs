//! Boundary to the hosted auth service.
//!
//! The controller only needs three calls from the service client; they are
//! modelled as [`AuthClient`] so tests and alternative backends can stand in.
//! [`SupabaseAuthClient`] is the HTTP implementation used by the binaries.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use shared::{domain::UserId, protocol::AuthConfig};
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix timestamp in seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

impl Session {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expiry| expiry <= now)
    }
}

#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Current session, `None` when signed out.
    async fn get_session(&self) -> Result<Option<Session>>;
    async fn sign_out(&self) -> Result<()>;
    async fn get_user(&self) -> Result<Option<User>>;
}

/// Builds the auth client once the connection parameters are known.
pub trait ClientFactory: Send + Sync {
    fn build(&self, config: &AuthConfig) -> Result<Arc<dyn AuthClient>>;
}

pub struct SupabaseClientFactory {
    http: Client,
    initial_session: Mutex<Option<Session>>,
}

impl SupabaseClientFactory {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            initial_session: Mutex::new(None),
        }
    }

    /// Session restored from local storage, handed to the client it builds.
    pub fn with_session(http: Client, session: Session) -> Self {
        Self {
            http,
            initial_session: Mutex::new(Some(session)),
        }
    }
}

impl ClientFactory for SupabaseClientFactory {
    fn build(&self, config: &AuthConfig) -> Result<Arc<dyn AuthClient>> {
        let client = SupabaseAuthClient::new(self.http.clone(), config)?;
        let restored = self
            .initial_session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(session) = restored {
            client.set_session(session);
        }
        Ok(Arc::new(client))
    }
}

pub struct SupabaseAuthClient {
    http: Client,
    base_url: Url,
    api_key: String,
    session: Mutex<Option<Session>>,
}

impl SupabaseAuthClient {
    pub fn new(http: Client, config: &AuthConfig) -> Result<Self> {
        if !config.is_complete() {
            return Err(anyhow!("auth config is missing url or key"));
        }
        let base_url = Url::parse(config.supabase_url.trim())
            .with_context(|| format!("invalid supabase url '{}'", config.supabase_url))?;
        Ok(Self {
            http,
            base_url,
            api_key: config.supabase_key.clone(),
            session: Mutex::new(None),
        })
    }

    pub fn set_session(&self, session: Session) {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    fn stored_session(&self) -> Option<Session> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn clear_session(&self) -> Option<Session> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("failed to build auth endpoint '{path}'"))
    }
}

#[async_trait]
impl AuthClient for SupabaseAuthClient {
    async fn get_session(&self) -> Result<Option<Session>> {
        let Some(session) = self.stored_session() else {
            return Ok(None);
        };
        if session.is_expired_at(Utc::now()) {
            debug!(user_id = %session.user.id, "stored session expired; discarding");
            self.clear_session();
            return Ok(None);
        }
        Ok(Some(session))
    }

    async fn sign_out(&self) -> Result<()> {
        // The local session is dropped even when the remote call fails.
        let Some(session) = self.clear_session() else {
            return Ok(());
        };
        let res = self
            .http
            .post(self.endpoint("/auth/v1/logout")?)
            .header("apikey", &self.api_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .context("sign-out request failed")?;
        if !res.status().is_success() {
            return Err(anyhow!("sign-out rejected with status {}", res.status()));
        }
        Ok(())
    }

    async fn get_user(&self) -> Result<Option<User>> {
        let Some(session) = self.stored_session() else {
            return Ok(None);
        };
        let res = self
            .http
            .get(self.endpoint("/auth/v1/user")?)
            .header("apikey", &self.api_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .context("user request failed")?;
        if res.status() == StatusCode::UNAUTHORIZED {
            warn!(user_id = %session.user.id, "access token rejected by auth service");
            return Ok(None);
        }
        let user = res
            .error_for_status()
            .context("user request rejected")?
            .json::<User>()
            .await
            .context("malformed user response")?;
        Ok(Some(user))
    }
}

#[cfg(test)]
#[path = "tests/auth_client_tests.rs"]
mod tests;
