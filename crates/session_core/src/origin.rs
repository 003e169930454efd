//! Calls to the same-origin server: auth config and server-side logout.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use shared::protocol::{AuthConfig, AUTH_CONFIG_ROUTE, AUTH_LOGOUT_ROUTE};
use url::Url;

#[derive(Clone)]
pub struct OriginClient {
    http: Client,
    origin: Url,
}

impl OriginClient {
    pub fn new(http: Client, origin: Url) -> Self {
        Self { http, origin }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    fn route(&self, route: &str) -> Result<Url> {
        self.origin
            .join(route)
            .with_context(|| format!("failed to join '{route}' onto {}", self.origin))
    }

    pub async fn fetch_auth_config(&self, timeout: Duration) -> Result<AuthConfig> {
        let config = self
            .http
            .get(self.route(AUTH_CONFIG_ROUTE)?)
            .timeout(timeout)
            .send()
            .await
            .context("auth config request failed")?
            .error_for_status()
            .context("auth config request rejected")?
            .json::<AuthConfig>()
            .await
            .context("malformed auth config body")?;
        if !config.is_complete() {
            return Err(anyhow!("auth config is missing url or key"));
        }
        Ok(config)
    }

    /// Asks the server to drop its session record. The body is ignored.
    pub async fn invalidate_session(&self) -> Result<()> {
        let res = self
            .http
            .post(self.route(AUTH_LOGOUT_ROUTE)?)
            .send()
            .await
            .context("server logout request failed")?;
        if !res.status().is_success() {
            return Err(anyhow!("server logout returned status {}", res.status()));
        }
        Ok(())
    }
}
