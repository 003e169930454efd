use std::{sync::Arc, time::Duration};

use tracing::{info, warn};

use crate::{
    auth_client::ClientFactory,
    context::{AppContext, ClientHandle},
    error::SessionError,
    origin::OriginClient,
};

/// Obtains the shared auth client, building it at most once per context.
///
/// Concurrent callers await the same in-flight construction through the
/// context's one-shot cell. A failed construction is not cached: the error is
/// returned to every waiter of that attempt and a later call starts afresh.
pub struct ConfigLoader {
    ctx: Arc<AppContext>,
    origin: OriginClient,
    factory: Arc<dyn ClientFactory>,
    wait: Duration,
}

impl ConfigLoader {
    pub fn new(
        ctx: Arc<AppContext>,
        origin: OriginClient,
        factory: Arc<dyn ClientFactory>,
        wait: Duration,
    ) -> Self {
        Self {
            ctx,
            origin,
            factory,
            wait,
        }
    }

    pub fn origin(&self) -> &OriginClient {
        &self.origin
    }

    pub async fn obtain_client(&self) -> Result<ClientHandle, SessionError> {
        if let Some(handle) = self.ctx.client() {
            return Ok(handle);
        }

        let handle = self
            .ctx
            .client
            .get_or_try_init(|| self.construct())
            .await?;
        Ok(handle.clone())
    }

    async fn construct(&self) -> Result<ClientHandle, SessionError> {
        let config = tokio::time::timeout(self.wait, self.origin.fetch_auth_config(self.wait))
            .await
            .map_err(|_| {
                SessionError::ConfigUnavailable(format!(
                    "no auth config within {}ms",
                    self.wait.as_millis()
                ))
            })?
            .map_err(|err| {
                warn!(origin = %self.origin.origin(), error = %err, "auth config fetch failed");
                SessionError::config_unavailable(format!("{err:#}"))
            })?;

        let auth = self
            .factory
            .build(&config)
            .map_err(|err| SessionError::config_unavailable(format!("{err:#}")))?;
        let handle = ClientHandle::new(auth);
        info!(client_id = %handle.id(), "auth client constructed");
        Ok(handle)
    }
}

#[cfg(test)]
#[path = "tests/config_loader_tests.rs"]
mod tests;
