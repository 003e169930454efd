//! Process-wide state shared by the controller components.
//!
//! Initialization order: create the [`AppContext`], hand it to the
//! `ConfigLoader` and `SessionController`, bind the UI, then run the first
//! session check. Nothing reads ambient globals; components hold an
//! `Arc<AppContext>`.

use std::{fmt, sync::Arc};

use tokio::sync::{watch, OnceCell};
use uuid::Uuid;

use crate::{auth_client::AuthClient, session::SessionState};

/// Shared handle to the auth service client. Clones refer to the same client.
#[derive(Clone)]
pub struct ClientHandle {
    id: Uuid,
    auth: Arc<dyn AuthClient>,
}

impl ClientHandle {
    pub fn new(auth: Arc<dyn AuthClient>) -> Self {
        Self {
            id: Uuid::new_v4(),
            auth,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn auth(&self) -> &Arc<dyn AuthClient> {
        &self.auth
    }

    pub fn same_instance(&self, other: &ClientHandle) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.auth, &other.auth)
    }
}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle").field("id", &self.id).finish()
    }
}

pub struct AppContext {
    pub(crate) client: OnceCell<ClientHandle>,
    pub(crate) session: watch::Sender<SessionState>,
}

impl AppContext {
    pub fn new() -> Arc<Self> {
        let (session, _) = watch::channel(SessionState::Unknown);
        Arc::new(Self {
            client: OnceCell::new(),
            session,
        })
    }

    pub fn client(&self) -> Option<ClientHandle> {
        self.client.get().cloned()
    }

    /// Publishes a handle built elsewhere. The first published handle wins;
    /// the returned handle is the one every consumer will see. A construction
    /// already in flight is awaited rather than raced.
    pub async fn publish_client(&self, handle: ClientHandle) -> ClientHandle {
        let candidate = handle.id();
        let published = self.client.get_or_init(|| async move { handle }).await;
        if published.id() != candidate {
            tracing::debug!(
                kept = %published.id(),
                dropped = %candidate,
                "client handle already published"
            );
        }
        published.clone()
    }

    pub fn session_state(&self) -> SessionState {
        self.session.borrow().clone()
    }
}
