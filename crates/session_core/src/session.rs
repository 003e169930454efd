use std::sync::{Arc, Mutex, PoisonError, Weak};

use shared::domain::UserId;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{
    auth_client::Session,
    config_loader::ConfigLoader,
    context::AppContext,
    error::SessionError,
    page::Navigator,
    settings::ControllerSettings,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unknown,
    Authenticated {
        user_id: UserId,
        email: Option<String>,
        avatar_url: String,
    },
    Unauthenticated,
}

impl SessionState {
    pub fn from_session(session: &Session, default_avatar: &str) -> Self {
        let avatar_url = session
            .user
            .user_metadata
            .avatar_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(default_avatar)
            .to_string();
        Self::Authenticated {
            user_id: session.user.id.clone(),
            email: session.user.email.clone(),
            avatar_url,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    pub fn profile(&self) -> Option<UserProfile> {
        match self {
            Self::Authenticated {
                email, avatar_url, ..
            } => Some(UserProfile {
                email: email.clone(),
                avatar_url: avatar_url.clone(),
            }),
            _ => None,
        }
    }
}

/// View of the signed-in user, always derived from [`SessionState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub email: Option<String>,
    pub avatar_url: String,
}

/// Receives every state emission synchronously, in subscription order.
pub trait SessionObserver: Send + Sync {
    fn on_session_state(&self, state: &SessionState);
}

/// Per-phase result of a logout; both phases are best effort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub server: Result<(), SessionError>,
    pub client: Result<(), SessionError>,
}

impl LogoutOutcome {
    pub fn is_clean(&self) -> bool {
        self.server.is_ok() && self.client.is_ok()
    }
}

/// Owner of the session state.
///
/// `Unknown` is only the initial value: a check resolves to `Authenticated` or
/// `Unauthenticated`, and logout always lands in `Unauthenticated`.
pub struct SessionController {
    ctx: Arc<AppContext>,
    loader: ConfigLoader,
    navigator: Arc<dyn Navigator>,
    login_path: String,
    default_avatar: String,
    observers: Mutex<Vec<Weak<dyn SessionObserver>>>,
}

impl SessionController {
    pub fn new(
        ctx: Arc<AppContext>,
        loader: ConfigLoader,
        navigator: Arc<dyn Navigator>,
        settings: &ControllerSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            ctx,
            loader,
            navigator,
            login_path: settings.login_path.clone(),
            default_avatar: settings.default_avatar.clone(),
            observers: Mutex::new(Vec::new()),
        })
    }

    pub fn state(&self) -> SessionState {
        self.ctx.session_state()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.state().profile()
    }

    pub fn default_avatar(&self) -> &str {
        &self.default_avatar
    }

    pub fn loader(&self) -> &ConfigLoader {
        &self.loader
    }

    /// Registers an observer for later emissions. The controller keeps only a
    /// weak reference; dropped observers are pruned on the next emission.
    pub fn subscribe<O: SessionObserver + 'static>(&self, observer: &Arc<O>) {
        let weak = Arc::downgrade(observer);
        let weak: Weak<dyn SessionObserver> = weak;
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(weak);
    }

    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.ctx.session.subscribe()
    }

    pub async fn check_session(&self) -> SessionState {
        let state = match self.query_session().await {
            Ok(Some(session)) => SessionState::from_session(&session, &self.default_avatar),
            Ok(None) => SessionState::Unauthenticated,
            Err(err) => {
                warn!(error = %err, "session check failed; treating user as signed out");
                SessionState::Unauthenticated
            }
        };
        if let SessionState::Authenticated { user_id, .. } = &state {
            info!(%user_id, "session restored");
        }
        self.emit(state.clone());
        state
    }

    async fn query_session(&self) -> Result<Option<Session>, SessionError> {
        let client = self.loader.obtain_client().await?;
        client
            .auth()
            .get_session()
            .await
            .map_err(|err| SessionError::SessionQueryFailed(format!("{err:#}")))
    }

    /// Server invalidation first, then local sign-out. Neither failure stops
    /// the transition to `Unauthenticated` and the redirect.
    pub async fn logout(&self) -> LogoutOutcome {
        let server = self
            .loader
            .origin()
            .invalidate_session()
            .await
            .map_err(|err| SessionError::ServerLogoutFailed(format!("{err:#}")));
        if let Err(err) = &server {
            warn!(error = %err, "server-side logout failed; continuing");
        }

        let client = self.sign_out_client().await;
        if let Err(err) = &client {
            warn!(error = %err, "client sign-out failed; continuing");
        }

        self.emit(SessionState::Unauthenticated);
        self.redirect_to_login();
        LogoutOutcome { server, client }
    }

    async fn sign_out_client(&self) -> Result<(), SessionError> {
        let client = self
            .loader
            .obtain_client()
            .await
            .map_err(|err| SessionError::SignOutFailed(err.to_string()))?;
        client
            .auth()
            .sign_out()
            .await
            .map_err(|err| SessionError::SignOutFailed(format!("{err:#}")))
    }

    pub fn redirect_to_login(&self) {
        info!(path = %self.login_path, "redirecting to login");
        self.navigator.navigate(&self.login_path);
    }

    fn emit(&self, state: SessionState) {
        self.ctx.session.send_replace(state.clone());

        let observers: Vec<Arc<dyn SessionObserver>> = {
            let mut guard = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
            guard.retain(|observer| observer.strong_count() > 0);
            guard.iter().filter_map(Weak::upgrade).collect()
        };
        for observer in observers {
            observer.on_session_state(&state);
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
