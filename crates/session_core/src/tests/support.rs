use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use shared::{
    domain::UserId,
    protocol::{AuthConfig, AUTH_CONFIG_ROUTE, AUTH_LOGOUT_ROUTE},
};
use tokio::net::TcpListener;
use url::Url;

use crate::{
    auth_client::{AuthClient, ClientFactory, Session, User, UserMetadata},
    config_loader::ConfigLoader,
    context::AppContext,
    origin::OriginClient,
    page::MemoryPage,
    session::SessionController,
    settings::ControllerSettings,
};

pub(crate) fn session_for(email: Option<&str>, avatar_url: Option<&str>) -> Session {
    Session {
        access_token: "access-token".into(),
        refresh_token: Some("refresh-token".into()),
        expires_at: None,
        user: User {
            id: UserId::from("7c0b6f5e-2f7a-4c55-9b1e-1f1f2d9a0c11"),
            email: email.map(str::to_string),
            user_metadata: UserMetadata {
                avatar_url: avatar_url.map(str::to_string),
            },
        },
    }
}

pub(crate) struct FakeAuthClient {
    session: Mutex<Option<Session>>,
    fail_get_session: Option<String>,
    fail_sign_out: Option<String>,
    pub(crate) get_session_calls: AtomicUsize,
    pub(crate) sign_out_calls: AtomicUsize,
}

impl FakeAuthClient {
    pub(crate) fn signed_out() -> Self {
        Self {
            session: Mutex::new(None),
            fail_get_session: None,
            fail_sign_out: None,
            get_session_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_session(session: Session) -> Self {
        let client = Self::signed_out();
        client.set_session(Some(session));
        client
    }

    pub(crate) fn failing_query(err: impl Into<String>) -> Self {
        Self {
            fail_get_session: Some(err.into()),
            ..Self::signed_out()
        }
    }

    pub(crate) fn with_failing_sign_out(mut self, err: impl Into<String>) -> Self {
        self.fail_sign_out = Some(err.into());
        self
    }

    pub(crate) fn set_session(&self, session: Option<Session>) {
        *self.session.lock().expect("session lock") = session;
    }
}

#[async_trait]
impl AuthClient for FakeAuthClient {
    async fn get_session(&self) -> Result<Option<Session>> {
        self.get_session_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.fail_get_session {
            return Err(anyhow!(err.clone()));
        }
        Ok(self.session.lock().expect("session lock").clone())
    }

    async fn sign_out(&self) -> Result<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.set_session(None);
        if let Some(err) = &self.fail_sign_out {
            return Err(anyhow!(err.clone()));
        }
        Ok(())
    }

    async fn get_user(&self) -> Result<Option<User>> {
        Ok(self
            .session
            .lock()
            .expect("session lock")
            .as_ref()
            .map(|session| session.user.clone()))
    }
}

pub(crate) struct FakeFactory {
    pub(crate) client: Arc<FakeAuthClient>,
    pub(crate) builds: AtomicUsize,
    pub(crate) configs: Mutex<Vec<AuthConfig>>,
}

impl FakeFactory {
    pub(crate) fn new(client: FakeAuthClient) -> Arc<Self> {
        Arc::new(Self {
            client: Arc::new(client),
            builds: AtomicUsize::new(0),
            configs: Mutex::new(Vec::new()),
        })
    }
}

impl ClientFactory for FakeFactory {
    fn build(&self, config: &AuthConfig) -> Result<Arc<dyn AuthClient>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.configs
            .lock()
            .expect("configs lock")
            .push(config.clone());
        Ok(Arc::clone(&self.client) as Arc<dyn AuthClient>)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum ConfigReply {
    Ok(AuthConfig),
    Status(StatusCode),
    Malformed,
}

pub(crate) fn test_auth_config() -> AuthConfig {
    AuthConfig {
        supabase_url: "https://project.supabase.co".into(),
        supabase_key: "anon-key".into(),
    }
}

#[derive(Clone)]
struct OriginState {
    config_reply: Arc<Mutex<ConfigReply>>,
    config_delay: Duration,
    logout_status: StatusCode,
    config_hits: Arc<AtomicUsize>,
    logout_hits: Arc<AtomicUsize>,
}

pub(crate) struct OriginServer {
    pub(crate) url: Url,
    config_reply: Arc<Mutex<ConfigReply>>,
    pub(crate) config_hits: Arc<AtomicUsize>,
    pub(crate) logout_hits: Arc<AtomicUsize>,
}

impl OriginServer {
    pub(crate) fn set_config_reply(&self, reply: ConfigReply) {
        *self.config_reply.lock().expect("reply lock") = reply;
    }

    pub(crate) fn config_hits(&self) -> usize {
        self.config_hits.load(Ordering::SeqCst)
    }

    pub(crate) fn logout_hits(&self) -> usize {
        self.logout_hits.load(Ordering::SeqCst)
    }

    pub(crate) fn settings(&self) -> ControllerSettings {
        ControllerSettings {
            origin: self.url.clone(),
            ..ControllerSettings::default()
        }
    }
}

pub(crate) struct OriginOptions {
    pub(crate) config: ConfigReply,
    pub(crate) config_delay: Duration,
    pub(crate) logout_status: StatusCode,
}

impl Default for OriginOptions {
    fn default() -> Self {
        Self {
            config: ConfigReply::Ok(test_auth_config()),
            config_delay: Duration::ZERO,
            logout_status: StatusCode::OK,
        }
    }
}

async fn handle_config(State(state): State<OriginState>) -> (StatusCode, String) {
    state.config_hits.fetch_add(1, Ordering::SeqCst);
    if !state.config_delay.is_zero() {
        tokio::time::sleep(state.config_delay).await;
    }
    let reply = state.config_reply.lock().expect("reply lock").clone();
    match reply {
        ConfigReply::Ok(config) => (
            StatusCode::OK,
            serde_json::to_string(&config).expect("config json"),
        ),
        ConfigReply::Status(status) => (status, "{}".to_string()),
        ConfigReply::Malformed => (StatusCode::OK, "<html>not json</html>".to_string()),
    }
}

async fn handle_logout(State(state): State<OriginState>) -> (StatusCode, String) {
    state.logout_hits.fetch_add(1, Ordering::SeqCst);
    (state.logout_status, r#"{"success":true}"#.to_string())
}

pub(crate) async fn spawn_origin(options: OriginOptions) -> OriginServer {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = OriginState {
        config_reply: Arc::new(Mutex::new(options.config)),
        config_delay: options.config_delay,
        logout_status: options.logout_status,
        config_hits: Arc::new(AtomicUsize::new(0)),
        logout_hits: Arc::new(AtomicUsize::new(0)),
    };
    let server = OriginServer {
        url: Url::parse(&format!("http://{addr}")).expect("url"),
        config_reply: Arc::clone(&state.config_reply),
        config_hits: Arc::clone(&state.config_hits),
        logout_hits: Arc::clone(&state.logout_hits),
    };
    let app = Router::new()
        .route(AUTH_CONFIG_ROUTE, get(handle_config))
        .route(AUTH_LOGOUT_ROUTE, post(handle_logout))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    server
}

pub(crate) fn loader_for(
    ctx: &Arc<AppContext>,
    settings: &ControllerSettings,
    factory: Arc<dyn ClientFactory>,
) -> ConfigLoader {
    ConfigLoader::new(
        Arc::clone(ctx),
        OriginClient::new(reqwest::Client::new(), settings.origin.clone()),
        factory,
        settings.client_wait,
    )
}

pub(crate) fn controller_for(
    settings: &ControllerSettings,
    factory: Arc<dyn ClientFactory>,
    page: &MemoryPage,
) -> (Arc<AppContext>, Arc<SessionController>) {
    let ctx = AppContext::new();
    let loader = loader_for(&ctx, settings, factory);
    let controller = SessionController::new(
        Arc::clone(&ctx),
        loader,
        Arc::new(page.clone()),
        settings,
    );
    (ctx, controller)
}

/// Waits on real time for `check` to hold, for flows that finish on a
/// spawned task.
pub(crate) async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
