use shared::protocol::AuthConfig;

pub(crate) struct AppState {
    /// `None` until both the auth service URL and key are configured.
    pub(crate) auth: Option<AuthConfig>,
}
