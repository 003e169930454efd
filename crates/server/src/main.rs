use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{
        AuthConfig, LogoutResponse, ACCESS_TOKEN_COOKIE, AUTH_CONFIG_ROUTE, AUTH_LOGOUT_ROUTE,
        HEALTHZ_ROUTE, REFRESH_TOKEN_COOKIE,
    },
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;

use app_state::AppState;
use config::load_settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = load_settings();
    let auth = settings.auth_config();
    if auth.is_none() {
        warn!("SUPABASE_URL / SUPABASE_KEY not configured; auth config endpoint will answer 503");
    }

    let state = AppState { auth };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings
        .server_bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.server_bind))?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(HEALTHZ_ROUTE, get(healthz))
        .route(AUTH_CONFIG_ROUTE, get(auth_config))
        .route(AUTH_LOGOUT_ROUTE, post(logout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn auth_config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AuthConfig>, (StatusCode, Json<ApiError>)> {
    match &state.auth {
        Some(config) => Ok(Json(config.clone())),
        None => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new(
                ErrorCode::Unavailable,
                "auth service is not configured on this server",
            )),
        )),
    }
}

/// Expires the auth cookies. Always succeeds; a request without credentials
/// is already logged out.
async fn logout(headers: HeaderMap) -> impl IntoResponse {
    info!(
        had_session = presented_token(&headers).is_some(),
        "session cookies cleared"
    );

    (
        AppendHeaders([
            (header::SET_COOKIE, expired_cookie(ACCESS_TOKEN_COOKIE)),
            (header::SET_COOKIE, expired_cookie(REFRESH_TOKEN_COOKIE)),
        ]),
        Json(LogoutResponse { success: true }),
    )
}

fn expired_cookie(name: &str) -> String {
    format!("{name}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}

/// Bearer token first, then the access-token cookie.
fn presented_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == ACCESS_TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
