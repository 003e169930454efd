//! Session and UI synchronization for pages backed by a hosted auth service.
//!
//! [`SessionController`] owns the authentication state, [`UiBinder`] projects
//! it onto the page, [`ModalCoordinator`] sequences the profile dialog and
//! [`ConfigLoader`] builds the shared auth client once per [`AppContext`].
//! [`SessionUi::start`] wires them in the required order.

use std::sync::Arc;

use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::info;

pub mod auth_client;
pub mod config_loader;
pub mod context;
pub mod error;
pub mod modal;
pub mod origin;
pub mod page;
pub mod session;
pub mod settings;
pub mod surfaces;
pub mod translate;
pub mod ui;

pub use auth_client::{
    AuthClient, ClientFactory, Session, SupabaseAuthClient, SupabaseClientFactory, User,
    UserMetadata,
};
pub use config_loader::ConfigLoader;
pub use context::{AppContext, ClientHandle};
pub use error::SessionError;
pub use modal::{ModalCoordinator, ModalVisibility};
pub use origin::OriginClient;
pub use page::{Element, MemoryPage, Navigator, Page, PointerEvent};
pub use session::{LogoutOutcome, SessionController, SessionObserver, SessionState, UserProfile};
pub use settings::{load_settings, ControllerSettings};
pub use surfaces::{PageLayout, ProfileDialog, Surface};
pub use translate::{Catalog, LazyTranslator, Translator, Untranslated};
pub use ui::{BindReport, UiAction, UiBinder};

/// Collaborators supplied by the embedding page.
pub struct PageDeps {
    pub page: Arc<dyn Page>,
    pub navigator: Arc<dyn Navigator>,
    pub factory: Arc<dyn ClientFactory>,
    pub translator: Arc<dyn Translator>,
    pub layout: PageLayout,
}

/// A running controller: every component plus the action loop task.
pub struct SessionUi {
    pub ctx: Arc<AppContext>,
    pub controller: Arc<SessionController>,
    pub modal: Arc<ModalCoordinator>,
    pub binder: Arc<UiBinder>,
    pub bind_report: BindReport,
    actions_task: JoinHandle<()>,
}

impl SessionUi {
    /// Context, loader, controller, dialog, binding, action loop, and
    /// finally the first session check, in that order.
    pub async fn start(settings: &ControllerSettings, deps: PageDeps) -> Self {
        Self::start_with_http(settings, deps, Client::new()).await
    }

    pub async fn start_with_http(
        settings: &ControllerSettings,
        deps: PageDeps,
        http: Client,
    ) -> Self {
        let ctx = AppContext::new();
        let loader = ConfigLoader::new(
            Arc::clone(&ctx),
            OriginClient::new(http, settings.origin.clone()),
            deps.factory,
            settings.client_wait,
        );
        let controller =
            SessionController::new(Arc::clone(&ctx), loader, deps.navigator, settings);
        let modal = ModalCoordinator::new(
            Arc::clone(&deps.page),
            deps.layout.profile.modal.clone(),
            settings.modal_open_delay,
            settings.modal_close_delay,
        );
        let (binder, actions) = UiBinder::new(
            Arc::clone(&controller),
            Arc::clone(&modal),
            deps.page,
            deps.layout,
            deps.translator,
        );
        let bind_report = binder.bind();
        let actions_task = tokio::spawn(Arc::clone(&binder).run(actions));

        let state = controller.check_session().await;
        info!(authenticated = state.is_authenticated(), "session controller started");

        Self {
            ctx,
            controller,
            modal,
            binder,
            bind_report,
            actions_task,
        }
    }

    pub fn state(&self) -> SessionState {
        self.controller.state()
    }
}

impl Drop for SessionUi {
    fn drop(&mut self) {
        self.actions_task.abort();
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
