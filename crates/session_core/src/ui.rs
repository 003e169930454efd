//! Projection of the session state onto the page.
//!
//! The binder only reads [`SessionState`]; clicks are turned into
//! [`UiAction`]s and queued, so a slow logout never runs inside a click
//! handler.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info};

use crate::{
    modal::ModalCoordinator,
    page::{Element, Page, PointerEvent},
    session::{SessionController, SessionObserver, SessionState},
    surfaces::{PageLayout, Surface},
    translate::Translator,
};

const LOGIN_LABEL_KEY: &str = "nav.login";
const LOGIN_LABEL: &str = "Log in";
const NO_EMAIL_KEY: &str = "profile.noEmail";
const NO_EMAIL: &str = "No email";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    OpenProfile,
    Login,
    Logout,
}

impl UiAction {
    pub fn name(self) -> &'static str {
        match self {
            UiAction::OpenProfile => "open_profile",
            UiAction::Login => "login",
            UiAction::Logout => "logout",
        }
    }
}

/// Which click targets were wired and which were absent from the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindReport {
    pub bound: Vec<String>,
    pub missing: Vec<String>,
    pub modal_attached: bool,
}

/// Auth-dependent markup as shown for a given state.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Projection {
    signed_in: bool,
    signed_out: bool,
    email: String,
    avatar_url: String,
    profile_email: String,
    login_label: String,
}

pub struct UiBinder {
    controller: Arc<SessionController>,
    modal: Arc<ModalCoordinator>,
    page: Arc<dyn Page>,
    layout: PageLayout,
    translator: Arc<dyn Translator>,
    actions: mpsc::UnboundedSender<UiAction>,
    translations_task: Mutex<Option<JoinHandle<()>>>,
}

impl UiBinder {
    pub fn new(
        controller: Arc<SessionController>,
        modal: Arc<ModalCoordinator>,
        page: Arc<dyn Page>,
        layout: PageLayout,
        translator: Arc<dyn Translator>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<UiAction>) {
        let (actions, rx) = mpsc::unbounded_channel();
        let binder = Arc::new(Self {
            controller,
            modal,
            page,
            layout,
            translator,
            actions,
            translations_task: Mutex::new(None),
        });
        (binder, rx)
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    /// Wires click targets, subscribes to the controller and renders the
    /// current state. Call once, after the page is ready.
    pub fn bind(self: &Arc<Self>) -> BindReport {
        let mut report = BindReport::default();
        for surface in &self.layout.surfaces {
            self.bind_click(surface.user_trigger.as_deref(), UiAction::OpenProfile, &mut report);
            self.bind_click(surface.login.as_deref(), UiAction::Login, &mut report);
        }
        self.bind_click(
            Some(self.layout.profile.logout.as_str()),
            UiAction::Logout,
            &mut report,
        );
        report.modal_attached = self.modal.attach(Some(self.layout.profile.close.as_str()));

        self.controller.subscribe(self);
        self.follow_translations();
        self.render(&self.controller.state());

        info!(
            bound = report.bound.len(),
            missing = report.missing.len(),
            "ui bound"
        );
        report
    }

    /// Re-renders the current state whenever the translation catalog
    /// changes. Subscribes before the first render so no install is missed.
    fn follow_translations(self: &Arc<Self>) {
        let Some(mut changes) = self.translator.changes() else {
            return;
        };
        let weak = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let language = changes.borrow_and_update().clone();
                let Some(binder) = weak.upgrade() else {
                    break;
                };
                debug!(?language, "translations changed; re-rendering");
                binder.render(&binder.controller.state());
            }
        });
        let previous = self
            .translations_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn bind_click(&self, id: Option<&str>, action: UiAction, report: &mut BindReport) {
        let Some(id) = id else {
            return;
        };
        let Some(element) = self.page.element(id) else {
            debug!(element = id, action = action.name(), "click target absent");
            report.missing.push(id.to_string());
            return;
        };
        let actions = self.actions.clone();
        element.on_click(Arc::new(move |_: &PointerEvent| {
            if actions.send(action).is_err() {
                debug!(action = action.name(), "ui action queue closed");
            }
        }));
        report.bound.push(id.to_string());
    }

    /// Processes queued actions in arrival order until every sender is gone.
    pub async fn run(self: Arc<Self>, mut actions: mpsc::UnboundedReceiver<UiAction>) {
        while let Some(action) = actions.recv().await {
            self.handle(action).await;
        }
    }

    pub async fn handle(&self, action: UiAction) {
        debug!(action = action.name(), "handling ui action");
        match action {
            UiAction::OpenProfile => self.modal.open(),
            UiAction::Login => self.controller.redirect_to_login(),
            UiAction::Logout => {
                self.controller.logout().await;
            }
        }
    }

    /// Applies `state` to every registered surface and the profile dialog.
    /// Absent elements are skipped.
    pub fn render(&self, state: &SessionState) {
        let projection = self.project(state);
        for surface in &self.layout.surfaces {
            self.render_surface(surface, &projection);
        }

        let profile = &self.layout.profile;
        self.with_element(&profile.email, |el| el.set_text(&projection.profile_email));
        self.with_element(&profile.avatar, |el| {
            el.set_attribute("src", &projection.avatar_url);
        });
    }

    fn project(&self, state: &SessionState) -> Projection {
        let default_avatar = self.controller.default_avatar().to_string();
        let login_label = self.translator.t(LOGIN_LABEL_KEY, LOGIN_LABEL);
        match state.profile() {
            Some(profile) => {
                let email = profile
                    .email
                    .filter(|email| !email.trim().is_empty())
                    .unwrap_or_else(|| self.translator.t(NO_EMAIL_KEY, NO_EMAIL));
                Projection {
                    signed_in: true,
                    signed_out: false,
                    profile_email: email.clone(),
                    email,
                    avatar_url: profile.avatar_url,
                    login_label,
                }
            }
            None => Projection {
                signed_in: false,
                signed_out: matches!(state, SessionState::Unauthenticated),
                email: String::new(),
                avatar_url: default_avatar,
                profile_email: String::new(),
                login_label,
            },
        }
    }

    fn render_surface(&self, surface: &Surface, projection: &Projection) {
        if let Some(id) = surface.user_trigger.as_deref() {
            self.with_element(id, |el| el.set_visible(projection.signed_in));
        }
        if let Some(id) = surface.avatar.as_deref() {
            self.with_element(id, |el| {
                el.set_attribute("src", &projection.avatar_url);
                el.set_visible(projection.signed_in);
            });
        }
        if let Some(id) = surface.email.as_deref() {
            self.with_element(id, |el| {
                el.set_text(&projection.email);
                el.set_visible(projection.signed_in);
            });
        }
        if let Some(id) = surface.login.as_deref() {
            self.with_element(id, |el| {
                el.set_text(&projection.login_label);
                el.set_visible(projection.signed_out);
            });
        }
    }

    fn with_element(&self, id: &str, apply: impl FnOnce(&dyn Element)) {
        match self.page.element(id) {
            Some(element) => apply(element.as_ref()),
            None => debug!(element = id, "element absent; skipping"),
        }
    }
}

impl Drop for UiBinder {
    fn drop(&mut self) {
        if let Some(task) = self
            .translations_task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

impl SessionObserver for UiBinder {
    fn on_session_state(&self, state: &SessionState) {
        self.render(state);
    }
}

#[cfg(test)]
#[path = "tests/ui_tests.rs"]
mod tests;
