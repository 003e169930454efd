use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
    time::Duration,
};

use tokio::sync::watch;
use tracing::debug;

use crate::page::{Page, PointerEvent};

const SHOW_CLASS: &str = "show";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModalVisibility {
    pub displayed: bool,
    pub animating_in: bool,
}

/// Open/close sequencing for the profile dialog.
///
/// `displayed` controls whether the dialog takes up layout; `animating_in`
/// toggles the CSS transition class. Each call bumps a generation counter so a
/// delayed step scheduled by an earlier call is dropped once superseded.
pub struct ModalCoordinator {
    page: Arc<dyn Page>,
    modal_id: String,
    open_delay: Duration,
    close_delay: Duration,
    generation: AtomicU64,
    visibility: watch::Sender<ModalVisibility>,
}

impl ModalCoordinator {
    pub fn new(
        page: Arc<dyn Page>,
        modal_id: impl Into<String>,
        open_delay: Duration,
        close_delay: Duration,
    ) -> Arc<Self> {
        let (visibility, _) = watch::channel(ModalVisibility::default());
        Arc::new(Self {
            page,
            modal_id: modal_id.into(),
            open_delay,
            close_delay,
            generation: AtomicU64::new(0),
            visibility,
        })
    }

    pub fn visibility(&self) -> ModalVisibility {
        *self.visibility.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<ModalVisibility> {
        self.visibility.subscribe()
    }

    /// Hides the dialog and wires backdrop and close-control clicks. Returns
    /// false when the dialog is not on this page.
    pub fn attach(self: &Arc<Self>, close_control: Option<&str>) -> bool {
        self.project(self.visibility());

        let Some(modal) = self.page.element(&self.modal_id) else {
            debug!(modal = %self.modal_id, "profile dialog absent on this page");
            return false;
        };

        let weak = Arc::downgrade(self);
        let modal_id = self.modal_id.clone();
        modal.on_click(Arc::new(move |event: &PointerEvent| {
            // Only a click on the backdrop itself, not on the dialog content.
            if event.target_id == modal_id {
                close_weak(&weak);
            }
        }));

        if let Some(close_id) = close_control {
            match self.page.element(close_id) {
                Some(close) => {
                    let weak = Arc::downgrade(self);
                    close.on_click(Arc::new(move |_: &PointerEvent| close_weak(&weak)));
                }
                None => debug!(close = close_id, "close control absent on this page"),
            }
        }
        true
    }

    pub fn open(self: &Arc<Self>) {
        let generation = self.bump();
        self.update(|v| v.displayed = true);
        self.schedule(generation, self.open_delay, |v| v.animating_in = true);
    }

    pub fn close(self: &Arc<Self>) {
        let generation = self.bump();
        self.update(|v| v.animating_in = false);
        self.schedule(generation, self.close_delay, |v| v.displayed = false);
    }

    fn bump(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn schedule(
        self: &Arc<Self>,
        generation: u64,
        delay: Duration,
        step: fn(&mut ModalVisibility),
    ) {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(this) = weak.upgrade() else {
                return;
            };
            if this.generation.load(Ordering::SeqCst) == generation {
                this.update(step);
            }
        });
    }

    fn update(&self, step: impl FnOnce(&mut ModalVisibility)) {
        self.visibility.send_modify(step);
        self.project(self.visibility());
    }

    fn project(&self, visibility: ModalVisibility) {
        if let Some(modal) = self.page.element(&self.modal_id) {
            modal.set_visible(visibility.displayed);
            modal.set_class(SHOW_CLASS, visibility.animating_in);
        }
    }
}

fn close_weak(weak: &Weak<ModalCoordinator>) {
    if let Some(modal) = weak.upgrade() {
        modal.close();
    }
}

#[cfg(test)]
#[path = "tests/modal_tests.rs"]
mod tests;
