//! Page and navigation seams.
//!
//! The controller never holds element references across await points; it asks
//! the [`Page`] for an element by id each time and treats `None` as "feature
//! absent on this page". [`MemoryPage`] is a headless page used by the probe
//! binary and the tests.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{Arc, Mutex, PoisonError},
};

/// A pointer event as seen by a click handler. `target_id` is the innermost
/// element that was hit; handlers registered on ancestors see it unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerEvent {
    pub target_id: String,
}

pub type ClickHandler = Arc<dyn Fn(&PointerEvent) + Send + Sync>;

pub trait Element: Send + Sync {
    fn id(&self) -> &str;
    fn set_visible(&self, visible: bool);
    fn set_text(&self, text: &str);
    fn set_attribute(&self, name: &str, value: &str);
    fn set_class(&self, class: &str, enabled: bool);
    fn on_click(&self, handler: ClickHandler);
}

pub trait Page: Send + Sync {
    fn element(&self, id: &str) -> Option<Arc<dyn Element>>;
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Rendered state of one element in a [`MemoryPage`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementSnapshot {
    pub visible: bool,
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    pub classes: BTreeSet<String>,
}

struct MemoryElement {
    id: String,
    state: Mutex<ElementSnapshot>,
    handlers: Mutex<Vec<ClickHandler>>,
}

impl MemoryElement {
    fn snapshot(&self) -> ElementSnapshot {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn with_state(&self, f: impl FnOnce(&mut ElementSnapshot)) {
        f(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner));
    }

    fn handlers(&self) -> Vec<ClickHandler> {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Element for MemoryElement {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_visible(&self, visible: bool) {
        self.with_state(|state| state.visible = visible);
    }

    fn set_text(&self, text: &str) {
        self.with_state(|state| state.text = text.to_string());
    }

    fn set_attribute(&self, name: &str, value: &str) {
        self.with_state(|state| {
            state.attributes.insert(name.to_string(), value.to_string());
        });
    }

    fn set_class(&self, class: &str, enabled: bool) {
        self.with_state(|state| {
            if enabled {
                state.classes.insert(class.to_string());
            } else {
                state.classes.remove(class);
            }
        });
    }

    fn on_click(&self, handler: ClickHandler) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }
}

#[derive(Default)]
struct MemoryPageInner {
    elements: HashMap<String, Arc<MemoryElement>>,
    parents: HashMap<String, String>,
    location: Option<String>,
    navigations: Vec<String>,
}

#[derive(Default, Clone)]
pub struct MemoryPage {
    inner: Arc<Mutex<MemoryPageInner>>,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_elements<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        let page = Self::new();
        for id in ids {
            page.insert(id);
        }
        page
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryPageInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an element. Elements start visible, like markup without a
    /// `hidden` attribute.
    pub fn insert(&self, id: &str) {
        let element = Arc::new(MemoryElement {
            id: id.to_string(),
            state: Mutex::new(ElementSnapshot {
                visible: true,
                ..ElementSnapshot::default()
            }),
            handlers: Mutex::new(Vec::new()),
        });
        self.lock().elements.insert(id.to_string(), element);
    }

    /// Adds an element nested inside `parent` so clicks on it bubble up.
    pub fn insert_child(&self, parent: &str, id: &str) {
        self.insert(id);
        self.lock()
            .parents
            .insert(id.to_string(), parent.to_string());
    }

    pub fn remove(&self, id: &str) {
        let mut inner = self.lock();
        inner.elements.remove(id);
        inner.parents.remove(id);
    }

    pub fn snapshot(&self, id: &str) -> Option<ElementSnapshot> {
        let element = self.lock().elements.get(id).cloned();
        element.map(|element| element.snapshot())
    }

    /// Snapshot of every element, keyed by id.
    pub fn render(&self) -> BTreeMap<String, ElementSnapshot> {
        let elements: Vec<_> = self.lock().elements.values().cloned().collect();
        elements
            .into_iter()
            .map(|element| (element.id.clone(), element.snapshot()))
            .collect()
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.snapshot(id).is_some_and(|snapshot| snapshot.visible)
    }

    /// Dispatches a click on `id`, bubbling through its ancestors. Returns
    /// false if the element does not exist.
    pub fn click(&self, id: &str) -> bool {
        let chain = {
            let inner = self.lock();
            if !inner.elements.contains_key(id) {
                return false;
            }
            let mut chain = Vec::new();
            let mut current = Some(id.to_string());
            while let Some(element_id) = current {
                if let Some(element) = inner.elements.get(&element_id) {
                    chain.push(Arc::clone(element));
                }
                current = inner.parents.get(&element_id).cloned();
            }
            chain
        };

        let event = PointerEvent {
            target_id: id.to_string(),
        };
        for element in chain {
            for handler in element.handlers() {
                handler(&event);
            }
        }
        true
    }

    pub fn location(&self) -> Option<String> {
        self.lock().location.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }
}

impl Page for MemoryPage {
    fn element(&self, id: &str) -> Option<Arc<dyn Element>> {
        self.lock()
            .elements
            .get(id)
            .map(|element| Arc::clone(element) as Arc<dyn Element>)
    }
}

impl Navigator for MemoryPage {
    fn navigate(&self, path: &str) {
        let mut inner = self.lock();
        inner.location = Some(path.to_string());
        inner.navigations.push(path.to_string());
    }
}
