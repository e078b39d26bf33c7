//! Keeps Tab inside the command input.
//!
//! # Design
//! The page is reached through two small traits, `ElementLookup` and
//! `InputElement`, so the guard can attach to a real DOM binding or to the
//! in-memory `HeadlessPage` used by the bootstrap tests. Attachment waits one
//! scheduler turn so that it runs after the application's first render has
//! created the element. A missing element is not an error.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::BridgeConfig;

/// A key-down event as seen by listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    key_code: u32,
    default_prevented: bool,
}

impl KeyEvent {
    pub fn new(key_code: u32) -> Self {
        Self {
            key_code,
            default_prevented: false,
        }
    }

    pub fn key_code(&self) -> u32 {
        self.key_code
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

pub type KeyListener = Arc<dyn Fn(&mut KeyEvent) + Send + Sync>;

/// An element that accepts key-down listeners.
pub trait InputElement {
    fn add_keydown_listener(&self, listener: KeyListener);
}

/// Finds elements by id.
pub trait ElementLookup {
    type Element: InputElement;

    fn element_by_id(&self, id: &str) -> Option<Self::Element>;
}

/// Suppresses the default action of one key on one input element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputGuard {
    element_id: String,
    key_code: u32,
}

impl InputGuard {
    pub fn new(element_id: &str, key_code: u32) -> Self {
        Self {
            element_id: element_id.to_string(),
            key_code,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(&config.guarded_input_id, config.advance_focus_key)
    }

    /// Attach the listener now. Returns false, without error, when the
    /// element does not exist.
    pub fn attach<D: ElementLookup + ?Sized>(&self, dom: &D) -> bool {
        let Some(element) = dom.element_by_id(&self.element_id) else {
            tracing::debug!(element_id = %self.element_id, "guarded input not found, skipping");
            return false;
        };

        let key_code = self.key_code;
        element.add_keydown_listener(Arc::new(move |event: &mut KeyEvent| {
            if event.key_code() == key_code {
                event.prevent_default();
            }
        }));
        true
    }

    /// Yield once to let the initial render finish, then attach.
    pub async fn attach_deferred<D: ElementLookup>(self, dom: D) -> bool {
        tokio::task::yield_now().await;
        self.attach(&dom)
    }
}

#[derive(Default)]
struct PageState {
    order: Vec<String>,
    listeners: HashMap<String, Vec<KeyListener>>,
    focused: Option<usize>,
}

/// An in-memory page: a focus order of text inputs and their listeners.
///
/// Pressing Tab moves focus to the next input unless a listener prevented
/// the default action.
#[derive(Clone, Default)]
pub struct HeadlessPage {
    state: Arc<Mutex<PageState>>,
}

impl HeadlessPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inputs(ids: &[&str]) -> Self {
        let page = Self::new();
        for id in ids {
            page.add_input(id);
        }
        page
    }

    fn state(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_input(&self, id: &str) {
        let mut state = self.state();
        if !state.order.iter().any(|existing| existing == id) {
            state.order.push(id.to_string());
        }
    }

    /// Focus an input. Returns false if it does not exist.
    pub fn focus(&self, id: &str) -> bool {
        let mut state = self.state();
        let position = state.order.iter().position(|existing| existing == id);
        if position.is_some() {
            state.focused = position;
        }
        position.is_some()
    }

    pub fn focused(&self) -> Option<String> {
        let state = self.state();
        state.focused.and_then(|index| state.order.get(index).cloned())
    }

    pub fn listener_count(&self, id: &str) -> usize {
        self.state().listeners.get(id).map_or(0, Vec::len)
    }

    /// Dispatch a key-down to the focused input, then run the default action.
    pub fn press_key(&self, key_code: u32) -> KeyEvent {
        let mut event = KeyEvent::new(key_code);
        let listeners = {
            let state = self.state();
            state
                .focused
                .and_then(|index| state.order.get(index))
                .and_then(|id| state.listeners.get(id))
                .cloned()
                .unwrap_or_default()
        };
        for listener in &listeners {
            listener(&mut event);
        }

        if key_code == crate::config::TAB_KEY_CODE && !event.default_prevented() {
            let mut state = self.state();
            let len = state.order.len();
            if len > 0 {
                let next = state.focused.map_or(0, |index| (index + 1) % len);
                state.focused = Some(next);
            }
        }
        event
    }
}

/// Handle to one input on a `HeadlessPage`.
#[derive(Clone)]
pub struct HeadlessInput {
    page: HeadlessPage,
    id: String,
}

impl InputElement for HeadlessInput {
    fn add_keydown_listener(&self, listener: KeyListener) {
        self.page
            .state()
            .listeners
            .entry(self.id.clone())
            .or_default()
            .push(listener);
    }
}

impl ElementLookup for HeadlessPage {
    type Element = HeadlessInput;

    fn element_by_id(&self, id: &str) -> Option<HeadlessInput> {
        let exists = self.state().order.iter().any(|existing| existing == id);
        exists.then(|| HeadlessInput {
            page: self.clone(),
            id: id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TAB_KEY_CODE;

    const INPUT: &str = "cm-command-input";
    const ENTER: u32 = 13;

    fn guarded_page() -> HeadlessPage {
        let page = HeadlessPage::with_inputs(&[INPUT, "next-field"]);
        assert!(InputGuard::new(INPUT, TAB_KEY_CODE).attach(&page));
        page.focus(INPUT);
        page
    }

    #[test]
    fn tab_in_guarded_input_keeps_focus() {
        let page = guarded_page();
        let event = page.press_key(TAB_KEY_CODE);
        assert!(event.default_prevented());
        assert_eq!(page.focused().as_deref(), Some(INPUT));
    }

    #[test]
    fn other_keys_pass_through() {
        let page = guarded_page();
        let event = page.press_key(ENTER);
        assert!(!event.default_prevented());
        assert_eq!(page.focused().as_deref(), Some(INPUT));
    }

    #[test]
    fn tab_elsewhere_still_advances_focus() {
        let page = guarded_page();
        page.focus("next-field");
        let event = page.press_key(TAB_KEY_CODE);
        assert!(!event.default_prevented());
        assert_eq!(page.focused().as_deref(), Some(INPUT));
    }

    #[test]
    fn unguarded_tab_advances_focus() {
        let page = HeadlessPage::with_inputs(&[INPUT, "next-field"]);
        page.focus(INPUT);
        page.press_key(TAB_KEY_CODE);
        assert_eq!(page.focused().as_deref(), Some("next-field"));
    }

    #[test]
    fn missing_element_is_a_no_op() {
        let page = HeadlessPage::with_inputs(&["other"]);
        assert!(!InputGuard::new(INPUT, TAB_KEY_CODE).attach(&page));
        assert_eq!(page.listener_count("other"), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn deferred_attach_waits_for_work_scheduled_after_it() {
        let page = HeadlessPage::new();
        let guard = tokio::spawn(InputGuard::new(INPUT, TAB_KEY_CODE).attach_deferred(page.clone()));
        let render = {
            let page = page.clone();
            tokio::spawn(async move { page.add_input(INPUT) })
        };

        assert!(guard.await.unwrap());
        render.await.unwrap();
        assert_eq!(page.listener_count(INPUT), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn immediate_attach_misses_work_scheduled_after_it() {
        let page = HeadlessPage::new();
        let guard = {
            let page = page.clone();
            tokio::spawn(async move { InputGuard::new(INPUT, TAB_KEY_CODE).attach(&page) })
        };
        let render = {
            let page = page.clone();
            tokio::spawn(async move { page.add_input(INPUT) })
        };

        assert!(!guard.await.unwrap());
        render.await.unwrap();
        assert_eq!(page.listener_count(INPUT), 0);
    }
}
