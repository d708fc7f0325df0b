//! MoneyWatcher: live-page wiring for the scan engine
//!
//! Waits for the settings promise, runs the initial pass, then observes the
//! root subtree. Every observer batch pushes the rescan deadline back; a
//! single `setTimeout` fires the debounced pass.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use js_sys::{Array, Date, Promise};
use serde_json::{Map, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};
use web_sys::{MutationObserver, MutationObserverInit, Node};

use crate::scanner::conductor::{ScanConductor, ScanOutcome};
use crate::settings::Settings;
use crate::tree::dom::DomTree;

struct Inner {
    conductor: ScanConductor,
    tree: DomTree,
    root: Node,
    timer: Option<i32>,
    on_timer: Option<Closure<dyn FnMut()>>,
}

impl Inner {
    fn report(&self, outcome: &ScanOutcome) {
        match outcome {
            ScanOutcome::Completed(report) if !report.is_noop() => {
                web_sys::console::log_1(&format!(
                    "[MoneyWatcher] {} mentions annotated, {} structured ({}us)",
                    report.mentions, report.structured, report.elapsed_us
                ).into());
            }
            ScanOutcome::Abandoned { reason } => {
                web_sys::console::error_1(&format!("[MoneyWatcher] Scan abandoned: {}", reason).into());
            }
            _ => {}
        }
    }

    fn scan_now(&mut self) -> ScanOutcome {
        let outcome = self.conductor.scan(&mut self.tree, &self.root);
        self.report(&outcome);
        outcome
    }

    fn arm_timer(&mut self, delay: f64) {
        let Some(window) = web_sys::window() else {
            return;
        };
        if let Some(handle) = self.timer.take() {
            window.clear_timeout_with_handle(handle);
        }
        let Some(callback) = self.on_timer.as_ref() else {
            return;
        };
        match window.set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.as_ref().unchecked_ref(),
            delay.max(0.0).ceil() as i32,
        ) {
            Ok(handle) => self.timer = Some(handle),
            Err(e) => web_sys::console::error_1(&format!("[MoneyWatcher] setTimeout failed: {:?}", e).into()),
        }
    }

    fn cancel_timer(&mut self) {
        if let (Some(handle), Some(window)) = (self.timer.take(), web_sys::window()) {
            window.clear_timeout_with_handle(handle);
        }
    }
}

fn on_timer_fired(weak: &Weak<RefCell<Inner>>) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    let Ok(mut inner) = inner.try_borrow_mut() else {
        return;
    };
    inner.timer = None;
    let Inner { conductor, tree, root, .. } = &mut *inner;
    if let Some(outcome) = conductor.flush(tree, root) {
        inner.report(&outcome);
    }
}

fn on_mutations(weak: &Weak<RefCell<Inner>>, records: &Array) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    let Ok(mut inner) = inner.try_borrow_mut() else {
        return;
    };
    let now = Date::now();
    if let Some(deadline) = inner.conductor.notify_mutations(records.length() as usize, now) {
        inner.arm_timer(deadline - now);
    }
}

/// Settings snapshot from whatever the store promise resolved to
fn settings_from_js(value: JsValue) -> Settings {
    match serde_wasm_bindgen::from_value::<Map<String, Value>>(value) {
        Ok(store) => Settings::from_store(&store),
        Err(e) => {
            web_sys::console::log_1(&format!("[MoneyWatcher] Using default settings: {}", e).into());
            Settings::default()
        }
    }
}

// =============================================================================
// MoneyWatcher
// =============================================================================

/// Live annotator for one root element
#[wasm_bindgen]
pub struct MoneyWatcher {
    inner: Rc<RefCell<Inner>>,
    observer: Option<MutationObserver>,
    _on_mutation: Closure<dyn FnMut(Array, MutationObserver)>,
}

impl MoneyWatcher {
    fn attach(root: Node, settings: Settings) -> Result<MoneyWatcher, JsValue> {
        let tree = DomTree::for_node(&root).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let mut conductor = ScanConductor::new();
        conductor.load_settings(settings);

        let inner = Rc::new(RefCell::new(Inner {
            conductor,
            tree,
            root: root.clone(),
            timer: None,
            on_timer: None,
        }));

        let weak = Rc::downgrade(&inner);
        inner.borrow_mut().on_timer = Some(Closure::new(move || on_timer_fired(&weak)));

        inner.borrow_mut().scan_now();

        let weak = Rc::downgrade(&inner);
        let on_mutation = Closure::<dyn FnMut(Array, MutationObserver)>::new(
            move |records: Array, _observer: MutationObserver| on_mutations(&weak, &records),
        );
        let observer = MutationObserver::new(on_mutation.as_ref().unchecked_ref())?;
        let options = MutationObserverInit::new();
        options.set_child_list(true);
        options.set_character_data(true);
        options.set_subtree(true);
        observer.observe_with_options(&root, &options)?;

        Ok(MoneyWatcher {
            inner,
            observer: Some(observer),
            _on_mutation: on_mutation,
        })
    }

    /// Disconnect the observer and cancel the timer so no JS callback can
    /// reach a closure this watcher owns
    fn detach(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner.cancel_timer();
            inner.conductor.stop();
        }
    }
}

impl Drop for MoneyWatcher {
    fn drop(&mut self) {
        self.detach();
    }
}

#[wasm_bindgen]
impl MoneyWatcher {
    /// Start watching `root` once `settings` resolves.
    /// Returns a Promise resolving to the watcher.
    #[wasm_bindgen(js_name = start)]
    pub fn start(root: Node, settings: Promise) -> Promise {
        future_to_promise(async move {
            let store = match JsFuture::from(settings).await {
                Ok(value) => value,
                Err(e) => {
                    web_sys::console::error_1(&format!("[MoneyWatcher] Settings load failed: {:?}", e).into());
                    JsValue::UNDEFINED
                }
            };
            let watcher = MoneyWatcher::attach(root, settings_from_js(store))?;
            Ok(watcher.into())
        })
    }

    /// Replace settings from a store snapshot and refresh every annotation
    #[wasm_bindgen(js_name = updateSettings)]
    pub fn update_settings(&self, store: JsValue) -> Result<JsValue, JsValue> {
        let settings = settings_from_js(store);
        let mut inner = self.inner.borrow_mut();
        inner.cancel_timer();
        let Inner { conductor, tree, root, .. } = &mut *inner;
        let outcome = conductor.replace_settings(tree, root, settings);
        inner.report(&outcome);
        serde_wasm_bindgen::to_value(&outcome)
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize outcome: {}", e)))
    }

    /// Full pass right now, bypassing the debounce
    #[wasm_bindgen]
    pub fn rescan(&self) -> Result<JsValue, JsValue> {
        let outcome = self.inner.borrow_mut().scan_now();
        serde_wasm_bindgen::to_value(&outcome)
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize outcome: {}", e)))
    }

    /// Statistics of the last completed pass
    #[wasm_bindgen(js_name = lastReport)]
    pub fn last_report(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.borrow().conductor.last_report())
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize report: {}", e)))
    }

    /// Disconnect the observer and drop any pending rescan
    #[wasm_bindgen]
    pub fn stop(&mut self) {
        self.detach();
    }

    #[wasm_bindgen(js_name = isWatching)]
    pub fn is_watching(&self) -> bool {
        self.observer.is_some()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    async fn sleep(ms: i32) {
        let promise = Promise::new(&mut |resolve, _| {
            web_sys::window()
                .unwrap()
                .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
                .unwrap();
        });
        JsFuture::from(promise).await.unwrap();
    }

    fn mount(html: &str) -> web_sys::Element {
        let document = web_sys::window().unwrap().document().unwrap();
        let root = document.create_element("div").unwrap();
        root.set_inner_html(html);
        document.document_element().unwrap().append_child(&root).unwrap();
        root
    }

    #[wasm_bindgen_test]
    async fn test_dropped_watcher_stops_observing() {
        let root = mount("<p>Pay $5 now</p>");
        let node: Node = root.clone().into();
        let watcher = MoneyWatcher::attach(node, Settings::default()).unwrap();
        let inner = Rc::downgrade(&watcher.inner);
        assert_eq!(root.text_content().unwrap(), "Pay $5 (20min) now");

        let p = root.query_selector("p").unwrap().unwrap();
        p.set_text_content(Some("Now $10"));
        drop(watcher);

        sleep(400).await;
        assert!(inner.upgrade().is_none());
        assert_eq!(root.text_content().unwrap(), "Now $10");
        root.remove();
    }

    #[wasm_bindgen_test]
    async fn test_live_watcher_rescans_after_mutation() {
        let root = mount("<p>Pay $5 now</p>");
        let node: Node = root.clone().into();
        let mut watcher = MoneyWatcher::attach(node, Settings::default()).unwrap();

        let p = root.query_selector("p").unwrap().unwrap();
        p.set_text_content(Some("Now $10"));
        sleep(400).await;
        assert_eq!(root.text_content().unwrap(), "Now $10 (40min)");

        watcher.stop();
        assert!(!watcher.is_watching());
        root.remove();
    }
}
