use facetbar_core::chrome::{ChromeObserver, ChromeStateMachine, FilterRegions, Transition};
use facetbar_core::config::Config;
use facetbar_core::report::CallbackError;
use facetbar_protocol::{ChromeState, FilterElementDescriptor};
use js_sys::Function;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::{call1, to_js_error};

/// Forwards transitions to the page's `onExit(state)` / `onEnter(state)`.
struct JsObserver {
    on_exit: Function,
    on_enter: Function,
}

impl ChromeObserver for JsObserver {
    fn on_exit(&mut self, state: ChromeState) -> Result<(), CallbackError> {
        call1(&self.on_exit, &JsValue::from_str(state.as_str()))
    }

    fn on_enter(&mut self, state: ChromeState) -> Result<(), CallbackError> {
        call1(&self.on_enter, &JsValue::from_str(state.as_str()))
    }
}

/// Filter regions found by CSS selector, positioned relative to the viewport.
struct DomRegions {
    selector: String,
}

impl FilterRegions for DomRegions {
    fn viewport_height(&self) -> f64 {
        web_sys::window()
            .and_then(|w| w.inner_height().ok())
            .and_then(|h| h.as_f64())
            .unwrap_or(0.0)
    }

    fn filter_elements(&self) -> Vec<FilterElementDescriptor> {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return Vec::new();
        };
        let nodes = match document.query_selector_all(&self.selector) {
            Ok(nodes) => nodes,
            Err(_) => {
                log::warn!("[chrome] invalid filter selector {:?}", self.selector);
                return Vec::new();
            }
        };
        (0..nodes.length())
            .filter_map(|i| nodes.item(i))
            .filter_map(|node| node.dyn_into::<web_sys::Element>().ok())
            .enumerate()
            .map(|(i, element)| {
                let rect = element.get_bounding_client_rect();
                let id = match element.id() {
                    id if id.is_empty() => format!("{}#{i}", self.selector),
                    id => id,
                };
                FilterElementDescriptor::new(id, rect.top(), rect.bottom())
            })
            .collect()
    }
}

/// Header / nav / filter-bar visibility for one page.
///
/// Call `onScroll` from the scroll listener. When `flushDeadline()` returns a
/// time, schedule `flush(performance.now())` for it so the last position of a
/// burst is classified.
#[wasm_bindgen]
pub struct ChromeController {
    machine: ChromeStateMachine<JsObserver, DomRegions>,
}

#[wasm_bindgen]
impl ChromeController {
    #[wasm_bindgen(constructor)]
    pub fn new(
        config_json: &str,
        filter_selector: String,
        on_exit: Function,
        on_enter: Function,
    ) -> Result<ChromeController, JsError> {
        let config = Config::from_json(config_json).map_err(to_js_error)?;
        let observer = JsObserver { on_exit, on_enter };
        let regions = DomRegions {
            selector: filter_selector,
        };
        Ok(Self {
            machine: ChromeStateMachine::new(config.chrome, observer, regions),
        })
    }

    /// Returns the new state name when a transition happened.
    #[wasm_bindgen(js_name = onScroll)]
    pub fn on_scroll(&mut self, raw_offset: f64, timestamp_ms: f64) -> Option<String> {
        entered(self.machine.on_scroll(raw_offset, timestamp_ms))
    }

    pub fn flush(&mut self, now_ms: f64) -> Option<String> {
        entered(self.machine.flush(now_ms))
    }

    #[wasm_bindgen(js_name = flushDeadline)]
    pub fn flush_deadline(&self) -> Option<f64> {
        self.machine.flush_deadline()
    }

    #[wasm_bindgen(js_name = transitionTo)]
    pub fn transition_to(&mut self, state: &str) -> Result<Option<String>, JsError> {
        let next = ChromeState::parse(state)
            .ok_or_else(|| JsError::new(&format!("unknown chrome state: {state}")))?;
        Ok(entered(self.machine.transition_to(next)))
    }

    /// Back to `full`, as on a fresh page.
    pub fn reset(&mut self) {
        self.machine.reset();
    }

    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        self.machine.current().as_str().to_string()
    }
}

fn entered(transition: Option<Transition>) -> Option<String> {
    transition.map(|t| t.to.as_str().to_string())
}
