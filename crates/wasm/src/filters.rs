use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, anyhow};
use facetbar_core::config::Config;
use facetbar_core::filters::{
    FacetCatalog, FetchResolution, FetchTicket, FilterBroadcaster, FilterChange, FilterState,
    FilterStore, FilterUi, FiltersChanged, HistorySink, RefetchCoordinator, UiId,
};
use facetbar_core::report::{CallbackError, FetchError};
use facetbar_protocol::FilterChangeRequest;
use js_sys::Function;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};

use crate::{call1, describe, to_js_error};

/// A registered filter UI. Receives the full state as a JSON string.
struct JsUi {
    apply_state: Function,
}

impl FilterUi for JsUi {
    fn apply_state(&mut self, state: &FilterState) -> Result<(), CallbackError> {
        let json = serde_json::to_string(state).map_err(|e| CallbackError::new(e.to_string()))?;
        call1(&self.apply_state, &JsValue::from_str(&json))
    }
}

/// `history.replaceState` / `history.pushState` on the current path.
struct BrowserHistory;

impl BrowserHistory {
    fn url_for(query: &str) -> Result<String, CallbackError> {
        let window = web_sys::window().ok_or_else(|| CallbackError::new("no window"))?;
        let path = window
            .location()
            .pathname()
            .map_err(|e| CallbackError::new(describe(&e)))?;
        Ok(with_query(&path, query))
    }

    fn history() -> Result<web_sys::History, CallbackError> {
        web_sys::window()
            .ok_or_else(|| CallbackError::new("no window"))?
            .history()
            .map_err(|e| CallbackError::new(describe(&e)))
    }
}

impl HistorySink for BrowserHistory {
    fn replace_query(&mut self, query: &str) -> Result<(), CallbackError> {
        let url = Self::url_for(query)?;
        Self::history()?
            .replace_state_with_url(&JsValue::NULL, "", Some(&url))
            .map_err(|e| CallbackError::new(describe(&e)))
    }

    fn push_query(&mut self, query: &str) -> Result<(), CallbackError> {
        let url = Self::url_for(query)?;
        Self::history()?
            .push_state_with_url(&JsValue::NULL, "", Some(&url))
            .map_err(|e| CallbackError::new(describe(&e)))
    }
}

/// Page-side handlers for results fetched after each change.
#[derive(Clone)]
struct ResultsSink {
    endpoint: String,
    on_results: Function,
    on_error: Function,
}

impl ResultsSink {
    fn start(&self, refetch: &Rc<RefCell<RefetchCoordinator>>, event: &FiltersChanged) {
        let ticket = refetch.borrow_mut().begin(event);
        let (sink, refetch) = (self.clone(), Rc::clone(refetch));
        spawn_local(async move {
            let outcome = fetch_fragment(&with_query(&sink.endpoint, &ticket.query))
                .await
                .map_err(|e| FetchError(format!("{e:#}")));
            sink.settle(&refetch, &ticket, outcome);
        });
    }

    fn settle(
        &self,
        refetch: &RefCell<RefetchCoordinator>,
        ticket: &FetchTicket,
        outcome: Result<String, FetchError>,
    ) {
        let resolution = refetch.borrow_mut().complete(ticket, outcome);
        let delivered = match resolution {
            FetchResolution::Apply(html) => call1(&self.on_results, &JsValue::from_str(&html)),
            FetchResolution::Failed { message } => {
                call1(&self.on_error, &JsValue::from_str(&message))
            }
            FetchResolution::Discarded => Ok(()),
        };
        if let Err(err) = delivered {
            log::warn!(
                "[refetch] results handler failed for generation {}: {err}",
                ticket.generation
            );
        }
    }
}

async fn fetch_fragment(url: &str) -> anyhow::Result<String> {
    let window = web_sys::window().context("no window")?;
    let response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| anyhow!(describe(&e)))?;
    let response: web_sys::Response = response
        .dyn_into()
        .map_err(|_| anyhow!("fetch did not resolve to a Response"))?;
    if !response.ok() {
        return Err(anyhow!("HTTP {} {}", response.status(), response.status_text()));
    }
    let text = response.text().map_err(|e| anyhow!(describe(&e)))?;
    let body = JsFuture::from(text).await.map_err(|e| anyhow!(describe(&e)))?;
    body.as_string().context("response body is not text")
}

/// `path` plus `query`, joined with `?` or `&` as needed. An empty query
/// leaves `path` untouched.
fn with_query(path: &str, query: &str) -> String {
    if query.is_empty() {
        return path.to_string();
    }
    let sep = if path.contains('?') { '&' } else { '?' };
    format!("{path}{sep}{query}")
}

/// Filter state, filter UIs, URL and results for one collection page.
///
/// Each UI registers an `applyState(json)` callback and reports its own
/// edits as `FilterChangeRequest` JSON. Every emitted change fetches
/// `resultsEndpoint?<query>`; the newest response is handed to
/// `onResults(html)` and a failure to `onError(message)`.
#[wasm_bindgen]
pub struct FilterController {
    broadcaster: FilterBroadcaster,
    refetch: Rc<RefCell<RefetchCoordinator>>,
    uis: Vec<UiId>,
}

#[wasm_bindgen]
impl FilterController {
    #[wasm_bindgen(constructor)]
    pub fn new(
        config_json: &str,
        results_endpoint: String,
        on_results: Function,
        on_error: Function,
    ) -> Result<FilterController, JsError> {
        let config = Config::from_json(config_json).map_err(to_js_error)?;
        let store = FilterStore::new(FacetCatalog::from_config(&config.filters));
        let mut broadcaster = FilterBroadcaster::new(store, Box::new(BrowserHistory))
            .with_continuous_debounce(config.filters.continuous_debounce_ms);

        let refetch = Rc::new(RefCell::new(RefetchCoordinator::new()));
        let sink = ResultsSink {
            endpoint: results_endpoint,
            on_results,
            on_error,
        };
        let coordinator = Rc::clone(&refetch);
        broadcaster.subscribe(Box::new(move |event: &FiltersChanged| {
            sink.start(&coordinator, event);
        }));

        Ok(Self {
            broadcaster,
            refetch,
            uis: Vec::new(),
        })
    }

    /// Returns the id the UI passes back with its changes.
    ///
    /// `applyState` runs while the controller is mid-update and must not call
    /// back into it synchronously (wasm-bindgen aborts on the re-entrant
    /// borrow). Defer any follow-up edit with `queueMicrotask` or `setTimeout`.
    #[wasm_bindgen(js_name = registerUi)]
    pub fn register_ui(&mut self, apply_state: Function) -> usize {
        let id = self.broadcaster.register(Box::new(JsUi { apply_state }));
        self.uis.push(id);
        id.index()
    }

    #[wasm_bindgen(js_name = unregisterUi)]
    pub fn unregister_ui(&mut self, id: usize) -> bool {
        let Ok(ui) = self.ui(id) else {
            return false;
        };
        self.uis.retain(|known| *known != ui);
        self.broadcaster.unregister(ui)
    }

    /// Load the initial state from `query` and render it into every UI.
    /// Returns the state as JSON.
    pub fn hydrate(&mut self, query: &str) -> Result<String, JsError> {
        let state = self.broadcaster.hydrate(query);
        serde_json::to_string(&*state).map_err(to_js_error)
    }

    /// [`hydrate`](Self::hydrate) from `location.search`.
    #[wasm_bindgen(js_name = hydrateFromLocation)]
    pub fn hydrate_from_location(&mut self) -> Result<String, JsError> {
        let search = web_sys::window()
            .ok_or_else(|| JsError::new("no window"))?
            .location()
            .search()
            .map_err(|e| JsError::new(&describe(&e)))?;
        self.hydrate(&search)
    }

    /// A discrete edit from UI `source`. Returns whether anything changed.
    #[wasm_bindgen(js_name = onUserChange)]
    pub fn on_user_change(&mut self, request_json: &str, source: usize) -> Result<bool, JsError> {
        let change = decode(request_json)?;
        let source = self.ui(source)?;
        let event = self
            .broadcaster
            .on_user_change(change, source)
            .map_err(to_js_error)?;
        Ok(event.is_some())
    }

    /// A slider-style edit. Schedule `flush` at `flushDeadline()`.
    #[wasm_bindgen(js_name = onContinuousChange)]
    pub fn on_continuous_change(
        &mut self,
        request_json: &str,
        source: usize,
        now_ms: f64,
    ) -> Result<(), JsError> {
        let change = decode(request_json)?;
        let source = self.ui(source)?;
        self.broadcaster
            .on_continuous_change(change, source, now_ms)
            .map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = flushDeadline)]
    pub fn flush_deadline(&self) -> Option<f64> {
        self.broadcaster.flush_deadline()
    }

    pub fn flush(&mut self, now_ms: f64) -> bool {
        self.broadcaster.flush(now_ms).is_some()
    }

    /// Clear every filter in every UI, then call `after` (e.g. close the drawer).
    #[wasm_bindgen(js_name = clearAll)]
    pub fn clear_all(&mut self, after: Option<Function>) {
        self.broadcaster.clear_all_then(|state| {
            let Some(after) = after else {
                return;
            };
            let delivered = serde_json::to_string(state)
                .map_err(|e| CallbackError::new(e.to_string()))
                .and_then(|json| call1(&after, &JsValue::from_str(&json)));
            if let Err(err) = delivered {
                log::warn!("[filters] clear-all follow-up failed: {err}");
            }
        });
    }

    /// Drop any in-flight results fetch, e.g. on `pagehide`.
    #[wasm_bindgen(js_name = cancelFetches)]
    pub fn cancel_fetches(&self) {
        self.refetch.borrow_mut().cancel();
    }

    #[wasm_bindgen(getter)]
    pub fn query(&self) -> String {
        self.broadcaster.query()
    }

    #[wasm_bindgen(getter)]
    pub fn state(&self) -> Result<String, JsError> {
        serde_json::to_string(&*self.broadcaster.current()).map_err(to_js_error)
    }

    #[wasm_bindgen(getter, js_name = activeCount)]
    pub fn active_count(&self) -> usize {
        self.broadcaster.current().active_count()
    }
}

impl FilterController {
    fn ui(&self, index: usize) -> Result<UiId, JsError> {
        self.uis
            .iter()
            .copied()
            .find(|id| id.index() == index)
            .ok_or_else(|| JsError::new(&format!("unknown filter UI {index}")))
    }
}

fn decode(request_json: &str) -> Result<FilterChange, JsError> {
    let request: FilterChangeRequest = serde_json::from_str(request_json).map_err(to_js_error)?;
    FilterChange::try_from(&request).map_err(to_js_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_joins_path() {
        assert_eq!(with_query("/collections/dice", ""), "/collections/dice");
        assert_eq!(
            with_query("/collections/dice", "filter.v.availability=1"),
            "/collections/dice?filter.v.availability=1"
        );
        assert_eq!(
            with_query("/collections/dice?section_id=grid", "sort_by=price-ascending"),
            "/collections/dice?section_id=grid&sort_by=price-ascending"
        );
    }
}
