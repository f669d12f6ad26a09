use std::rc::Rc;
use std::sync::Arc;

use facetbar_protocol::Incident;

use super::change::{FilterChange, FilterError};
use super::query;
use super::state::{FilterState, Snapshot};
use super::store::FilterStore;
use crate::report::{CallbackError, LogReporter, Reporter};

/// A filter UI that renders a propagated state (desktop sidebar, mobile drawer…).
pub trait FilterUi {
    fn apply_state(&mut self, state: &FilterState) -> Result<(), CallbackError>;
}

/// The page URL. In-place edits replace the entry; clears push a new one.
pub trait HistorySink {
    fn replace_query(&mut self, query: &str) -> Result<(), CallbackError>;
    fn push_query(&mut self, query: &str) -> Result<(), CallbackError>;
}

/// Consumer of `filtersChanged`, typically the results-refetch adapter.
pub trait FiltersChangedListener {
    fn filters_changed(&mut self, event: &FiltersChanged);
}

impl<F: FnMut(&FiltersChanged)> FiltersChangedListener for F {
    fn filters_changed(&mut self, event: &FiltersChanged) {
        self(event);
    }
}

/// Emitted once per logical change.
#[derive(Debug, Clone, PartialEq)]
pub struct FiltersChanged {
    /// Increases by one with every emitted event.
    pub generation: u64,
    pub state: Snapshot,
    pub query: String,
}

/// Handle returned by [`FilterBroadcaster::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UiId(usize);

impl UiId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum HistoryMode {
    Replace,
    Push,
}

struct PendingChange {
    change: FilterChange,
    source: UiId,
}

/// Keeps every registered filter UI, the store and the URL consistent,
/// and emits one [`FiltersChanged`] per logical change.
///
/// Discrete inputs (checkboxes, pills) apply immediately. Continuous
/// inputs (price sliders) are coalesced per param until they have been
/// quiet for `continuous_debounce_ms`; any later discrete change or clear
/// first commits them so changes are never applied out of arrival order.
pub struct FilterBroadcaster {
    store: FilterStore,
    uis: Vec<(UiId, Box<dyn FilterUi>)>,
    history: Box<dyn HistorySink>,
    listeners: Vec<Box<dyn FiltersChangedListener>>,
    reporter: Rc<dyn Reporter>,
    next_ui: usize,
    generation: u64,
    pending: Vec<PendingChange>,
    last_continuous_ms: f64,
    continuous_debounce_ms: f64,
}

impl FilterBroadcaster {
    pub fn new(store: FilterStore, history: Box<dyn HistorySink>) -> Self {
        Self {
            store,
            uis: Vec::new(),
            history,
            listeners: Vec::new(),
            reporter: Rc::new(LogReporter),
            next_ui: 0,
            generation: 0,
            pending: Vec::new(),
            last_continuous_ms: 0.0,
            continuous_debounce_ms: 250.0,
        }
    }

    pub fn with_reporter(mut self, reporter: Rc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_continuous_debounce(mut self, ms: f64) -> Self {
        self.continuous_debounce_ms = ms.max(0.0);
        self
    }

    pub fn register(&mut self, ui: Box<dyn FilterUi>) -> UiId {
        let id = UiId(self.next_ui);
        self.next_ui += 1;
        self.uis.push((id, ui));
        id
    }

    /// Drop a UI whose DOM has gone away. Returns whether it was registered.
    pub fn unregister(&mut self, id: UiId) -> bool {
        let before = self.uis.len();
        self.uis.retain(|(ui, _)| *ui != id);
        self.pending.retain(|p| p.source != id);
        self.uis.len() != before
    }

    pub fn subscribe(&mut self, listener: Box<dyn FiltersChangedListener>) {
        self.listeners.push(listener);
    }

    pub fn current(&self) -> Snapshot {
        self.store.current()
    }

    pub fn query(&self) -> String {
        self.store.to_query()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn store(&self) -> &FilterStore {
        &self.store
    }

    /// Load the page's initial state and render it into every UI.
    /// No history entry is written and no event is emitted.
    /// Held slider changes belong to the state being replaced and are dropped.
    pub fn hydrate(&mut self, query: &str) -> Snapshot {
        self.pending.clear();
        let state = self.store.hydrate_from_query(query);
        self.propagate(&state, |_| true);
        state
    }

    /// A discrete change reported by `source`, which has already updated
    /// itself. Returns the emitted event, or `None` if nothing changed.
    pub fn on_user_change(
        &mut self,
        change: FilterChange,
        source: UiId,
    ) -> Result<Option<FiltersChanged>, FilterError> {
        change.validate(self.store.catalog())?;
        self.pending.push(PendingChange { change, source });
        Ok(self.commit_pending())
    }

    /// A change from a continuous control. Held until [`flush`](Self::flush)
    /// finds the input quiet; a newer change to the same param from the same
    /// source replaces the held one.
    pub fn on_continuous_change(
        &mut self,
        change: FilterChange,
        source: UiId,
        now_ms: f64,
    ) -> Result<(), FilterError> {
        change.validate(self.store.catalog())?;
        let param = change.param().map(str::to_owned);
        self.pending
            .retain(|p| !(p.source == source && p.change.param() == param.as_deref()));
        self.pending.push(PendingChange { change, source });
        self.last_continuous_ms = now_ms;
        Ok(())
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Earliest time at which held continuous changes may be committed.
    pub fn flush_deadline(&self) -> Option<f64> {
        self.has_pending()
            .then_some(self.last_continuous_ms + self.continuous_debounce_ms)
    }

    /// Commit held continuous changes once the input has been quiet.
    pub fn flush(&mut self, now_ms: f64) -> Option<FiltersChanged> {
        let deadline = self.flush_deadline()?;
        if now_ms < deadline {
            return None;
        }
        self.commit_pending()
    }

    /// Clear every filter, render the empty state into every UI (the one
    /// that asked included), push a history entry and emit one event.
    pub fn clear_all(&mut self) -> FiltersChanged {
        self.clear_all_then(|_| {})
    }

    /// [`clear_all`](Self::clear_all), then run a UI-specific follow-up
    /// such as closing the mobile drawer.
    pub fn clear_all_then(&mut self, after: impl FnOnce(&FilterState)) -> FiltersChanged {
        self.pending.clear();
        let state = self.store.clear();
        self.propagate(&state, |_| true);
        let event = self.publish(state, HistoryMode::Push);
        after(&event.state);
        event
    }

    /// Apply every held change in arrival order and render the result.
    ///
    /// A UI is skipped only when it is the sole source of the batch, since
    /// it has already shown all of its own edits. With several sources each
    /// one is missing the others' edits, so everyone is rendered. A batch of
    /// several changes that nets out emits nothing but still re-renders its
    /// sources, whose optimistic edits were overridden.
    fn commit_pending(&mut self) -> Option<FiltersChanged> {
        let before = self.store.current();
        let mut sources: Vec<UiId> = Vec::new();
        let mut applied = 0;
        for PendingChange { change, source } in std::mem::take(&mut self.pending) {
            // Validated on entry, and validity does not depend on state.
            if let Err(err) = self.store.apply(&change) {
                log::warn!("[filters] dropped change {change:?}: {err}");
                continue;
            }
            applied += 1;
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
        let after = self.store.current();
        // A burst can net out to the state it started from.
        if Arc::ptr_eq(&before, &after) || *before == *after {
            if applied > 1 {
                self.propagate(&after, |id| sources.contains(&id));
            }
            return None;
        }
        let sole_source = match sources.as_slice() {
            [only] => Some(*only),
            _ => None,
        };
        self.propagate(&after, |id| Some(id) != sole_source);
        Some(self.publish(after, HistoryMode::Replace))
    }

    fn propagate(&mut self, state: &FilterState, include: impl Fn(UiId) -> bool) {
        for (id, ui) in &mut self.uis {
            if !include(*id) {
                continue;
            }
            if let Err(err) = ui.apply_state(state) {
                self.reporter.report(&Incident::UiPropagationFailure {
                    ui: id.index(),
                    message: err.to_string(),
                });
            }
        }
    }

    fn publish(&mut self, state: Snapshot, mode: HistoryMode) -> FiltersChanged {
        let query = query::to_query(&state);
        let written = match mode {
            HistoryMode::Replace => self.history.replace_query(&query),
            HistoryMode::Push => self.history.push_query(&query),
        };
        if let Err(err) = written {
            log::warn!("[filters] could not update URL to {query:?}: {err}");
        }

        self.generation += 1;
        let event = FiltersChanged {
            generation: self.generation,
            state,
            query,
        };
        log::debug!(
            "[filters] generation {} ({} active): {}",
            event.generation,
            event.state.active_count(),
            event.query
        );
        for listener in &mut self.listeners {
            listener.filters_changed(&event);
        }
        event
    }
}
