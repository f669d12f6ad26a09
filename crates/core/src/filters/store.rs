use std::rc::Rc;
use std::sync::Arc;

use facetbar_protocol::FilterChangeRequest;

use super::change::{FilterChange, FilterError};
use super::query;
use super::state::{FacetCatalog, FilterState, Snapshot};
use crate::report::{LogReporter, Reporter};

/// Single source of truth for the active filters on the current page.
///
/// Holds the latest [`Snapshot`]; every mutation swaps in a new one, so a
/// reader holding an older snapshot always sees a complete state.
pub struct FilterStore {
    catalog: FacetCatalog,
    current: Snapshot,
    reporter: Rc<dyn Reporter>,
}

impl FilterStore {
    pub fn new(catalog: FacetCatalog) -> Self {
        Self {
            catalog,
            current: Arc::new(FilterState::empty()),
            reporter: Rc::new(LogReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Rc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn catalog(&self) -> &FacetCatalog {
        &self.catalog
    }

    pub fn current(&self) -> Snapshot {
        Arc::clone(&self.current)
    }

    /// Replace the current state with one read from `query`. Never fails:
    /// unreadable parameters are reported and dropped.
    pub fn hydrate_from_query(&mut self, query: &str) -> Snapshot {
        let (state, ignored) = query::hydrate_from_query(query, &self.catalog);
        for incident in &ignored {
            self.reporter.report(incident);
        }
        self.replace(state)
    }

    /// Apply one change. When the content is unchanged the current snapshot
    /// is returned as-is.
    pub fn apply(&mut self, change: &FilterChange) -> Result<Snapshot, FilterError> {
        let next = self.current.apply(change, &self.catalog)?;
        Ok(self.replace(next))
    }

    /// Decode an untyped UI change and apply it.
    pub fn apply_request(&mut self, request: &FilterChangeRequest) -> Result<Snapshot, FilterError> {
        let change = FilterChange::try_from(request)?;
        self.apply(&change)
    }

    /// Switch to the canonical empty state.
    pub fn clear(&mut self) -> Snapshot {
        self.replace(FilterState::empty())
    }

    pub fn to_query(&self) -> String {
        query::to_query(&self.current)
    }

    fn replace(&mut self, state: FilterState) -> Snapshot {
        if *self.current != state {
            self.current = Arc::new(state);
        }
        Arc::clone(&self.current)
    }
}
