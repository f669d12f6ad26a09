//! Filter state, its URL form, and keeping every filter UI in step.

pub mod broadcast;
pub mod change;
pub mod query;
pub mod refetch;
pub mod state;
pub mod store;

pub use broadcast::{
    FilterBroadcaster, FilterUi, FiltersChanged, FiltersChangedListener, HistorySink, UiId,
};
pub use change::{FilterChange, FilterError};
pub use query::{hydrate_from_query, to_query};
pub use refetch::{FetchResolution, FetchTicket, RefetchCoordinator};
pub use state::{FacetCatalog, FilterState, Snapshot};
pub use store::FilterStore;
