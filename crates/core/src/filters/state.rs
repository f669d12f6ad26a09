use std::collections::BTreeSet;
use std::sync::Arc;

use facetbar_protocol::{FilterKind, FilterSelection, FilterValue, RangeBound, ViewMode};
use serde::{Deserialize, Serialize};

use super::change::{FilterChange, FilterError};
use crate::config::FilterConfig;

/// An immutable, shareable view of the active filters.
///
/// Consumers compare snapshots with [`Arc::ptr_eq`]: a change that leaves
/// the content untouched hands back the same allocation.
pub type Snapshot = Arc<FilterState>;

/// Which params use the Boolean `filter.<param>=1` form.
///
/// Everything else is a List filter, or a Range when it appears with a
/// `.gte`/`.lte` suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetCatalog {
    boolean_params: BTreeSet<String>,
}

impl FacetCatalog {
    pub fn new<I, S>(boolean_params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            boolean_params: boolean_params.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.boolean_params.iter().cloned())
    }

    pub fn is_boolean(&self, param: &str) -> bool {
        self.boolean_params.contains(param)
    }

    /// Reject selections whose kind disagrees with the catalog, so every
    /// state the store can reach reads back identically from its query.
    pub fn check(&self, selection: &FilterSelection) -> Result<(), FilterError> {
        let found = selection.kind();
        let boolean = self.is_boolean(&selection.param);
        match (boolean, found) {
            (true, FilterKind::Boolean) | (false, FilterKind::List | FilterKind::Range) => Ok(()),
            (true, _) => Err(FilterError::KindMismatch {
                param: selection.param.clone(),
                expected: FilterKind::Boolean,
                found,
            }),
            (false, FilterKind::Boolean) => Err(FilterError::KindMismatch {
                param: selection.param.clone(),
                expected: FilterKind::List,
                found,
            }),
        }
    }
}

/// The full active selection plus sort and view mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    selections: BTreeSet<FilterSelection>,
    sort_key: Option<String>,
    view_mode: ViewMode,
}

impl FilterState {
    /// The canonical empty state. Serializes to an empty query.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn selections(&self) -> impl Iterator<Item = &FilterSelection> {
        self.selections.iter()
    }

    pub fn sort_key(&self) -> Option<&str> {
        self.sort_key.as_deref()
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    /// Number of active selections; a range counts once.
    pub fn active_count(&self) -> usize {
        self.selections.len()
    }

    /// No filters, no sort, default view.
    pub fn is_empty(&self) -> bool {
        self.selections.is_empty() && self.sort_key.is_none() && self.view_mode == ViewMode::Grid
    }

    pub fn is_active(&self, selection: &FilterSelection) -> bool {
        self.selections.contains(selection)
    }

    /// Active list values for `param`, in query order.
    pub fn list_values<'a>(&'a self, param: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.for_param(param).filter_map(|sel| match &sel.value {
            FilterValue::List(value) => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn range<'a>(
        &'a self,
        param: &'a str,
    ) -> Option<(Option<&'a RangeBound>, Option<&'a RangeBound>)> {
        self.for_param(param).find_map(|sel| match &sel.value {
            FilterValue::Range { min, max } => Some((min.as_ref(), max.as_ref())),
            _ => None,
        })
    }

    fn for_param<'a>(&'a self, param: &'a str) -> impl Iterator<Item = &'a FilterSelection> + 'a {
        self.selections.iter().filter(move |sel| sel.param == param)
    }

    /// A new state with `change` applied. `self` is never modified.
    pub fn apply(&self, change: &FilterChange, catalog: &FacetCatalog) -> Result<Self, FilterError> {
        change.validate(catalog)?;
        let mut next = self.clone();
        match change {
            FilterChange::Add(sel) => next.activate(sel),
            FilterChange::Remove(sel) => match sel.value {
                FilterValue::Range { .. } => next.drop_ranges(&sel.param),
                _ => {
                    next.selections.remove(sel);
                }
            },
            FilterChange::Replace(sel) => {
                next.drop_param(&sel.param);
                next.activate(sel);
            }
            FilterChange::ClearParam(param) => next.drop_param(param),
            FilterChange::SetSort(key) => {
                next.sort_key = key.clone().filter(|k| !k.is_empty());
            }
            FilterChange::SetViewMode(mode) => next.view_mode = *mode,
        }
        Ok(next)
    }

    fn activate(&mut self, sel: &FilterSelection) {
        if let FilterValue::Range { min, max } = &sel.value {
            self.drop_ranges(&sel.param);
            if min.is_none() && max.is_none() {
                return;
            }
        }
        self.selections.insert(sel.clone());
    }

    fn drop_ranges(&mut self, param: &str) {
        self.selections
            .retain(|s| !(s.param == param && s.kind() == FilterKind::Range));
    }

    fn drop_param(&mut self, param: &str) {
        self.selections.retain(|s| s.param != param);
    }

    pub(crate) fn insert_hydrated(&mut self, sel: FilterSelection) {
        self.selections.insert(sel);
    }

    pub(crate) fn set_sort_hydrated(&mut self, key: String) {
        self.sort_key = Some(key);
    }

    pub(crate) fn set_view_hydrated(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }
}
