//! Conversion between [`FilterState`] and the storefront's query-string shape.
//!
//! ```text
//!   filter.<param>=<value>        list (repeatable)
//!   filter.<param>.gte=<min>      range lower bound
//!   filter.<param>.lte=<max>      range upper bound
//!   filter.<param>=1              boolean (catalog params only)
//!   sort_by=<key>
//!   view=list
//! ```

use std::collections::BTreeMap;

use facetbar_protocol::{FilterSelection, FilterValue, Incident, RangeBound, ViewMode};
use url::form_urlencoded;

use super::state::{FacetCatalog, FilterState};

const FILTER_PREFIX: &str = "filter.";
const SORT_KEY: &str = "sort_by";
const VIEW_KEY: &str = "view";

#[derive(Default)]
struct RangeParts {
    min: Option<RangeBound>,
    max: Option<RangeBound>,
    malformed: bool,
}

/// Parse a query string (with or without the leading `?`).
///
/// Never fails. Parameters outside the `filter.*`, `sort_by` and `view`
/// families are skipped silently; filter-shaped parameters that cannot be
/// read are dropped and returned as [`Incident::MalformedQueryIgnored`].
/// A range with any unreadable bound, or with min above max, is inactive.
pub fn hydrate_from_query(query: &str, catalog: &FacetCatalog) -> (FilterState, Vec<Incident>) {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut state = FilterState::empty();
    let mut ignored = Vec::new();
    let mut ranges: BTreeMap<String, RangeParts> = BTreeMap::new();

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let mut ignore = || {
            ignored.push(Incident::MalformedQueryIgnored {
                key: key.to_string(),
                value: value.to_string(),
            });
        };

        if key == SORT_KEY {
            if value.is_empty() {
                ignore();
            } else {
                state.set_sort_hydrated(value.to_string());
            }
            continue;
        }
        if key == VIEW_KEY {
            match ViewMode::parse(&value) {
                Some(mode) => state.set_view_hydrated(mode),
                None => ignore(),
            }
            continue;
        }
        let Some(rest) = key.strip_prefix(FILTER_PREFIX) else {
            continue;
        };

        if let Some((param, is_min)) = split_range_key(rest) {
            let parts = ranges.entry(param.to_string()).or_default();
            let slot = if is_min { &mut parts.min } else { &mut parts.max };
            match RangeBound::parse(&value) {
                Some(bound) if slot.is_none() => *slot = Some(bound),
                _ => {
                    parts.malformed = true;
                    ignore();
                }
            }
            continue;
        }

        if rest.is_empty() {
            ignore();
        } else if catalog.is_boolean(rest) {
            if value == "1" {
                state.insert_hydrated(FilterSelection::boolean(rest));
            } else {
                ignore();
            }
        } else if value.is_empty() {
            ignore();
        } else {
            state.insert_hydrated(FilterSelection::list(rest, value.to_string()));
        }
    }

    for (param, parts) in ranges {
        if parts.malformed {
            continue;
        }
        if let (Some(min), Some(max)) = (&parts.min, &parts.max)
            && min.value() > max.value()
        {
            ignored.push(Incident::MalformedQueryIgnored {
                key: format!("{FILTER_PREFIX}{param}"),
                value: format!("{min}..{max}"),
            });
            continue;
        }
        state.insert_hydrated(FilterSelection::range(param, parts.min, parts.max));
    }

    (state, ignored)
}

/// `"v.price.gte"` -> `("v.price", true)`.
fn split_range_key(rest: &str) -> Option<(&str, bool)> {
    if let Some(param) = rest.strip_suffix(".gte") {
        return (!param.is_empty()).then_some((param, true));
    }
    if let Some(param) = rest.strip_suffix(".lte") {
        return (!param.is_empty()).then_some((param, false));
    }
    None
}

/// Serialize deterministically: selections by param then value, then
/// `sort_by`, then `view`. The empty state yields `""`.
pub fn to_query(state: &FilterState) -> String {
    let mut out = form_urlencoded::Serializer::new(String::new());
    for sel in state.selections() {
        let key = format!("{FILTER_PREFIX}{}", sel.param);
        match &sel.value {
            FilterValue::List(value) => {
                out.append_pair(&key, value);
            }
            FilterValue::Range { min, max } => {
                if let Some(min) = min {
                    out.append_pair(&format!("{key}.gte"), min.as_str());
                }
                if let Some(max) = max {
                    out.append_pair(&format!("{key}.lte"), max.as_str());
                }
            }
            FilterValue::Boolean => {
                out.append_pair(&key, "1");
            }
        }
    }
    if let Some(sort) = state.sort_key() {
        out.append_pair(SORT_KEY, sort);
    }
    if state.view_mode() != ViewMode::Grid {
        out.append_pair(VIEW_KEY, state.view_mode().as_str());
    }
    out.finish()
}
