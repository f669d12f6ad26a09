use facetbar_protocol::{
    ChangeOp, FilterChangeRequest, FilterKind, FilterSelection, FilterValue, RangeBound, ViewMode,
};
use thiserror::Error;

use super::state::FacetCatalog;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("unknown filter kind {0:?}")]
    InvalidChangeKind(String),
    #[error("filter change is missing `{field}`")]
    MissingField { field: &'static str },
    #[error("invalid filter param {0:?}")]
    InvalidParam(String),
    #[error("invalid range bound {raw:?} for {param}")]
    InvalidRangeBound { param: String, raw: String },
    #[error("range for {param} has its minimum above its maximum")]
    InvertedRange { param: String },
    #[error("{param} is a {expected} filter, not {found}")]
    KindMismatch {
        param: String,
        expected: FilterKind,
        found: FilterKind,
    },
    #[error("unknown view mode {0:?}")]
    InvalidViewMode(String),
}

/// One instruction against a [`FilterState`](super::FilterState).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterChange {
    /// Activate a selection. A range replaces any range already set on its param.
    Add(FilterSelection),
    /// Deactivate a selection. For ranges, the param's range is removed whatever its bounds.
    Remove(FilterSelection),
    /// Drop every selection on the param, then activate this one.
    Replace(FilterSelection),
    /// Drop every selection on the param.
    ClearParam(String),
    SetSort(Option<String>),
    SetViewMode(ViewMode),
}

impl FilterChange {
    /// The param this change touches, if it is a filter change.
    pub fn param(&self) -> Option<&str> {
        match self {
            Self::Add(sel) | Self::Remove(sel) | Self::Replace(sel) => Some(&sel.param),
            Self::ClearParam(param) => Some(param),
            Self::SetSort(_) | Self::SetViewMode(_) => None,
        }
    }

    /// State-independent checks. A change that passes cannot fail to apply.
    pub fn validate(&self, catalog: &FacetCatalog) -> Result<(), FilterError> {
        match self {
            Self::Add(sel) | Self::Replace(sel) => {
                validate_param(&sel.param)?;
                catalog.check(sel)?;
                match &sel.value {
                    FilterValue::List(value) if value.is_empty() => {
                        Err(FilterError::MissingField { field: "value" })
                    }
                    FilterValue::Range {
                        min: Some(min),
                        max: Some(max),
                    } if min.value() > max.value() => Err(FilterError::InvertedRange {
                        param: sel.param.clone(),
                    }),
                    _ => Ok(()),
                }
            }
            Self::Remove(sel) => validate_param(&sel.param),
            Self::ClearParam(param) => validate_param(param),
            Self::SetSort(_) | Self::SetViewMode(_) => Ok(()),
        }
    }
}

/// Param names become `filter.<param>` keys; a trailing `.gte`/`.lte`
/// would make a list filter read back as a range.
fn validate_param(param: &str) -> Result<(), FilterError> {
    if param.is_empty() || param.ends_with(".gte") || param.ends_with(".lte") {
        return Err(FilterError::InvalidParam(param.to_string()));
    }
    Ok(())
}

impl TryFrom<&FilterChangeRequest> for FilterChange {
    type Error = FilterError;

    fn try_from(req: &FilterChangeRequest) -> Result<Self, Self::Error> {
        let op = req.op.ok_or(FilterError::MissingField { field: "op" })?;
        match op {
            ChangeOp::Add => Ok(Self::Add(selection_from(req)?)),
            ChangeOp::Remove => Ok(Self::Remove(selection_from(req)?)),
            ChangeOp::Replace => Ok(Self::Replace(selection_from(req)?)),
            ChangeOp::ClearParam => Ok(Self::ClearParam(required_param(req)?.to_string())),
            ChangeOp::SetSort => Ok(Self::SetSort(
                req.value.clone().filter(|key| !key.trim().is_empty()),
            )),
            ChangeOp::SetView => {
                let raw = req
                    .value
                    .as_deref()
                    .ok_or(FilterError::MissingField { field: "value" })?;
                ViewMode::parse(raw)
                    .map(Self::SetViewMode)
                    .ok_or_else(|| FilterError::InvalidViewMode(raw.to_string()))
            }
        }
    }
}

fn required_param(req: &FilterChangeRequest) -> Result<&str, FilterError> {
    req.param
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or(FilterError::MissingField { field: "param" })
}

fn selection_from(req: &FilterChangeRequest) -> Result<FilterSelection, FilterError> {
    let param = required_param(req)?;
    let raw_kind = req
        .kind
        .as_deref()
        .ok_or(FilterError::MissingField { field: "kind" })?;
    let kind =
        FilterKind::parse(raw_kind).ok_or_else(|| FilterError::InvalidChangeKind(raw_kind.to_string()))?;

    Ok(match kind {
        FilterKind::List => {
            let value = req
                .value
                .clone()
                .ok_or(FilterError::MissingField { field: "value" })?;
            FilterSelection::list(param, value)
        }
        FilterKind::Range => FilterSelection::range(
            param,
            bound(param, req.min.as_deref())?,
            bound(param, req.max.as_deref())?,
        ),
        FilterKind::Boolean => FilterSelection::boolean(param),
    })
}

/// Empty input means "unbounded"; anything else must be a valid bound.
fn bound(param: &str, raw: Option<&str>) -> Result<Option<RangeBound>, FilterError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => RangeBound::parse(text)
            .map(Some)
            .ok_or_else(|| FilterError::InvalidRangeBound {
                param: param.to_string(),
                raw: text.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(op: ChangeOp, param: &str, kind: &str) -> FilterChangeRequest {
        FilterChangeRequest {
            op: Some(op),
            param: Some(param.into()),
            kind: Some(kind.into()),
            ..FilterChangeRequest::default()
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let req = request(ChangeOp::Add, "p.vendor", "swatch");
        assert_eq!(
            FilterChange::try_from(&req),
            Err(FilterError::InvalidChangeKind("swatch".into()))
        );
    }

    #[test]
    fn list_add_decodes() {
        let mut req = request(ChangeOp::Add, "game_line", "list");
        req.value = Some("cthulhu-wars".into());
        assert_eq!(
            FilterChange::try_from(&req),
            Ok(FilterChange::Add(FilterSelection::list("game_line", "cthulhu-wars")))
        );
    }

    #[test]
    fn list_without_value_is_missing_field() {
        let req = request(ChangeOp::Add, "game_line", "list");
        assert_eq!(
            FilterChange::try_from(&req),
            Err(FilterError::MissingField { field: "value" })
        );
    }

    #[test]
    fn range_with_blank_bound_is_open() {
        let mut req = request(ChangeOp::Replace, "v.price", "range");
        req.min = Some("10".into());
        req.max = Some("  ".into());
        assert_eq!(
            FilterChange::try_from(&req),
            Ok(FilterChange::Replace(FilterSelection::range(
                "v.price",
                RangeBound::parse("10"),
                None
            )))
        );
    }

    #[test]
    fn range_with_garbage_bound_fails() {
        let mut req = request(ChangeOp::Replace, "v.price", "range");
        req.max = Some("lots".into());
        assert!(matches!(
            FilterChange::try_from(&req),
            Err(FilterError::InvalidRangeBound { .. })
        ));
    }

    #[test]
    fn set_view_and_sort() {
        let req = FilterChangeRequest {
            op: Some(ChangeOp::SetView),
            value: Some("list".into()),
            ..FilterChangeRequest::default()
        };
        assert_eq!(
            FilterChange::try_from(&req),
            Ok(FilterChange::SetViewMode(ViewMode::List))
        );

        let req = FilterChangeRequest {
            op: Some(ChangeOp::SetSort),
            value: Some(String::new()),
            ..FilterChangeRequest::default()
        };
        assert_eq!(FilterChange::try_from(&req), Ok(FilterChange::SetSort(None)));
    }

    #[test]
    fn missing_op() {
        let req = FilterChangeRequest::default();
        assert_eq!(
            FilterChange::try_from(&req),
            Err(FilterError::MissingField { field: "op" })
        );
    }

    #[test]
    fn validate_rejects_inverted_range_and_bad_params() {
        let catalog = FacetCatalog::default();
        let inverted = FilterChange::Add(FilterSelection::range(
            "v.price",
            RangeBound::parse("50"),
            RangeBound::parse("10"),
        ));
        assert!(matches!(
            inverted.validate(&catalog),
            Err(FilterError::InvertedRange { .. })
        ));

        let suffixed = FilterChange::Add(FilterSelection::list("price.gte", "x"));
        assert!(matches!(
            suffixed.validate(&catalog),
            Err(FilterError::InvalidParam(_))
        ));
    }

    #[test]
    fn validate_checks_catalog_kind() {
        let catalog = FacetCatalog::new(["v.availability"]);
        let wrong = FilterChange::Add(FilterSelection::list("v.availability", "1"));
        assert_eq!(
            wrong.validate(&catalog),
            Err(FilterError::KindMismatch {
                param: "v.availability".into(),
                expected: FilterKind::Boolean,
                found: FilterKind::List,
            })
        );
        let unknown_bool = FilterChange::Add(FilterSelection::boolean("p.vendor"));
        assert!(unknown_bool.validate(&catalog).is_err());
        // Removing never needs a kind check.
        let remove = FilterChange::Remove(FilterSelection::boolean("p.vendor"));
        assert!(remove.validate(&catalog).is_ok());
    }
}
