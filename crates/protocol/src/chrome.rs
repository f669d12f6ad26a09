use serde::{Deserialize, Serialize};

use crate::types::OffsetRange;

/// Visibility state of the page chrome (header, nav bar, filter bar).
///
/// Exactly one state is active at a time. The presentation layer maps each
/// state to a set of CSS classes; nothing here knows about the DOM.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChromeState {
    /// Header and nav visible.
    #[default]
    Full,
    /// Header hidden, nav sticky.
    NavOnly,
    /// Header hidden, nav sticky, filter controls forced into view.
    Filters,
}

impl ChromeState {
    pub const ALL: [ChromeState; 3] = [Self::Full, Self::NavOnly, Self::Filters];

    /// Stable identifier, also used as the CSS modifier suffix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::NavOnly => "nav-only",
            Self::Filters => "filters",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.as_str() == s)
    }

    pub fn header_visible(&self) -> bool {
        matches!(self, Self::Full)
    }
}

impl std::fmt::Display for ChromeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    /// Direction of travel from `from` to `to`, or `None` if they are equal.
    pub fn between(from: f64, to: f64) -> Option<Self> {
        if to > from {
            Some(Self::Down)
        } else if to < from {
            Some(Self::Up)
        } else {
            None
        }
    }
}

/// One debounced scroll observation. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollSample {
    /// Document scroll offset in CSS pixels, already clamped to `>= 0`.
    pub offset: f64,
    pub direction: ScrollDirection,
    pub timestamp_ms: f64,
    /// Height of the visible viewport when the sample was taken.
    pub viewport_height: f64,
}

/// A region of the page that counts as a filter control, with its bounds
/// measured in viewport coordinates (as `getBoundingClientRect` reports them).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterElementDescriptor {
    pub id: String,
    pub bounds: OffsetRange,
}

impl FilterElementDescriptor {
    pub fn new(id: impl Into<String>, top: f64, bottom: f64) -> Self {
        Self {
            id: id.into(),
            bounds: OffsetRange::new(top, bottom),
        }
    }
}
