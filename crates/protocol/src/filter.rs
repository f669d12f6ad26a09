use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The three filter shapes the storefront search runtime understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Multi-select values: `filter.<param>=<value>`, repeatable.
    List,
    /// Numeric bounds: `filter.<param>.gte=<min>` / `filter.<param>.lte=<max>`.
    Range,
    /// Present or absent: `filter.<param>=1`.
    Boolean,
}

impl FilterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Range => "range",
            Self::Boolean => "boolean",
        }
    }

    /// Parse a kind name as sent by a UI handle. Case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "list" => Some(Self::List),
            "range" => Some(Self::Range),
            "boolean" | "bool" => Some(Self::Boolean),
            _ => None,
        }
    }
}

impl std::fmt::Display for FilterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated range bound: a finite, non-negative decimal.
///
/// Kept in its textual form so that `12.50` survives a URL round trip as
/// `12.50` rather than `12.5`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RangeBound(String);

impl RangeBound {
    pub fn parse(raw: &str) -> Option<Self> {
        let text = raw.trim();
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
            return None;
        }
        let value: f64 = text.parse().ok()?;
        (value.is_finite() && value >= 0.0).then(|| Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn value(&self) -> f64 {
        self.0.parse().unwrap_or(0.0)
    }
}

impl std::fmt::Display for RangeBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for RangeBound {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RangeBound {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RangeBound::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid range bound: {s:?}")))
    }
}

/// The value half of a [`FilterSelection`]; its variant determines the kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum FilterValue {
    List(String),
    Range {
        min: Option<RangeBound>,
        max: Option<RangeBound>,
    },
    Boolean,
}

impl FilterValue {
    pub fn kind(&self) -> FilterKind {
        match self {
            Self::List(_) => FilterKind::List,
            Self::Range { .. } => FilterKind::Range,
            Self::Boolean => FilterKind::Boolean,
        }
    }
}

/// One active filter. `(param, value)` pairs are unique within a state;
/// ordering is by `param`, then by value, which is also the order the
/// query string is written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FilterSelection {
    pub param: String,
    pub value: FilterValue,
}

impl FilterSelection {
    pub fn list(param: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            value: FilterValue::List(value.into()),
        }
    }

    pub fn range(
        param: impl Into<String>,
        min: Option<RangeBound>,
        max: Option<RangeBound>,
    ) -> Self {
        Self {
            param: param.into(),
            value: FilterValue::Range { min, max },
        }
    }

    pub fn boolean(param: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            value: FilterValue::Boolean,
        }
    }

    pub fn kind(&self) -> FilterKind {
        self.value.kind()
    }
}

/// Product grid presentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::List => "list",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "grid" => Some(Self::Grid),
            "list" => Some(Self::List),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeOp {
    Add,
    Remove,
    Replace,
    ClearParam,
    SetSort,
    SetView,
}

/// An untyped change as reported by a UI handle across the JS boundary.
///
/// `kind` stays a string here: an unknown kind is a programming error on
/// the sending side and is rejected when the request is decoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterChangeRequest {
    pub op: Option<ChangeOp>,
    #[serde(default)]
    pub param: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub min: Option<String>,
    #[serde(default)]
    pub max: Option<String>,
}
