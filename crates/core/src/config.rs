//! Runtime configuration, supplied by the theme as a JSON blob.
//!
//! Every field has a default so a theme can override only what it needs.

use std::collections::HashSet;

use facetbar_protocol::OffsetRange;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub chrome: ChromeConfig,
    #[serde(default)]
    pub filters: FilterConfig,
}

/// Offsets (CSS pixels) that drive the scroll classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Thresholds {
    /// At or below this offset the chrome is always `Full`.
    pub show_below: f64,
    /// Above this offset, absent prominent filters, the chrome becomes `NavOnly`.
    pub hide_above: f64,
    /// Offsets in which a prominent filter forces the `Filters` state.
    pub filter_zone: OffsetRange,
    /// Scrolling up at or beyond this offset keeps the nav-only chrome.
    pub reveal_above: f64,
    pub prominence: ProminenceBand,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            show_below: 20.0,
            hide_above: 40.0,
            filter_zone: OffsetRange::new(30.0, 200.0),
            reveal_above: 120.0,
            prominence: ProminenceBand::default(),
        }
    }
}

/// Margins trimmed from the viewport when deciding whether a filter
/// element is prominent. The band is `[top_margin, height - bottom_margin]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProminenceBand {
    pub top_margin: f64,
    pub bottom_margin: f64,
}

impl ProminenceBand {
    pub fn band(&self, viewport_height: f64) -> OffsetRange {
        OffsetRange::new(self.top_margin, viewport_height - self.bottom_margin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChromeConfig {
    pub thresholds: Thresholds,
    /// Scroll events closer together than this are batched.
    pub debounce_ms: f64,
    /// Movement smaller than this (CSS pixels) is not classified.
    pub min_scroll_delta: f64,
}

impl Default for ChromeConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            debounce_ms: 30.0,
            min_scroll_delta: 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterConfig {
    /// Params whose `filter.<param>=1` form means a Boolean filter.
    pub boolean_params: Vec<String>,
    /// Quiet period before a slider-style change is applied.
    pub continuous_debounce_ms: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            boolean_params: vec!["v.availability".to_string()],
            continuous_debounce_ms: 250.0,
        }
    }
}

impl Config {
    /// Parse and validate a JSON config. Unknown keys are logged and skipped.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(content)?;
        for path in unknown_keys(&value) {
            log::warn!("[config] unknown field: {path}");
        }
        let config: Config = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.chrome.thresholds;
        let non_negative = [
            ("chrome.debounceMs", self.chrome.debounce_ms),
            ("chrome.minScrollDelta", self.chrome.min_scroll_delta),
            ("chrome.thresholds.prominence.topMargin", t.prominence.top_margin),
            ("chrome.thresholds.prominence.bottomMargin", t.prominence.bottom_margin),
            ("filters.continuousDebounceMs", self.filters.continuous_debounce_ms),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if t.show_below > t.hide_above {
            return Err(ConfigError::Invalid(format!(
                "showBelow ({}) must not exceed hideAbove ({})",
                t.show_below, t.hide_above
            )));
        }
        if t.filter_zone.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "filterZone start ({}) must not exceed end ({})",
                t.filter_zone.start, t.filter_zone.end
            )));
        }
        Ok(())
    }
}

/// Dotted paths of keys that no config struct declares.
fn unknown_keys(value: &Value) -> Vec<String> {
    let mut unknowns = Vec::new();
    let Value::Object(root) = value else {
        return unknowns;
    };
    for (key, child) in root {
        let expected: &[&str] = match key.as_str() {
            "chrome" => &["thresholds", "debounceMs", "minScrollDelta"],
            "filters" => &["booleanParams", "continuousDebounceMs"],
            _ => {
                unknowns.push(key.clone());
                continue;
            }
        };
        collect_unknown(child, expected, key, &mut unknowns);
        if key == "chrome"
            && let Some(thresholds) = child.get("thresholds")
        {
            collect_unknown(
                thresholds,
                &["showBelow", "hideAbove", "filterZone", "revealAbove", "prominence"],
                "chrome.thresholds",
                &mut unknowns,
            );
            if let Some(band) = thresholds.get("prominence") {
                collect_unknown(
                    band,
                    &["topMargin", "bottomMargin"],
                    "chrome.thresholds.prominence",
                    &mut unknowns,
                );
            }
        }
    }
    unknowns
}

fn collect_unknown(value: &Value, expected: &[&str], prefix: &str, out: &mut Vec<String>) {
    let Value::Object(obj) = value else {
        return;
    };
    let expected: HashSet<&str> = expected.iter().copied().collect();
    out.extend(
        obj.keys()
            .filter(|k| !expected.contains(k.as_str()))
            .map(|k| format!("{prefix}.{k}")),
    );
}
