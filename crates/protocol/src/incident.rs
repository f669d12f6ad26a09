use serde::{Deserialize, Serialize};

use crate::chrome::ChromeState;

/// Which half of a transition callback pair was running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackPhase {
    Exit,
    Enter,
}

/// Conditions that are recovered where they occur and only reported.
///
/// None of these abort the operation that produced them. Only
/// [`Incident::RefetchFailed`] is meant to reach the shopper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Incident {
    /// A query parameter did not match any recognised filter shape and was dropped.
    MalformedQueryIgnored { key: String, value: String },
    /// A registered filter UI failed to render a propagated state.
    UiPropagationFailure { ui: usize, message: String },
    /// A chrome presentation callback failed after the state had changed.
    ChromeCallbackFailed {
        state: ChromeState,
        phase: CallbackPhase,
        message: String,
    },
    /// A results fetch resolved after a newer one superseded it.
    StaleFetchDiscarded { generation: u64, latest: u64 },
    /// The results fetch for the current state failed.
    RefetchFailed { generation: u64, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl Incident {
    pub fn severity(&self) -> Severity {
        match self {
            Self::MalformedQueryIgnored { .. } => Severity::Debug,
            Self::StaleFetchDiscarded { .. } => Severity::Info,
            Self::UiPropagationFailure { .. } | Self::ChromeCallbackFailed { .. } => {
                Severity::Warn
            }
            Self::RefetchFailed { .. } => Severity::Error,
        }
    }

    /// Whether the shopper should see an inline message for this incident.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, Self::RefetchFailed { .. })
    }
}

impl std::fmt::Display for Incident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedQueryIgnored { key, value } => {
                write!(f, "ignored query parameter {key}={value}")
            }
            Self::UiPropagationFailure { ui, message } => {
                write!(f, "filter ui #{ui} failed to apply state: {message}")
            }
            Self::ChromeCallbackFailed {
                state,
                phase,
                message,
            } => {
                let phase = match phase {
                    CallbackPhase::Exit => "exit",
                    CallbackPhase::Enter => "enter",
                };
                write!(f, "{phase} callback for {state} failed: {message}")
            }
            Self::StaleFetchDiscarded { generation, latest } => {
                write!(f, "discarded results for generation {generation} (latest is {latest})")
            }
            Self::RefetchFailed { generation, message } => {
                write!(f, "results fetch for generation {generation} failed: {message}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_refetch_failure_is_user_visible() {
        let stale = Incident::StaleFetchDiscarded {
            generation: 1,
            latest: 2,
        };
        let failed = Incident::RefetchFailed {
            generation: 2,
            message: "503".into(),
        };
        assert!(!stale.is_user_visible());
        assert!(failed.is_user_visible());
        assert!(stale.severity() < failed.severity());
    }

    #[test]
    fn stale_is_not_alarmed() {
        let stale = Incident::StaleFetchDiscarded {
            generation: 3,
            latest: 4,
        };
        assert_eq!(stale.severity(), Severity::Info);
        assert_eq!(
            stale.to_string(),
            "discarded results for generation 3 (latest is 4)"
        );
    }

    #[test]
    fn serializes_with_type_tag() {
        let incident = Incident::MalformedQueryIgnored {
            key: "filter.v.price.gte".into(),
            value: "cheap".into(),
        };
        let json = serde_json::to_string(&incident).unwrap_or_default();
        assert!(json.contains("\"type\":\"malformedQueryIgnored\""));
    }
}
