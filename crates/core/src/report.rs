//! Incident reporting and the error types that collaborators hand back.

use std::cell::RefCell;
use std::rc::Rc;

use facetbar_protocol::{Incident, Severity};
use thiserror::Error;

/// A presentation or filter-UI callback failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CallbackError(pub String);

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The results collaborator could not produce a fragment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct FetchError(pub String);

/// Receives incidents from the components that recover from them.
pub trait Reporter {
    fn report(&self, incident: &Incident);
}

/// Routes each incident to the `log` macro matching its severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, incident: &Incident) {
        let tag = component_tag(incident);
        match incident.severity() {
            Severity::Debug => log::debug!("[{tag}] {incident}"),
            Severity::Info => log::info!("[{tag}] {incident}"),
            Severity::Warn => log::warn!("[{tag}] {incident}"),
            Severity::Error => log::error!("[{tag}] {incident}"),
        }
    }
}

fn component_tag(incident: &Incident) -> &'static str {
    match incident {
        Incident::ChromeCallbackFailed { .. } => "chrome",
        Incident::MalformedQueryIgnored { .. } | Incident::UiPropagationFailure { .. } => "filters",
        Incident::StaleFetchDiscarded { .. } | Incident::RefetchFailed { .. } => "refetch",
    }
}

impl<R: Reporter + ?Sized> Reporter for Rc<R> {
    fn report(&self, incident: &Incident) {
        (**self).report(incident);
    }
}

/// Keeps every incident it sees. Handy for tests and for the bridge,
/// which drains it to surface `RefetchFailed` to the page.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    incidents: RefCell<Vec<Incident>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Incident> {
        std::mem::take(&mut *self.incidents.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.incidents.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.borrow().is_empty()
    }
}

impl Reporter for CollectingReporter {
    fn report(&self, incident: &Incident) {
        LogReporter.report(incident);
        self.incidents.borrow_mut().push(incident.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_reporter_drains() {
        let reporter = CollectingReporter::new();
        reporter.report(&Incident::StaleFetchDiscarded {
            generation: 1,
            latest: 2,
        });
        assert_eq!(reporter.len(), 1);
        let drained = reporter.take();
        assert_eq!(drained.len(), 1);
        assert!(reporter.is_empty());
    }

    #[test]
    fn shared_reporter_forwards() {
        let reporter = Rc::new(CollectingReporter::new());
        let shared: Rc<CollectingReporter> = Rc::clone(&reporter);
        shared.report(&Incident::RefetchFailed {
            generation: 7,
            message: "timeout".into(),
        });
        assert_eq!(reporter.len(), 1);
    }

    #[test]
    fn callback_error_displays_message() {
        assert_eq!(CallbackError::new("stale node").to_string(), "stale node");
    }
}
