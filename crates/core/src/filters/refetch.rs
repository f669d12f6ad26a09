use std::rc::Rc;

use facetbar_protocol::Incident;

use super::broadcast::FiltersChanged;
use crate::report::{FetchError, LogReporter, Reporter};

/// Identifies one results fetch. Hand it back to
/// [`RefetchCoordinator::complete`] when the fetch settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub query: String,
}

/// What the caller should do with a settled fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResolution<T> {
    /// Newest fetch succeeded: swap these results in.
    Apply(T),
    /// A newer fetch superseded this one, or the page moved on.
    Discarded,
    /// Newest fetch failed: keep the current results and show `message` inline.
    Failed { message: String },
}

/// Stale-response guard for results fetches.
///
/// Only the most recently started fetch may update the page. Anything that
/// settles after being superseded or cancelled is discarded and reported as
/// [`Incident::StaleFetchDiscarded`].
pub struct RefetchCoordinator {
    /// Generation of the newest fetch still allowed to land.
    active: Option<u64>,
    latest_seen: u64,
    displayed: Option<u64>,
    reporter: Rc<dyn Reporter>,
}

impl Default for RefetchCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RefetchCoordinator {
    pub fn new() -> Self {
        Self {
            active: None,
            latest_seen: 0,
            displayed: None,
            reporter: Rc::new(LogReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Rc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Start the fetch for `event`, superseding whatever is in flight.
    pub fn begin(&mut self, event: &FiltersChanged) -> FetchTicket {
        self.active = Some(event.generation);
        self.latest_seen = self.latest_seen.max(event.generation);
        FetchTicket {
            generation: event.generation,
            query: event.query.clone(),
        }
    }

    /// Settle a fetch started by [`begin`](Self::begin).
    pub fn complete<T>(
        &mut self,
        ticket: &FetchTicket,
        outcome: Result<T, FetchError>,
    ) -> FetchResolution<T> {
        if self.active != Some(ticket.generation) {
            self.reporter.report(&Incident::StaleFetchDiscarded {
                generation: ticket.generation,
                latest: self.latest_seen,
            });
            return FetchResolution::Discarded;
        }
        self.active = None;
        match outcome {
            Ok(results) => {
                self.displayed = Some(ticket.generation);
                FetchResolution::Apply(results)
            }
            Err(err) => {
                self.reporter.report(&Incident::RefetchFailed {
                    generation: ticket.generation,
                    message: err.to_string(),
                });
                FetchResolution::Failed {
                    message: err.to_string(),
                }
            }
        }
    }

    /// Forget every outstanding fetch, e.g. when the shopper leaves the page.
    pub fn cancel(&mut self) {
        if let Some(generation) = self.active.take() {
            log::debug!("[refetch] cancelled generation {generation}");
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.active.is_some()
    }

    /// Generation whose results are currently on the page.
    pub fn displayed_generation(&self) -> Option<u64> {
        self.displayed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::FilterState;
    use crate::report::CollectingReporter;
    use std::sync::Arc;

    fn event(generation: u64, query: &str) -> FiltersChanged {
        FiltersChanged {
            generation,
            state: Arc::new(FilterState::empty()),
            query: query.to_string(),
        }
    }

    #[test]
    fn latest_fetch_applies() {
        let mut c = RefetchCoordinator::new();
        let t = c.begin(&event(1, "filter.p.vendor=Acme"));
        assert!(c.is_in_flight());
        assert_eq!(c.complete(&t, Ok("grid")), FetchResolution::Apply("grid"));
        assert_eq!(c.displayed_generation(), Some(1));
        assert!(!c.is_in_flight());
    }

    #[test]
    fn slow_older_response_is_discarded() {
        let reporter = Rc::new(CollectingReporter::new());
        let mut c = RefetchCoordinator::new().with_reporter(reporter.clone());
        let a = c.begin(&event(1, "a"));
        let b = c.begin(&event(2, "b"));

        assert_eq!(c.complete(&b, Ok("B")), FetchResolution::Apply("B"));
        assert_eq!(c.complete(&a, Ok("A")), FetchResolution::Discarded);
        assert_eq!(c.displayed_generation(), Some(2));
        assert_eq!(
            reporter.take(),
            vec![Incident::StaleFetchDiscarded {
                generation: 1,
                latest: 2
            }]
        );
    }

    #[test]
    fn failure_keeps_current_results() {
        let reporter = Rc::new(CollectingReporter::new());
        let mut c = RefetchCoordinator::new().with_reporter(reporter.clone());
        let first = c.begin(&event(1, "a"));
        c.complete(&first, Ok(()));
        let second = c.begin(&event(2, "b"));
        let res: FetchResolution<()> = c.complete(&second, Err(FetchError("HTTP 503".into())));
        assert_eq!(
            res,
            FetchResolution::Failed {
                message: "HTTP 503".into()
            }
        );
        assert_eq!(c.displayed_generation(), Some(1));
        assert!(reporter.take()[0].is_user_visible());
    }

    #[test]
    fn cancel_discards_in_flight() {
        let mut c = RefetchCoordinator::new();
        let t = c.begin(&event(4, "x"));
        c.cancel();
        assert!(!c.is_in_flight());
        assert_eq!(c.complete(&t, Ok(1)), FetchResolution::Discarded);
        assert_eq!(c.displayed_generation(), None);
    }
}
