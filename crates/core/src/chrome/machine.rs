use std::rc::Rc;

use facetbar_protocol::{
    CallbackPhase, ChromeState, FilterElementDescriptor, Incident, ScrollDirection, ScrollSample,
};
use serde::{Deserialize, Serialize};

use super::classify::classify;
use crate::config::{ChromeConfig, Thresholds};
use crate::report::{CallbackError, LogReporter, Reporter};

/// Presentation side of the chrome: toggles classes, never decides state.
pub trait ChromeObserver {
    fn on_exit(&mut self, state: ChromeState) -> Result<(), CallbackError>;
    fn on_enter(&mut self, state: ChromeState) -> Result<(), CallbackError>;
}

/// Supplies the current filter regions and viewport height on demand.
pub trait FilterRegions {
    fn viewport_height(&self) -> f64;
    fn filter_elements(&self) -> Vec<FilterElementDescriptor>;
}

/// A state change that was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: ChromeState,
    pub to: ChromeState,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingScroll {
    offset: f64,
    timestamp_ms: f64,
}

/// Owns the current [`ChromeState`]; the only thing allowed to change it.
///
/// Scroll events are batched: an event arriving within `debounce_ms` of the
/// last processed one is held as pending and replaced by any later event.
/// The host calls [`flush`](Self::flush) when its timer fires so the last
/// position of a burst is always classified.
pub struct ChromeStateMachine<O, F> {
    current: ChromeState,
    config: ChromeConfig,
    observer: O,
    regions: F,
    reporter: Rc<dyn Reporter>,
    /// Offset of the last classified sample; direction is measured from here.
    anchor: Option<f64>,
    last_direction: ScrollDirection,
    last_processed_ms: Option<f64>,
    pending: Option<PendingScroll>,
}

impl<O: ChromeObserver, F: FilterRegions> ChromeStateMachine<O, F> {
    pub fn new(config: ChromeConfig, observer: O, regions: F) -> Self {
        Self {
            current: ChromeState::Full,
            config,
            observer,
            regions,
            reporter: Rc::new(LogReporter),
            anchor: None,
            last_direction: ScrollDirection::Down,
            last_processed_ms: None,
            pending: None,
        }
    }

    pub fn with_reporter(mut self, reporter: Rc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn current(&self) -> ChromeState {
        self.current
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.config.thresholds
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Whether a batched scroll position is waiting for [`flush`](Self::flush).
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Earliest time at which a pending sample may be flushed.
    pub fn flush_deadline(&self) -> Option<f64> {
        self.pending?;
        Some(self.last_processed_ms.unwrap_or(0.0) + self.config.debounce_ms)
    }

    /// Feed a raw scroll offset. Returns the transition if one was applied.
    pub fn on_scroll(&mut self, raw_offset: f64, timestamp_ms: f64) -> Option<Transition> {
        let offset = clamp_offset(raw_offset);
        if let Some(last) = self.last_processed_ms
            && timestamp_ms - last < self.config.debounce_ms
        {
            self.pending = Some(PendingScroll {
                offset,
                timestamp_ms,
            });
            return None;
        }
        self.process(offset, timestamp_ms)
    }

    /// Classify the pending sample if the debounce window has elapsed.
    pub fn flush(&mut self, now_ms: f64) -> Option<Transition> {
        let deadline = self.flush_deadline()?;
        if now_ms < deadline {
            return None;
        }
        let pending = self.pending.take()?;
        self.process(pending.offset, pending.timestamp_ms)
    }

    /// Move to `next`. No-op when already there; otherwise the state is
    /// updated first, then `on_exit(old)` and `on_enter(next)` run in order.
    pub fn transition_to(&mut self, next: ChromeState) -> Option<Transition> {
        if next == self.current {
            return None;
        }
        let from = std::mem::replace(&mut self.current, next);
        log::debug!("[chrome] {from} -> {next}");

        if let Err(err) = self.observer.on_exit(from) {
            self.report_callback(from, CallbackPhase::Exit, &err);
        }
        if let Err(err) = self.observer.on_enter(next) {
            self.report_callback(next, CallbackPhase::Enter, &err);
        }
        Some(Transition { from, to: next })
    }

    /// Return to `Full` and forget scroll history, as on a fresh page.
    pub fn reset(&mut self) -> Option<Transition> {
        self.anchor = None;
        self.pending = None;
        self.last_processed_ms = None;
        self.last_direction = ScrollDirection::Down;
        self.transition_to(ChromeState::Full)
    }

    fn process(&mut self, offset: f64, timestamp_ms: f64) -> Option<Transition> {
        self.last_processed_ms = Some(timestamp_ms);
        self.pending = None;

        let anchor = self.anchor.unwrap_or(0.0);
        let moved = (offset - anchor).abs();
        let at_top = offset <= self.config.thresholds.show_below;
        if self.anchor.is_some() && moved < self.config.min_scroll_delta && !at_top {
            return None;
        }

        let direction = ScrollDirection::between(anchor, offset).unwrap_or(self.last_direction);
        self.anchor = Some(offset);
        self.last_direction = direction;

        let sample = ScrollSample {
            offset,
            direction,
            timestamp_ms,
            viewport_height: self.regions.viewport_height(),
        };
        let elements = self.regions.filter_elements();
        let next = classify(&sample, self.current, &elements, &self.config.thresholds);
        self.transition_to(next)
    }

    fn report_callback(&self, state: ChromeState, phase: CallbackPhase, err: &CallbackError) {
        self.reporter.report(&Incident::ChromeCallbackFailed {
            state,
            phase,
            message: err.to_string(),
        });
    }
}

fn clamp_offset(raw: f64) -> f64 {
    if raw.is_finite() { raw.max(0.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CollectingReporter;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        fail_enter: Option<ChromeState>,
    }

    impl ChromeObserver for Recorder {
        fn on_exit(&mut self, state: ChromeState) -> Result<(), CallbackError> {
            self.calls.push(format!("exit:{state}"));
            Ok(())
        }

        fn on_enter(&mut self, state: ChromeState) -> Result<(), CallbackError> {
            self.calls.push(format!("enter:{state}"));
            if self.fail_enter == Some(state) {
                return Err(CallbackError::new("element detached"));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct Page {
        filters: Vec<FilterElementDescriptor>,
    }

    impl FilterRegions for Page {
        fn viewport_height(&self) -> f64 {
            800.0
        }

        fn filter_elements(&self) -> Vec<FilterElementDescriptor> {
            self.filters.clone()
        }
    }

    fn machine() -> ChromeStateMachine<Recorder, Page> {
        ChromeStateMachine::new(ChromeConfig::default(), Recorder::default(), Page::default())
    }

    #[test]
    fn starts_full() {
        assert_eq!(machine().current(), ChromeState::Full);
    }

    #[test]
    fn transition_fires_exit_then_enter_once() {
        let mut m = machine();
        let t = m.transition_to(ChromeState::NavOnly);
        assert_eq!(
            t,
            Some(Transition {
                from: ChromeState::Full,
                to: ChromeState::NavOnly
            })
        );
        assert_eq!(m.observer().calls, vec!["exit:full", "enter:nav-only"]);
    }

    #[test]
    fn transition_to_same_state_is_idempotent() {
        let mut m = machine();
        assert_eq!(m.transition_to(ChromeState::Full), None);
        assert!(m.observer().calls.is_empty());
    }

    #[test]
    fn failing_callback_still_commits_state() {
        let reporter = Rc::new(CollectingReporter::new());
        let mut m = machine().with_reporter(reporter.clone());
        m.observer_mut().fail_enter = Some(ChromeState::NavOnly);

        assert!(m.transition_to(ChromeState::NavOnly).is_some());
        assert_eq!(m.current(), ChromeState::NavOnly);

        let incidents = reporter.take();
        assert_eq!(incidents.len(), 1);
        assert!(matches!(
            incidents[0],
            Incident::ChromeCallbackFailed {
                state: ChromeState::NavOnly,
                phase: CallbackPhase::Enter,
                ..
            }
        ));

        // Later scroll handling is unaffected.
        assert!(m.on_scroll(0.0, 1_000.0).is_some());
        assert_eq!(m.current(), ChromeState::Full);
    }

    #[test]
    fn scroll_down_hides_header() {
        let mut m = machine();
        m.on_scroll(0.0, 0.0);
        let t = m.on_scroll(300.0, 100.0);
        assert_eq!(t.map(|t| t.to), Some(ChromeState::NavOnly));
    }

    #[test]
    fn events_inside_window_are_batched() {
        let mut m = machine();
        m.on_scroll(0.0, 0.0);
        assert_eq!(m.on_scroll(100.0, 10.0), None);
        assert_eq!(m.on_scroll(200.0, 20.0), None);
        assert!(m.has_pending());
        assert_eq!(m.current(), ChromeState::Full);

        // Timer fires too early.
        assert_eq!(m.flush(25.0), None);
        assert!(m.has_pending());

        let t = m.flush(30.0);
        assert_eq!(t.map(|t| t.to), Some(ChromeState::NavOnly));
        assert!(!m.has_pending());
        assert_eq!(m.observer().calls, vec!["exit:full", "enter:nav-only"]);
    }

    #[test]
    fn flush_deadline_tracks_last_processed() {
        let mut m = machine();
        assert_eq!(m.flush_deadline(), None);
        m.on_scroll(0.0, 100.0);
        m.on_scroll(50.0, 110.0);
        assert_eq!(m.flush_deadline(), Some(130.0));
    }

    #[test]
    fn tiny_movements_are_ignored() {
        let mut m = machine();
        m.on_scroll(300.0, 0.0);
        assert_eq!(m.current(), ChromeState::NavOnly);
        // 2px upward jitter below minScrollDelta.
        assert_eq!(m.on_scroll(298.0, 100.0), None);
        assert_eq!(m.current(), ChromeState::NavOnly);
    }

    #[test]
    fn return_to_top_always_processed() {
        let mut m = machine();
        m.on_scroll(22.0, 0.0);
        m.transition_to(ChromeState::NavOnly);
        assert_eq!(m.on_scroll(20.0, 100.0).map(|t| t.to), Some(ChromeState::Full));
    }

    #[test]
    fn negative_overscroll_clamped() {
        let mut m = machine();
        m.on_scroll(300.0, 0.0);
        assert_eq!(m.on_scroll(-40.0, 100.0).map(|t| t.to), Some(ChromeState::Full));
        assert_eq!(m.on_scroll(f64::NAN, 200.0), None);
    }

    #[test]
    fn prominent_filters_enter_filters_state() {
        let page = Page {
            filters: vec![FilterElementDescriptor::new("facets", 200.0, 500.0)],
        };
        let mut m = ChromeStateMachine::new(ChromeConfig::default(), Recorder::default(), page);
        m.on_scroll(0.0, 0.0);
        assert_eq!(m.on_scroll(60.0, 100.0).map(|t| t.to), Some(ChromeState::Filters));
    }

    #[test]
    fn reset_returns_to_full_and_clears_pending() {
        let mut m = machine();
        m.on_scroll(400.0, 0.0);
        m.on_scroll(800.0, 5.0);
        assert!(m.has_pending());

        let t = m.reset();
        assert_eq!(t.map(|t| t.to), Some(ChromeState::Full));
        assert!(!m.has_pending());
        assert_eq!(m.reset(), None);
    }
}
