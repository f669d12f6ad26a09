use facetbar_protocol::{ChromeState, FilterElementDescriptor, ScrollDirection, ScrollSample};

use crate::config::Thresholds;

/// Decide which chrome state a scroll sample calls for.
///
/// Rules are checked in priority order and the first match wins:
///
/// 1. At or above the top (`offset <= show_below`): `Full`.
/// 2. A prominent filter element while inside `filter_zone`: `Filters`.
/// 3. Scrolling up from a hidden-header state: `NavOnly` while still at or
///    beyond `reveal_above`, `Full` once back under `hide_above`.
/// 4. Beyond `hide_above`: `NavOnly`.
/// 5. Otherwise keep `previous` (dead zone between show and hide).
///
/// Pure and total. Callers clamp negative offsets to zero beforehand.
pub fn classify(
    sample: &ScrollSample,
    previous: ChromeState,
    filter_elements: &[FilterElementDescriptor],
    thresholds: &Thresholds,
) -> ChromeState {
    let offset = sample.offset;

    if offset <= thresholds.show_below {
        return ChromeState::Full;
    }

    if thresholds.filter_zone.contains(offset)
        && any_prominent(filter_elements, sample.viewport_height, thresholds)
    {
        return ChromeState::Filters;
    }

    if sample.direction == ScrollDirection::Up && previous != ChromeState::Full {
        if offset >= thresholds.reveal_above {
            return ChromeState::NavOnly;
        }
        if offset < thresholds.hide_above {
            return ChromeState::Full;
        }
    }

    if offset >= thresholds.hide_above {
        return ChromeState::NavOnly;
    }

    previous
}

/// Whether any element overlaps the visible band of the viewport.
pub fn any_prominent(
    filter_elements: &[FilterElementDescriptor],
    viewport_height: f64,
    thresholds: &Thresholds,
) -> bool {
    let band = thresholds.prominence.band(viewport_height);
    if band.is_empty() {
        return false;
    }
    filter_elements
        .iter()
        .any(|element| !element.bounds.is_empty() && element.bounds.overlaps(&band))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProminenceBand;
    use facetbar_protocol::OffsetRange;
    use proptest::prelude::*;

    fn thresholds() -> Thresholds {
        Thresholds {
            show_below: 20.0,
            hide_above: 40.0,
            filter_zone: OffsetRange::new(30.0, 200.0),
            reveal_above: 120.0,
            prominence: ProminenceBand::default(),
        }
    }

    fn sample(offset: f64, direction: ScrollDirection) -> ScrollSample {
        ScrollSample {
            offset,
            direction,
            timestamp_ms: 0.0,
            viewport_height: 800.0,
        }
    }

    fn visible_sidebar() -> Vec<FilterElementDescriptor> {
        vec![FilterElementDescriptor::new("sidebar", 100.0, 400.0)]
    }

    #[test]
    fn show_threshold_is_inclusive() {
        let t = thresholds();
        let s = sample(20.0, ScrollDirection::Down);
        assert_eq!(classify(&s, ChromeState::NavOnly, &[], &t), ChromeState::Full);

        let s = sample(21.0, ScrollDirection::Down);
        assert_eq!(classify(&s, ChromeState::NavOnly, &[], &t), ChromeState::NavOnly);
    }

    #[test]
    fn prominent_filters_force_filters_state() {
        let t = thresholds();
        let s = sample(50.0, ScrollDirection::Down);
        for previous in ChromeState::ALL {
            assert_eq!(
                classify(&s, previous, &visible_sidebar(), &t),
                ChromeState::Filters
            );
        }
    }

    #[test]
    fn filters_outside_zone_do_not_count() {
        let t = thresholds();
        let s = sample(250.0, ScrollDirection::Down);
        assert_eq!(
            classify(&s, ChromeState::Full, &visible_sidebar(), &t),
            ChromeState::NavOnly
        );
    }

    #[test]
    fn offscreen_filters_are_not_prominent() {
        let t = thresholds();
        let below_fold = vec![FilterElementDescriptor::new("sidebar", 900.0, 1200.0)];
        let above = vec![FilterElementDescriptor::new("drawer", -400.0, -1.0)];
        let s = sample(50.0, ScrollDirection::Down);
        assert_eq!(classify(&s, ChromeState::Full, &below_fold, &t), ChromeState::NavOnly);
        assert_eq!(classify(&s, ChromeState::Full, &above, &t), ChromeState::NavOnly);
    }

    #[test]
    fn margins_shrink_the_band() {
        let mut t = thresholds();
        t.prominence = ProminenceBand {
            top_margin: 80.0,
            bottom_margin: 0.0,
        };
        let under_header = vec![FilterElementDescriptor::new("bar", 10.0, 60.0)];
        let s = sample(50.0, ScrollDirection::Down);
        assert_eq!(classify(&s, ChromeState::Full, &under_header, &t), ChromeState::NavOnly);
    }

    #[test]
    fn scrolling_up_deep_keeps_nav_only() {
        let t = thresholds();
        let s = sample(500.0, ScrollDirection::Up);
        assert_eq!(classify(&s, ChromeState::NavOnly, &[], &t), ChromeState::NavOnly);
        assert_eq!(classify(&s, ChromeState::Filters, &[], &t), ChromeState::NavOnly);
    }

    #[test]
    fn scrolling_up_under_hide_reveals_header() {
        let t = thresholds();
        let s = sample(35.0, ScrollDirection::Up);
        assert_eq!(classify(&s, ChromeState::NavOnly, &[], &t), ChromeState::Full);
    }

    #[test]
    fn dead_zone_keeps_previous() {
        let t = thresholds();
        let s = sample(30.0, ScrollDirection::Down);
        assert_eq!(classify(&s, ChromeState::Full, &[], &t), ChromeState::Full);
        assert_eq!(classify(&s, ChromeState::NavOnly, &[], &t), ChromeState::NavOnly);
    }

    fn arb_direction() -> impl Strategy<Value = ScrollDirection> {
        prop_oneof![Just(ScrollDirection::Up), Just(ScrollDirection::Down)]
    }

    fn arb_state() -> impl Strategy<Value = ChromeState> {
        prop_oneof![
            Just(ChromeState::Full),
            Just(ChromeState::NavOnly),
            Just(ChromeState::Filters)
        ]
    }

    proptest! {
        #[test]
        fn classify_is_deterministic(
            offset in 0.0f64..5_000.0,
            direction in arb_direction(),
            previous in arb_state(),
            top in -1_000.0f64..1_000.0,
            height in 0.0f64..600.0,
        ) {
            let t = thresholds();
            let s = sample(offset, direction);
            let elements = vec![FilterElementDescriptor::new("f", top, top + height)];
            let first = classify(&s, previous, &elements, &t);
            let second = classify(&s, previous, &elements, &t);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn small_oscillation_never_reveals_header(
            base in 40.0f64..2_000.0,
            wiggles in proptest::collection::vec(-119.0f64..119.0, 1..40),
        ) {
            let t = thresholds();
            let mut state = ChromeState::NavOnly;
            let mut last = base;
            for w in wiggles {
                let offset = (base + w).max(t.hide_above);
                let Some(direction) = ScrollDirection::between(last, offset) else {
                    continue;
                };
                state = classify(&sample(offset, direction), state, &[], &t);
                prop_assert_ne!(state, ChromeState::Full);
                last = offset;
            }
        }
    }
}
