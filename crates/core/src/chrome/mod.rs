//! Scroll-driven visibility of the header, nav bar and filter bar.

pub mod classify;
pub mod machine;

pub use classify::{any_prominent, classify};
pub use machine::{ChromeObserver, ChromeStateMachine, FilterRegions, Transition};
