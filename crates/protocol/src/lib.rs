pub mod chrome;
pub mod filter;
pub mod incident;
pub mod types;

pub use chrome::{ChromeState, FilterElementDescriptor, ScrollDirection, ScrollSample};
pub use filter::{
    ChangeOp, FilterChangeRequest, FilterKind, FilterSelection, FilterValue, RangeBound, ViewMode,
};
pub use incident::{CallbackPhase, Incident, Severity};
pub use types::OffsetRange;
