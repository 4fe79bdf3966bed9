// Detection pipeline — the two paths every post event takes.
//
// dispatcher: term match → bypass/ignore checks → classifier → dispatch table.
// aggregator: per-window duplicate grouping → spam labels → escalation.
// runtime ties them to the event source and the window timer.

pub mod aggregator;
pub mod dispatcher;
pub mod ingest;
pub mod models;
pub mod runtime;

pub use aggregator::{AggregatorThresholds, DuplicateAggregator, RunOutcome, WindowReport};
pub use dispatcher::{BypassList, ClassificationDispatcher, DispatchOutcome};
pub use models::PostEvent;
pub use runtime::{Pipeline, RunSummary, MAX_IN_FLIGHT_DISPATCHES};
