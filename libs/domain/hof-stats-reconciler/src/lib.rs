//! The stats reconciler (C8): a dirty set drained every five minutes, a
//! daily full-table reconciliation, and an hourly per-day-average
//! recomputation, all built on the same raw-aggregation primitive of C1.

pub mod averages;
pub mod dirty;
pub mod reconciler;

pub use averages::PerDayAverages;
pub use dirty::DirtySet;
pub use reconciler::StatsReconciler;
