//! The persistence gateway (C1): typed repositories over a MongoDB-shaped
//! document store, a transaction primitive, a raw-aggregation primitive for
//! the selection/reconciliation pipelines, and a startup connectivity probe.

pub mod aggregation;
pub mod client;
pub mod errors;
pub mod repositories;
pub mod transaction;

pub use aggregation::run_aggregation;
pub use client::MongoGateway;
pub use errors::PersistenceError;
pub use repositories::*;
pub use transaction::with_transaction;
