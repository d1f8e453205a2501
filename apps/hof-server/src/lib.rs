//! Composition root for the Hall of Fame backend (spec §1): wires C1–C10
//! into one [`state::AppState`] and runs the §4.8 scheduled reconciliation
//! jobs. Deliberately does not include an HTTP router — that, the
//! mod-catalog sync, and the Cities Collective sync are excluded external
//! collaborators (spec §1) that would be built as their own crate against
//! this one's public surface.

pub mod blob_client;
pub mod crons;
pub mod state;

pub use state::AppState;
