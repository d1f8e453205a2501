//! The wire protocol and main-process client of the similarity sidecar's
//! stdio IPC channel (spec §4.9): length-delimited `bincode` frames,
//! request/response correlation by id, a client-side timeout. The worker
//! binary (`apps/hof-similarity-worker`) uses [`frame`] directly to read
//! [`protocol::Request`]s and write [`protocol::Response`]s over its own
//! stdin/stdout.

pub mod client;
pub mod errors;
pub mod frame;
pub mod protocol;

pub use client::{WorkerChannel, REQUEST_TIMEOUT};
pub use errors::TransportError;
pub use protocol::{Request, Response, ResponsePayload};
