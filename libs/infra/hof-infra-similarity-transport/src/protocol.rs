//! The request/response envelope of spec §4.9's sidecar IPC channel.

use serde::{Deserialize, Serialize};

/// One inference request: a correlation id and the raw bytes of each image
/// to embed in this batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub images_data: Vec<Vec<u8>>,
}

/// The worker's reply: either one 1280-float vector per input image, in
/// input order, or an error description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    pub payload: ResponsePayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResponsePayload {
    Ok(Vec<Vec<f32>>),
    Err(String),
}
