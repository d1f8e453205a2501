//! The blob store gateway (C2): upload/download/delete of image blobs with
//! tags, deterministic naming, and public URL construction.

pub mod client;
pub mod errors;
pub mod naming;

pub use client::{BlobStoreGateway, ImageBytes, UploadedNames};
pub use errors::BlobStoreError;
pub use naming::{blob_name, ImageVariant};
