//! Length-delimited framing shared by both ends of the sidecar channel: the
//! main process (see [`crate::client::WorkerChannel`]) and the worker
//! binary itself, which frames its own reads/writes with the same codec.

use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

use crate::errors::TransportError;

pub fn reader<R: AsyncRead>(io: R) -> FramedRead<R, LengthDelimitedCodec> {
    FramedRead::new(io, LengthDelimitedCodec::new())
}

pub fn writer<W: AsyncWrite>(io: W) -> FramedWrite<W, LengthDelimitedCodec> {
    FramedWrite::new(io, LengthDelimitedCodec::new())
}

pub fn encode<T: Serialize>(value: &T) -> Result<Bytes, TransportError> {
    Ok(Bytes::from(bincode::serialize(value)?))
}

pub fn decode<T: DeserializeOwned>(bytes: BytesMut) -> Result<T, TransportError> {
    Ok(bincode::deserialize(&bytes)?)
}
