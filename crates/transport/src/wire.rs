//! Peer RPC wire format: one request/response pair per call, bincode-encoded
//! and framed behind a 4-byte big-endian length prefix.
//!
//! This is the `streaming` slot repurposed: ring state moves over the wire
//! as RPC calls rather than as a separate synchronization stream, so the
//! "streaming protocol" in this system *is* this frame format.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use corelib::{Id, InsertItem};

use crate::error::{Error, Result};

/// A frame body may not exceed 16 MiB; guards against a corrupt or hostile
/// length prefix driving an unbounded allocation.
const MAX_FRAME_BYTES: u32 = 16 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    FindSuccessor { id: u64 },
    GetPredecessor,
    SetSuccessor { addr: String },
    SetPredecessor { addr: String },
    Notify { addr: String },
    InsertBatch { items: Vec<InsertItem> },
    Query { index: String, query: String },
    Healthz,
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorStatus {
    NotFound,
    AlreadyExists,
    NoPredecessor,
    IdCollision,
    RemoteUnreachable,
    InvalidArgument,
}

impl From<&corelib::Error> for ErrorStatus {
    fn from(e: &corelib::Error) -> Self {
        match e {
            corelib::Error::NotFound => ErrorStatus::NotFound,
            corelib::Error::AlreadyExists => ErrorStatus::AlreadyExists,
            corelib::Error::NoPredecessor => ErrorStatus::NoPredecessor,
            corelib::Error::IdCollision => ErrorStatus::IdCollision,
            corelib::Error::RemoteUnreachable(_) => ErrorStatus::RemoteUnreachable,
            corelib::Error::InvalidArgument(_) => ErrorStatus::InvalidArgument,
        }
    }
}

/// Recovers a typed `corelib::Error` from a status crossing the wire; the
/// message is kept only for the variants that carry one.
pub fn status_to_core_error(status: ErrorStatus, message: String) -> corelib::Error {
    match status {
        ErrorStatus::NotFound => corelib::Error::NotFound,
        ErrorStatus::AlreadyExists => corelib::Error::AlreadyExists,
        ErrorStatus::NoPredecessor => corelib::Error::NoPredecessor,
        ErrorStatus::IdCollision => corelib::Error::IdCollision,
        ErrorStatus::RemoteUnreachable => corelib::Error::RemoteUnreachable(message),
        ErrorStatus::InvalidArgument => corelib::Error::InvalidArgument(message),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    Address(String),
    Items(Vec<InsertItem>),
    Value(String),
    Ok,
    Err { status: ErrorStatus, message: String },
}

impl Response {
    pub fn from_core_result<T>(result: corelib::Result<T>, ok: impl FnOnce(T) -> Response) -> Response {
        match result {
            Ok(v) => ok(v),
            Err(e) => Response::Err {
                status: ErrorStatus::from(&e),
                message: e.to_string(),
            },
        }
    }
}

/// An identifier as it crosses the wire; only `find_successor` sends one.
pub fn id_to_wire(id: Id) -> u64 {
    id.0
}

pub async fn write_frame<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = bincode::serialize(msg)?;
    let len: u32 = payload
        .len()
        .try_into()
        .map_err(|_| Error::FrameTooLarge(u32::MAX))?;
    if len > MAX_FRAME_BYTES {
        return Err(Error::FrameTooLarge(len));
    }
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_frame<R, T>(reader: &mut R) -> Result<T>
where
    R: tokio::io::AsyncRead + Unpin,
    T: for<'de> Deserialize<'de>,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_BYTES {
        return Err(Error::FrameTooLarge(len));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(bincode::deserialize(&payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &Request::Healthz).await.unwrap();

        let mut cursor = Cursor::new(buf);
        let decoded: Request = read_frame(&mut cursor).await.unwrap();
        assert!(matches!(decoded, Request::Healthz));
    }

    #[tokio::test]
    async fn oversized_length_prefix_is_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_FRAME_BYTES + 1).to_be_bytes());
        let mut cursor = Cursor::new(buf);
        let err = read_frame::<_, Request>(&mut cursor).await.unwrap_err();
        assert!(matches!(err, Error::FrameTooLarge(_)));
    }
}
