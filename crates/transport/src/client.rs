//! `RemoteNode`: the client half of the peer RPC contract — a `Peer`
//! reached over a TCP connection to its address.
//!
//! Grounded on `remote/remotenode.go`, the fullest `RemoteNode` in the
//! original implementation: one method per `Peer` operation, each a single
//! request/reply round trip, with `NotFound`/`AlreadyExists` recovered from
//! the reply's status rather than treated as transport failures.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use corelib::node::{Peer, PeerHandle};
use corelib::{hash, Id, InsertItem, Item, RingParams};

use crate::error::Error as TransportError;
use crate::wire::{id_to_wire, read_frame, status_to_core_error, write_frame, Request, Response};

/// A lazily-connected handle to a peer at `addr`.
///
/// `id()` never touches the network: identifiers are derived by hashing the
/// address, the same rule every node uses for itself, so the remote id is
/// knowable without a round trip.
pub struct RemoteNode {
    addr: String,
    params: RingParams,
    conn: AsyncMutex<Option<TcpStream>>,
}

impl RemoteNode {
    pub fn new(addr: impl Into<String>, params: RingParams) -> Arc<Self> {
        Arc::new(Self {
            addr: addr.into(),
            params,
            conn: AsyncMutex::new(None),
        })
    }

    async fn call(&self, request: Request) -> corelib::Result<Response> {
        let mut guard = self.conn.lock().await;

        if guard.is_none() {
            let stream = TcpStream::connect(&self.addr)
                .await
                .map_err(TransportError::from)?;
            *guard = Some(stream);
        }
        // The branch above always leaves `guard` populated.
        let stream = guard.as_mut().expect("connection just established");

        if let Err(e) = write_frame(stream, &request).await {
            *guard = None;
            return Err(e.into());
        }
        match read_frame(stream).await {
            Ok(response) => Ok(response),
            Err(e) => {
                *guard = None;
                Err(e.into())
            }
        }
    }

    fn response_to_address(response: Response) -> corelib::Result<String> {
        match response {
            Response::Address(addr) => Ok(addr),
            Response::Err { status, message } => Err(status_to_core_error(status, message)),
            _ => Err(corelib::Error::RemoteUnreachable("unexpected reply shape".into())),
        }
    }
}

#[async_trait]
impl Peer for RemoteNode {
    fn id(&self) -> Id {
        hash(&self.addr, &self.params)
    }

    fn addr(&self) -> &str {
        &self.addr
    }

    async fn find_successor(self: Arc<Self>, id: Id) -> corelib::Result<PeerHandle> {
        let response = self
            .call(Request::FindSuccessor { id: id_to_wire(id) })
            .await?;
        let addr = Self::response_to_address(response)?;
        Ok(RemoteNode::new(addr, self.params) as PeerHandle)
    }

    async fn get_predecessor(&self) -> corelib::Result<PeerHandle> {
        let response = self.call(Request::GetPredecessor).await?;
        let addr = Self::response_to_address(response)?;
        Ok(RemoteNode::new(addr, self.params) as PeerHandle)
    }

    async fn set_successor(&self, n: PeerHandle) -> corelib::Result<()> {
        let response = self
            .call(Request::SetSuccessor {
                addr: n.addr().to_string(),
            })
            .await?;
        expect_ok(response)
    }

    async fn set_predecessor(&self, n: PeerHandle) -> corelib::Result<()> {
        let response = self
            .call(Request::SetPredecessor {
                addr: n.addr().to_string(),
            })
            .await?;
        expect_ok(response)
    }

    async fn notify(&self, p: PeerHandle) -> corelib::Result<Vec<Item>> {
        let response = self
            .call(Request::Notify {
                addr: p.addr().to_string(),
            })
            .await?;
        match response {
            Response::Items(items) => Ok(items.into_iter().map(Item::from).collect()),
            Response::Err { status, message } => Err(status_to_core_error(status, message)),
            _ => Err(corelib::Error::RemoteUnreachable("unexpected reply shape".into())),
        }
    }

    async fn insert_batch(self: Arc<Self>, items: Vec<InsertItem>) -> corelib::Result<()> {
        let response = self.call(Request::InsertBatch { items }).await?;
        expect_ok(response)
    }

    async fn query(self: Arc<Self>, index: &str, query: &str) -> corelib::Result<String> {
        let response = self
            .call(Request::Query {
                index: index.to_string(),
                query: query.to_string(),
            })
            .await?;
        match response {
            Response::Value(v) => Ok(v),
            Response::Err { status, message } => Err(status_to_core_error(status, message)),
            _ => Err(corelib::Error::RemoteUnreachable("unexpected reply shape".into())),
        }
    }

    async fn healthz(&self) -> corelib::Result<()> {
        let response = self.call(Request::Healthz).await?;
        expect_ok(response)
    }

    async fn leave(self: Arc<Self>) -> corelib::Result<()> {
        let response = self.call(Request::Leave).await?;
        debug!(addr = %self.addr, "sent leave to peer");
        expect_ok(response)
    }
}

fn expect_ok(response: Response) -> corelib::Result<()> {
    match response {
        Response::Ok => Ok(()),
        Response::Err { status, message } => Err(status_to_core_error(status, message)),
        _ => Err(corelib::Error::RemoteUnreachable("unexpected reply shape".into())),
    }
}
