//! `PeerServer`: the dispatcher side of the peer RPC contract.
//!
//! Grounded on `node/peerserver/peerserver.go`: one branch per request kind,
//! translating it into a call against the local node, then serializing the
//! reply. `Leave` here does not send itself `SIGINT`, nor does it run the
//! core leave sequence inline — this dispatcher has no handle to the
//! maintenance loops, and running the handoff before they stop would race
//! `stabilize`/`fix_finger` against it. It only signals `shutdown`; the
//! hosting process (the `cli` crate) stops maintenance first and then calls
//! the real leave sequence, the same order the `ctrl_c` shutdown path uses.

use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{info, warn};

use corelib::node::Peer;
use corelib::{Item, RingNode};

use crate::error::Result as TransportResult;
use crate::wire::{read_frame, write_frame, Request, Response};

/// Listens for peer RPC connections and dispatches each request against
/// `node`. `shutdown` is signalled once a `Leave` request arrives, before
/// any handoff has run, so the caller can stop maintenance and perform the
/// real leave sequence itself.
pub struct PeerServer {
    node: Arc<RingNode>,
    shutdown: mpsc::Sender<()>,
}

impl PeerServer {
    pub fn new(node: Arc<RingNode>, shutdown: mpsc::Sender<()>) -> Self {
        Self { node, shutdown }
    }

    /// Accepts connections on `listener` until the process exits. Each
    /// connection is handled on its own task; a connection serves requests
    /// in a loop until the peer disconnects.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> TransportResult<()> {
        loop {
            let (stream, peer_addr) = listener.accept().await?;
            let this = self.clone();
            tokio::spawn(async move {
                if let Err(e) = this.handle_connection(stream).await {
                    warn!(peer = %peer_addr, error = %e, "peer connection ended with error");
                }
            });
        }
    }

    async fn handle_connection(&self, mut stream: TcpStream) -> TransportResult<()> {
        loop {
            let request: Request = match read_frame(&mut stream).await {
                Ok(r) => r,
                Err(_) => return Ok(()), // peer closed the connection
            };
            let response = self.dispatch(request).await;
            write_frame(&mut stream, &response).await?;
        }
    }

    async fn dispatch(&self, request: Request) -> Response {
        match request {
            Request::FindSuccessor { id } => {
                let result = self
                    .node
                    .clone()
                    .find_successor(corelib::Id(id))
                    .await
                    .map(|peer| peer.addr().to_string());
                Response::from_core_result(result, Response::Address)
            }
            Request::GetPredecessor => {
                let result = self
                    .node
                    .get_predecessor()
                    .await
                    .map(|peer| peer.addr().to_string());
                Response::from_core_result(result, Response::Address)
            }
            Request::SetSuccessor { addr } => {
                let handle = self.remote_handle(&addr);
                let result = self.node.set_successor(handle).await;
                Response::from_core_result(result, |_| Response::Ok)
            }
            Request::SetPredecessor { addr } => {
                let handle = self.remote_handle(&addr);
                let result = self.node.set_predecessor(handle).await;
                Response::from_core_result(result, |_| Response::Ok)
            }
            Request::Notify { addr } => {
                let handle = self.remote_handle(&addr);
                let result = self.node.notify(handle).await;
                Response::from_core_result(result, |items: Vec<Item>| {
                    Response::Items(items.iter().map(Into::into).collect())
                })
            }
            Request::InsertBatch { items } => {
                let result = self.node.clone().insert_batch(items).await;
                Response::from_core_result(result, |_| Response::Ok)
            }
            Request::Query { index, query } => {
                let result = self.node.clone().query(&index, &query).await;
                Response::from_core_result(result, Response::Value)
            }
            Request::Healthz => {
                let result = self.node.healthz().await;
                Response::from_core_result(result, |_| Response::Ok)
            }
            Request::Leave => {
                info!(id = %self.node.id(), "leave requested over the peer protocol, signalling host process");
                let _ = self.shutdown.send(()).await;
                Response::Ok
            }
        }
    }

    fn remote_handle(&self, addr: &str) -> corelib::PeerHandle {
        crate::client::RemoteNode::new(addr.to_string(), self.node.params()) as corelib::PeerHandle
    }
}
