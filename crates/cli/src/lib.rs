//! Process wiring: parse configuration, join the ring, serve peer RPC and
//! the admin HTTP surface, and leave cleanly on shutdown.

pub mod admin;
pub mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

use corelib::{DistributedKv, Maintenance, PeerHandle, RingNode};
use rendezvous::BootstrapClient;
use transport::{PeerServer, RemoteNode};

pub use config::Config;

/// Joins the ring described by `config`, serves it until interrupted or
/// asked to leave by a peer, then departs gracefully.
pub async fn run(config: Config) -> Result<()> {
    let params = config.ring_params();
    let node = RingNode::new(config.host.to_string(), params);

    let bootstrap = BootstrapClient::connect(config.bootstrap)
        .await
        .context("connecting to rendezvous server")?;
    let (status, peers) = bootstrap
        .register(config.host, &config.username)
        .await
        .context("registering with rendezvous server")?;
    info!(?status, peer_count = peers.len(), "registered with rendezvous server");

    let seed = peers
        .first()
        .map(|p| RemoteNode::new(p.to_string(), params) as PeerHandle);
    node.join(seed).await.context("joining ring")?;

    let peer_listener = TcpListener::bind(config.host)
        .await
        .context("binding peer RPC listener")?;
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
    let peer_server = Arc::new(PeerServer::new(node.clone(), shutdown_tx));
    let peer_server_task = tokio::spawn(peer_server.serve(peer_listener));

    let maintenance = Maintenance::start(node.clone());

    let kv = Arc::new(DistributedKv::new(node.clone() as PeerHandle));
    let admin_state = admin::AdminState {
        kv,
        node: node.clone(),
    };
    let admin_listener = TcpListener::bind(config.admin_addr)
        .await
        .context("binding admin HTTP listener")?;
    let admin_app = admin::router(admin_state);
    let admin_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(admin_listener, admin_app).await {
            warn!(error = %e, "admin HTTP server exited with error");
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl-c, leaving ring");
        }
        _ = shutdown_rx.recv() => {
            info!("leave requested over the peer protocol, shutting down");
        }
    }

    maintenance.stop_and_join().await;
    node.leave().await.context("leaving ring")?;
    if let Err(e) = bootstrap.unregister(config.host, &config.username).await {
        warn!(error = %e, "failed to unregister from rendezvous server");
    }

    admin_task.abort();
    peer_server_task.abort();
    Ok(())
}
