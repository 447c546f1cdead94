//! The admin HTTP surface: plain JSON routes for setting/getting keys and
//! for inspecting a node's ring state.
//!
//! Not part of the peer protocol itself — grounded on the teacher's choice
//! of `axum` + `tower-http` for its own HTTP-facing crates, reused here as
//! the client-facing edge of an otherwise RPC-only node.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use corelib::node::Peer;
use corelib::{DistributedKv, Item, RingNode};

#[derive(Clone)]
pub struct AdminState {
    pub kv: Arc<DistributedKv>,
    pub node: Arc<RingNode>,
}

pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/set", post(set))
        .route("/get/:key", get(get_value))
        .route("/debug", get(debug))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Deserialize)]
struct SetRequest {
    key: String,
    value: String,
}

#[derive(Serialize)]
struct GetReply {
    value: String,
}

async fn set(State(state): State<AdminState>, Json(req): Json<SetRequest>) -> Response {
    match state.kv.insert(&req.key, &req.value).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_value(State(state): State<AdminState>, Path(key): Path<String>) -> Response {
    match state.kv.get(&key).await {
        Ok(value) => Json(GetReply { value }).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Serialize)]
struct FingerEntry {
    target: u64,
    addr: Option<String>,
}

#[derive(Serialize)]
struct DebugDump {
    id: u64,
    addr: String,
    successor: String,
    predecessor: Option<String>,
    finger: Vec<FingerEntry>,
    items: Vec<Item>,
}

async fn debug(State(state): State<AdminState>) -> Response {
    let node = &state.node;
    let finger = (0..node.params().m as usize)
        .map(|i| FingerEntry {
            target: node.finger_target(i).0,
            addr: node.finger_handle(i).map(|f| f.addr().to_string()),
        })
        .collect();

    let dump = DebugDump {
        id: node.id().0,
        addr: node.addr().to_string(),
        successor: node.successor_handle().addr().to_string(),
        predecessor: node.predecessor_handle().map(|p| p.addr().to_string()),
        finger,
        items: node.store().snapshot(),
    };
    Json(dump).into_response()
}

fn error_response(e: corelib::Error) -> Response {
    let status = match e {
        corelib::Error::NotFound => StatusCode::NOT_FOUND,
        corelib::Error::AlreadyExists => StatusCode::CONFLICT,
        corelib::Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string()).into_response()
}
