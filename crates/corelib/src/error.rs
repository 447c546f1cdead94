//! Error types for the core library.

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while routing, storing, or joining the ring.
///
/// Crossing a process boundary (see the `transport` crate) collapses these
/// down to a status and a message; `NotFound` and `AlreadyExists` are
/// recovered on the client side by matching the message text, since the
/// wire encoding is not required to carry a typed error channel.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// No item in the addressed bucket matches the query.
    #[error("not found")]
    NotFound,

    /// An item with the same `(index, key)` already exists in the bucket.
    #[error("item already exists")]
    AlreadyExists,

    /// `get_predecessor` was called on a node with no predecessor.
    ///
    /// Expected during stabilization; callers in this crate treat it as a
    /// non-fatal signal rather than propagating it further.
    #[error("no predecessor")]
    NoPredecessor,

    /// A join attempt resolved to an id already owned by a live peer.
    #[error("id collision with existing node")]
    IdCollision,

    /// An RPC to a peer failed (timeout, connection refused, transport error).
    #[error("remote peer unreachable: {0}")]
    RemoteUnreachable(String),

    /// A finger index was out of `[1, m]`, or a malformed bootstrap reply.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
