//! Errors for the bootstrap rendezvous protocol.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("registration timed out")]
    Timeout,

    #[error("registration rejected: {0:?}")]
    Rejected(crate::protocol::RegisterStatus),
}
