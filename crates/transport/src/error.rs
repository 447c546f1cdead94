//! Transport-level errors: the things that can go wrong moving bytes, on
//! top of the `corelib::Error` the payload itself may carry.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame encode/decode error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("frame exceeds maximum size ({0} bytes)")]
    FrameTooLarge(u32),

    #[error(transparent)]
    Core(#[from] corelib::Error),
}

impl From<Error> for corelib::Error {
    /// Collapses any transport-layer failure into `RemoteUnreachable`; only
    /// `Error::Core` carries a typed `corelib::Error` worth preserving.
    fn from(e: Error) -> Self {
        match e {
            Error::Core(inner) => inner,
            other => corelib::Error::RemoteUnreachable(other.to_string()),
        }
    }
}
