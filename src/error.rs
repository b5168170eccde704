use crate::socket::SocketError;
use thiserror::Error;

/// Library result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when using a transport.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// An inbound binary frame was not a valid compressed stream.
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    /// The socket's write primitive reported an error.
    #[error("write failed: {0}")]
    WriteFailure(SocketError),

    /// The transport was used after it closed.
    #[error("transport closed")]
    Closed,

    /// Asynchronous error raised by the underlying socket.
    #[error("socket: {0}")]
    Socket(SocketError),
}

impl Error {
    /// Whether this error was caused by using a closed transport.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
