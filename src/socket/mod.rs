//! Socket capability boundary.
//!
//! A transport wraps exactly one already-connected duplex socket. The socket
//! only has to offer listener registration for `message`, `error` and `close`
//! events, a callback-style write and a close request. The WebSocket adapter
//! for real connections requires the `full` feature.

#[cfg(test)]
pub(crate) mod mock;
#[cfg(feature = "full")]
mod ws;

#[cfg(feature = "full")]
pub use ws::{accept, connect, WsSocket};

use bytes::Bytes;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Error value raised by a socket. Shared so one value can reach every listener.
pub type SocketError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Completion callback for [`Socket::send`], invoked at most once.
pub type WriteCallback = Box<dyn FnOnce(Result<(), SocketError>) + Send + 'static>;

/// Called for every inbound data frame.
pub type MessageListener = Box<dyn Fn(Frame) + Send + Sync + 'static>;
/// Called for every asynchronous socket error.
pub type ErrorListener = Box<dyn Fn(SocketError) + Send + Sync + 'static>;
/// Called when the connection closes, possibly more than once.
pub type CloseListener = Box<dyn Fn() + Send + Sync + 'static>;

/// One WebSocket data frame. The variant is the binary/text marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

impl Frame {
    /// Whether this frame carries a compressed binary payload.
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }
}

/// Minimal duplex socket a transport can be built on.
///
/// Listeners may be invoked from any thread, but a socket must deliver events
/// for one connection sequentially and in arrival order.
pub trait Socket: Send + Sync {
    /// Register a listener for inbound data frames.
    fn on_message(&self, listener: MessageListener);

    /// Register a listener for asynchronous socket errors.
    fn on_error(&self, listener: ErrorListener);

    /// Register a listener for connection closure. Sockets may raise it more than once.
    fn on_close(&self, listener: CloseListener);

    /// Write one frame; `done` reports the outcome of the write.
    fn send(&self, frame: Frame, done: WriteCallback);

    /// Request the connection be closed. Closure is reported through `on_close`.
    fn close(&self);
}

impl<T: Socket + ?Sized> Socket for Arc<T> {
    fn on_message(&self, listener: MessageListener) {
        (**self).on_message(listener)
    }

    fn on_error(&self, listener: ErrorListener) {
        (**self).on_error(listener)
    }

    fn on_close(&self, listener: CloseListener) {
        (**self).on_close(listener)
    }

    fn send(&self, frame: Frame, done: WriteCallback) {
        (**self).send(frame, done)
    }

    fn close(&self) {
        (**self).close()
    }
}

/// Lock a listener list, recovering it if a listener panicked while it was held.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
