//! Message transport over a single socket connection.
//!
//! [`WebSocketTransport`] turns the socket's event callbacks into a multicast
//! message stream plus one-shot close and repeating error notifications, and
//! turns its callback-style write into an awaitable result. Large payloads are
//! compressed and sent as binary frames; the receiver tells the two apart by
//! the frame type alone.

mod options;

pub use options::{TransportOptions, DEFAULT_COMPRESSION_THRESHOLD};

use crate::compression;
use crate::error::Error;
use crate::socket::{lock, Frame, Socket, SocketError};
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{mpsc, oneshot};

/// Decoded inbound messages. Ends when the transport closes, or right after
/// yielding a [`Error::CorruptPayload`].
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

type CloseHandler = Box<dyn FnOnce() + Send + 'static>;
type ErrorHandler = Arc<dyn Fn(SocketError) + Send + Sync + 'static>;

/// Async trait for a duplex text-message transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one message. `true` if the write completed without error.
    async fn send(&self, message: String) -> bool;

    /// Subscribe to inbound messages from this point on.
    fn on_message(&self) -> MessageStream;

    /// Close the connection. No-op once closed.
    fn close(&self);

    /// Whether the transport has closed.
    fn is_closed(&self) -> bool;
}

/// Transport that owns one connected socket.
pub struct WebSocketTransport {
    inner: Arc<Inner>,
}

struct Inner {
    id: String,
    socket: Box<dyn Socket>,
    options: TransportOptions,
    closed: AtomicBool,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Result<String>>>>,
    close_handlers: Mutex<Vec<CloseHandler>>,
    error_handlers: Mutex<Vec<ErrorHandler>>,
    /// Held from the start of a send until its frame is handed to the socket.
    write_order: tokio::sync::Mutex<()>,
}

impl WebSocketTransport {
    /// Wrap an already-connected socket. The socket is owned by the transport
    /// from here on; its message, error and close listeners are registered once.
    pub fn new<S>(id: impl Into<String>, socket: S, options: TransportOptions) -> Self
    where
        S: Socket + 'static,
    {
        let inner = Arc::new(Inner {
            id: id.into(),
            socket: Box::new(socket),
            options,
            closed: AtomicBool::new(false),
            subscribers: Mutex::new(Vec::new()),
            close_handlers: Mutex::new(Vec::new()),
            error_handlers: Mutex::new(Vec::new()),
            write_order: tokio::sync::Mutex::new(()),
        });

        let weak = Arc::downgrade(&inner);
        inner.socket.on_message(Box::new(move |frame| {
            if let Some(inner) = Weak::upgrade(&weak) {
                inner.handle_frame(frame);
            }
        }));
        let weak = Arc::downgrade(&inner);
        inner.socket.on_error(Box::new(move |error| {
            if let Some(inner) = Weak::upgrade(&weak) {
                inner.handle_error(error);
            }
        }));
        let weak = Arc::downgrade(&inner);
        inner.socket.on_close(Box::new(move || {
            if let Some(inner) = Weak::upgrade(&weak) {
                inner.handle_close();
            }
        }));

        tracing::debug!(id = %inner.id, "transport opened");
        Self { inner }
    }

    /// Connection identifier, for diagnostics.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Options fixed at construction.
    pub fn options(&self) -> &TransportOptions {
        &self.inner.options
    }

    /// Whether the transport has closed. Never reverts to open.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Subscribe to decoded inbound messages.
    ///
    /// Every call returns an independent subscription that sees each message
    /// received after the call, in socket order. A subscription taken after
    /// close ends immediately.
    pub fn on_message(&self) -> MessageStream {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut subscribers = lock(&self.inner.subscribers);
            if !self.is_closed() {
                subscribers.push(tx);
            }
        }
        Box::pin(stream::unfold(Some(rx), |state| async move {
            let Some(mut rx) = state else {
                return None;
            };
            let Some(item) = rx.recv().await else {
                return None;
            };
            let rx = item.is_ok().then_some(rx);
            Some((item, rx))
        }))
    }

    /// Register a listener for the transition to closed.
    ///
    /// Fires exactly once if registered while open. Registering after close is
    /// a no-op: the listener is dropped without being called.
    pub fn on_close<F>(&self, listener: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut handlers = lock(&self.inner.close_handlers);
        if self.is_closed() {
            tracing::debug!(id = %self.inner.id, "close listener registered after close; ignored");
            return;
        }
        handlers.push(Box::new(listener));
    }

    /// Register a listener for socket errors. Called for every error; errors
    /// do not close the transport.
    pub fn on_error<F>(&self, listener: F)
    where
        F: Fn(SocketError) + Send + Sync + 'static,
    {
        lock(&self.inner.error_handlers).push(Arc::new(listener));
    }

    /// Close the connection locally. Does nothing if already closed.
    pub fn close(&self) {
        if !self.inner.mark_closed() {
            return;
        }
        tracing::debug!(id = %self.inner.id, "closing transport");
        // The socket may report its own close right away; mark_closed suppresses it.
        self.inner.socket.close();
        self.inner.finish_close();
    }

    /// Send a message, reporting `true` if the socket write succeeded.
    ///
    /// Failures are logged and folded into `false`; use [`try_send`](Self::try_send)
    /// for the error itself.
    pub async fn send(&self, message: impl Into<String>) -> bool {
        match self.try_send(message.into()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(id = %self.inner.id, error = %e, "send failed");
                false
            }
        }
    }

    /// Send a message, compressing it into a binary frame when it is larger
    /// than the configured threshold.
    ///
    /// Returns [`Error::Closed`] without touching the socket once the transport
    /// has closed, and [`Error::WriteFailure`] when the write reports an error
    /// or its callback is dropped unanswered.
    pub async fn try_send(&self, message: String) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        let order = self.inner.write_order.lock().await;
        let frame = self.encode(message).await?;
        if self.is_closed() {
            return Err(Error::Closed);
        }

        let (tx, rx) = oneshot::channel();
        self.inner.socket.send(
            frame,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        );
        drop(order);

        match rx.await {
            Ok(result) => result.map_err(Error::WriteFailure),
            Err(_) => Err(Error::WriteFailure(Arc::new(std::io::Error::new(
                std::io::ErrorKind::Interrupted,
                "write callback dropped",
            )))),
        }
    }

    async fn encode(&self, message: String) -> Result<Frame> {
        let options = &self.inner.options;
        if !options.should_compress(&message) {
            return Ok(Frame::Text(message));
        }
        let payload = if options.sync_compression {
            compression::compress(&message)
        } else {
            tokio::task::spawn_blocking(move || compression::compress(&message))
                .await
                .map_err(|e| Error::WriteFailure(Arc::new(e)))?
        };
        Ok(Frame::Binary(Bytes::from(payload)))
    }
}

impl Inner {
    /// Single check-and-set shared by the local and remote close paths.
    fn mark_closed(&self) -> bool {
        self.closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn finish_close(&self) {
        // Dropping the senders ends every subscription cleanly.
        lock(&self.subscribers).clear();
        let handlers = std::mem::take(&mut *lock(&self.close_handlers));
        for handler in handlers {
            handler();
        }
    }

    fn handle_close(&self) {
        if self.mark_closed() {
            tracing::debug!(id = %self.id, "socket closed");
            self.finish_close();
        }
    }

    fn handle_error(&self, error: SocketError) {
        tracing::warn!(id = %self.id, error = %error, "socket error");
        let handlers = lock(&self.error_handlers).clone();
        for handler in handlers {
            handler(Arc::clone(&error));
        }
    }

    fn handle_frame(&self, frame: Frame) {
        let item = match frame {
            Frame::Text(text) => Ok(text),
            Frame::Binary(data) => compression::decompress(&data),
        };
        let mut subscribers = lock(&self.subscribers);
        if let Err(e) = &item {
            tracing::warn!(id = %self.id, error = %e, "dropping subscriptions on undecodable frame");
            for tx in subscribers.drain(..) {
                let _ = tx.send(item.clone());
            }
            return;
        }
        subscribers.retain(|tx| tx.send(item.clone()).is_ok());
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&self, message: String) -> bool {
        WebSocketTransport::send(self, message).await
    }

    fn on_message(&self) -> MessageStream {
        WebSocketTransport::on_message(self)
    }

    fn close(&self) {
        WebSocketTransport::close(self)
    }

    fn is_closed(&self) -> bool {
        WebSocketTransport::is_closed(self)
    }
}
