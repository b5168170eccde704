//! WebSocket adapter over tokio-tungstenite (requires `full` feature).
//!
//! The stream is split: a writer task owns the sink and completes write
//! callbacks in order, a reader task owns the stream and dispatches events to
//! the registered listeners.

use super::{
    lock, CloseListener, ErrorListener, Frame, MessageListener, Socket, SocketError, WriteCallback,
};
use crate::error::Error;
use crate::Result;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::sink::SinkExt;
use futures::stream::{SplitSink, SplitStream, StreamExt};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

const HAS_MESSAGE: u8 = 0b001;
const HAS_ERROR: u8 = 0b010;
const HAS_CLOSE: u8 = 0b100;
const ARMED: u8 = HAS_MESSAGE | HAS_ERROR | HAS_CLOSE;

enum Command {
    Write(Message, WriteCallback),
    Close,
}

#[derive(Default)]
struct Listeners {
    message: Mutex<Vec<MessageListener>>,
    error: Mutex<Vec<ErrorListener>>,
    close: Mutex<Vec<CloseListener>>,
}

impl Listeners {
    fn message(&self, frame: Frame) {
        for listener in lock(&self.message).iter() {
            listener(frame.clone());
        }
    }

    fn error(&self, error: SocketError) {
        for listener in lock(&self.error).iter() {
            listener(Arc::clone(&error));
        }
    }

    fn close(&self) {
        for listener in lock(&self.close).iter() {
            listener();
        }
    }
}

/// [`Socket`] backed by a tokio-tungstenite WebSocket.
///
/// Must be created inside a tokio runtime. Reading starts once at least one
/// listener of each kind (message, error, close) has been registered, so no
/// event is dispatched into an empty listener list.
pub struct WsSocket {
    listeners: Arc<Listeners>,
    registered: AtomicU8,
    reader: Mutex<Option<BoxFuture<'static, ()>>>,
    commands: mpsc::UnboundedSender<Command>,
}

impl WsSocket {
    /// Wrap an established WebSocket stream.
    pub fn new<S>(ws: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sink, stream) = ws.split();
        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(sink, rx));

        let listeners = Arc::new(Listeners::default());
        let reader = read_loop(stream, Arc::clone(&listeners));
        Self {
            listeners,
            registered: AtomicU8::new(0),
            reader: Mutex::new(Some(Box::pin(reader))),
            commands,
        }
    }

    fn mark_registered(&self, kind: u8) {
        let before = self.registered.fetch_or(kind, Ordering::AcqRel);
        if before != ARMED && before | kind == ARMED {
            if let Some(reader) = lock(&self.reader).take() {
                tokio::spawn(reader);
            }
        }
    }
}

impl Socket for WsSocket {
    fn on_message(&self, listener: MessageListener) {
        lock(&self.listeners.message).push(listener);
        self.mark_registered(HAS_MESSAGE);
    }

    fn on_error(&self, listener: ErrorListener) {
        lock(&self.listeners.error).push(listener);
        self.mark_registered(HAS_ERROR);
    }

    fn on_close(&self, listener: CloseListener) {
        lock(&self.listeners.close).push(listener);
        self.mark_registered(HAS_CLOSE);
    }

    fn send(&self, frame: Frame, done: WriteCallback) {
        let message = match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Binary(data) => Message::Binary(data.into()),
        };
        if let Err(mpsc::error::SendError(Command::Write(_, done))) =
            self.commands.send(Command::Write(message, done))
        {
            let err = std::io::Error::new(std::io::ErrorKind::NotConnected, "websocket writer stopped");
            done(Err(Arc::new(err)));
        }
    }

    fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }
}

async fn write_loop<S>(
    mut sink: SplitSink<WebSocketStream<S>, Message>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(command) = commands.recv().await {
        match command {
            Command::Write(message, done) => {
                let result = sink.send(message).await.map_err(|e| Arc::new(e) as SocketError);
                done(result);
            }
            Command::Close => {
                if let Err(e) = sink.close().await {
                    tracing::debug!(error = %e, "websocket close handshake failed");
                }
                break;
            }
        }
    }
    // Writes still queued are dropped with their callbacks.
}

async fn read_loop<S>(mut stream: SplitStream<WebSocketStream<S>>, listeners: Arc<Listeners>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(item) = stream.next().await {
        match item {
            Ok(Message::Text(text)) => listeners.message(Frame::Text(text)),
            Ok(Message::Binary(data)) => listeners.message(Frame::Binary(Bytes::from(data))),
            Ok(Message::Close(frame)) => tracing::debug!(?frame, "close frame received"),
            Ok(_) => {}
            Err(e) => {
                listeners.error(Arc::new(e));
                break;
            }
        }
    }
    listeners.close();
}

/// Connect to a WebSocket URL.
pub async fn connect(url: &str) -> Result<WsSocket> {
    let (ws, _response) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| Error::Socket(Arc::new(e)))?;
    Ok(WsSocket::new(ws))
}

/// Run the server side of the WebSocket handshake on an accepted stream.
pub async fn accept<S>(stream: S) -> Result<WsSocket>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| Error::Socket(Arc::new(e)))?;
    Ok(WsSocket::new(ws))
}
