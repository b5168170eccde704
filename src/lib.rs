//! # ws-transport
//!
//! Duplex text-message transport over one connected WebSocket.
//!
//! ## Features
//!
//! - Multicast stream of decoded inbound messages
//! - Awaitable sends that report write success as a `bool`
//! - Transparent zlib compression of large payloads, signalled by binary frames
//! - Close notification fired exactly once, whether the peer or we hang up
//! - Error notifications that leave the connection usable
//!
//! ## Example
//!
//! ```ignore
//! use futures::StreamExt;
//! use ws_transport::{socket, TransportOptions, WebSocketTransport};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let socket = socket::connect("ws://localhost:9090").await?;
//!     let transport = WebSocketTransport::new("client-1", socket, TransportOptions::default());
//!     let mut messages = transport.on_message();
//!     transport.send(r#"{"hello":true}"#).await;
//!     while let Some(message) = messages.next().await {
//!         println!("{}", message?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod compression;
pub mod error;
pub mod socket;
pub mod transport;

pub use compression::{compress, decompress};
pub use error::{Error, Result};
pub use socket::{Frame, Socket, SocketError};
pub use transport::{
    MessageStream, Transport, TransportOptions, WebSocketTransport, DEFAULT_COMPRESSION_THRESHOLD,
};
