//! Echo server and client over ws-transport, in one process.
//!
//! Run with: `cargo run --example echo --features full`

use futures::StreamExt;
use tokio::net::TcpListener;
use ws_transport::{socket, TransportOptions, WebSocketTransport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let mut next_id = 0u32;
        while let Ok((stream, peer)) = listener.accept().await {
            next_id += 1;
            let id = format!("server-{}", next_id);
            tokio::spawn(async move {
                let socket = match socket::accept(stream).await {
                    Ok(socket) => socket,
                    Err(e) => {
                        eprintln!("[{}] handshake with {} failed: {}", id, peer, e);
                        return;
                    }
                };
                let transport = WebSocketTransport::new(id, socket, TransportOptions::default());
                let mut messages = transport.on_message();
                while let Some(Ok(message)) = messages.next().await {
                    transport.send(message).await;
                }
            });
        }
    });

    let socket = socket::connect(&format!("ws://{}", addr)).await?;
    let client = WebSocketTransport::new("client", socket, TransportOptions::default());
    client.on_close(|| println!("[Event] Closed."));
    client.on_error(|e| println!("[Event] Socket error: {}", e));

    let mut replies = client.on_message();
    for message in [r#"{"type":"ping"}"#.to_string(), "x".repeat(20_000)] {
        let ok = client.send(message.clone()).await;
        let reply = replies.next().await.transpose()?.unwrap_or_default();
        println!(
            "sent {} bytes (ok: {}), echo matches: {}",
            message.len(),
            ok,
            reply == message
        );
    }

    client.close();
    Ok(())
}
