//! One bound WebSocket listener and its per-connection tasks.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async_with_config;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, WebSocketConfig};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connection::{ClientConnection, ConnectionSet};
use crate::dispatcher::dispatch;
use crate::error::Result;
use crate::registry::ResponseRegistry;

/// Connection ids, unique across every interface in the process.
static CONNECTION_IDS: AtomicU64 = AtomicU64::new(1);

/// One listening endpoint (admin or app).
///
/// Owns the accept task, the cancellation token that stops it, and the
/// set of currently open connections. Closing cancels the token and then
/// awaits the accept task, so the bound port is released before `close`
/// returns.
pub(crate) struct Interface {
    port: u16,
    connections: Arc<ConnectionSet>,
    token: CancellationToken,
    accept_task: JoinHandle<()>,
}

impl Interface {
    /// Bind a listener and start accepting. Port `0` auto-assigns; the
    /// actual port is available from [`Interface::port`] once this
    /// returns.
    pub(crate) async fn bind(
        host: &str,
        port: u16,
        registry: Arc<ResponseRegistry>,
        channel_capacity: usize,
        max_message_size: usize,
        label: &'static str,
    ) -> Result<Self> {
        let listener = TcpListener::bind((host, port)).await?;
        let port = listener.local_addr()?.port();
        let connections = Arc::new(ConnectionSet::new());
        let token = CancellationToken::new();
        info!(label, port, "interface bound");

        let accept_task = tokio::spawn(accept_loop(
            listener,
            registry,
            connections.clone(),
            token.clone(),
            channel_capacity,
            max_message_size,
            label,
        ));

        Ok(Self {
            port,
            connections,
            token,
            accept_task,
        })
    }

    pub(crate) fn port(&self) -> u16 {
        self.port
    }

    pub(crate) fn connections(&self) -> &Arc<ConnectionSet> {
        &self.connections
    }

    /// Stop accepting and release the bound port, returning once the
    /// listener socket is gone. In-flight request handling is not
    /// aborted; connection loops stop at their next frame boundary.
    pub(crate) async fn close(self) {
        self.token.cancel();
        if let Err(e) = self.accept_task.await {
            warn!(port = self.port, error = %e, "listener task failed during close");
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    registry: Arc<ResponseRegistry>,
    connections: Arc<ConnectionSet>,
    token: CancellationToken,
    channel_capacity: usize,
    max_message_size: usize,
    label: &'static str,
) {
    let ws_config = WebSocketConfig::default().max_message_size(Some(max_message_size));
    loop {
        tokio::select! {
            () = token.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let id = CONNECTION_IDS.fetch_add(1, Ordering::Relaxed);
                    debug!(label, %peer, conn_id = id, "connection accepted");
                    drop(tokio::spawn(run_connection(
                        stream,
                        ws_config,
                        id,
                        registry.clone(),
                        connections.clone(),
                        token.clone(),
                        channel_capacity,
                        label,
                    )));
                }
                Err(e) => warn!(label, error = %e, "accept failed"),
            },
        }
    }
    debug!(label, "listener stopped");
}

async fn run_connection(
    stream: TcpStream,
    ws_config: WebSocketConfig,
    id: u64,
    registry: Arc<ResponseRegistry>,
    connections: Arc<ConnectionSet>,
    token: CancellationToken,
    channel_capacity: usize,
    label: &'static str,
) {
    let ws = match accept_async_with_config(stream, Some(ws_config)).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(label, conn_id = id, error = %e, "websocket handshake failed");
            return;
        }
    };
    let (mut sink, mut stream) = ws.split();
    let (tx, mut rx) = mpsc::channel::<Message>(channel_capacity);

    // Dedicated writer task: replies and broadcast signals funnel
    // through one bounded channel, so writes never interleave.
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let conn = Arc::new(ClientConnection::new(id, tx));
    connections.add(conn.clone()).await;

    // Frames on one connection are dispatched and answered strictly in
    // arrival order: the loop awaits each reply enqueue before reading
    // the next frame.
    loop {
        tokio::select! {
            () = token.cancelled() => break,
            incoming = stream.next() => {
                let Some(incoming) = incoming else { break };
                match incoming {
                    Ok(Message::Binary(bytes)) => match dispatch(&bytes, &registry) {
                        Ok(reply) => {
                            if !conn.send(Message::binary(reply)).await {
                                break;
                            }
                        }
                        Err(e) => {
                            // No correlation id to answer with; surface a
                            // connection-level protocol error instead of
                            // silently discarding the frame.
                            warn!(label, conn_id = id, error = %e, "malformed frame, closing connection");
                            let close = Message::Close(Some(CloseFrame {
                                code: CloseCode::Protocol,
                                reason: e.to_string().into(),
                            }));
                            let _ = conn.send(close).await;
                            break;
                        }
                    },
                    Ok(Message::Close(_)) => break,
                    // Text, ping and pong are not part of the conductor
                    // protocol; ignore them.
                    Ok(_) => {}
                    Err(e) => {
                        debug!(label, conn_id = id, error = %e, "read error");
                        break;
                    }
                }
            }
        }
    }

    connections.remove(id).await;
    drop(conn); // closes the writer channel once the last sender is gone
    if let Err(e) = writer.await {
        warn!(label, conn_id = id, error = %e, "writer task failed");
    }
    debug!(label, conn_id = id, "connection closed");
}
