//! Connected-client state and signal fan-out.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{RwLock, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// One connected WebSocket client.
pub(crate) struct ClientConnection {
    /// Connection id, unique per conductor instance.
    pub(crate) id: u64,
    /// Send channel to the connection's socket-writer task.
    tx: mpsc::Sender<Message>,
}

impl ClientConnection {
    pub(crate) fn new(id: u64, tx: mpsc::Sender<Message>) -> Self {
        Self { id, tx }
    }

    /// Enqueue a frame for the writer task.
    ///
    /// Waits for channel capacity (replies on one connection stay in
    /// arrival order); returns `false` once the writer side is gone.
    pub(crate) async fn send(&self, message: Message) -> bool {
        self.tx.send(message).await.is_ok()
    }
}

/// The currently open connections of one listener.
///
/// Membership is added on accept and removed when the read loop ends;
/// the signal broadcaster reads the set to fan frames out.
#[derive(Default)]
pub(crate) struct ConnectionSet {
    connections: RwLock<HashMap<u64, Arc<ClientConnection>>>,
    active_count: AtomicUsize,
}

impl ConnectionSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn add(&self, connection: Arc<ClientConnection>) {
        let mut conns = self.connections.write().await;
        if conns.insert(connection.id, connection).is_none() {
            let _ = self.active_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) async fn remove(&self, id: u64) {
        let mut conns = self.connections.write().await;
        if conns.remove(&id).is_some() {
            let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Number of open connections (no read lock needed).
    pub(crate) fn count(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }

    /// Write one frame to every member concurrently.
    ///
    /// Completes once every send has completed; an individual failed
    /// send is logged and never blocks the others.
    pub(crate) async fn broadcast(&self, message: &Message) {
        let members: Vec<Arc<ClientConnection>> = {
            let conns = self.connections.read().await;
            conns.values().cloned().collect()
        };
        debug!(recipients = members.len(), "broadcasting frame");

        let sends = members.iter().map(|conn| async {
            if !conn.send(message.clone()).await {
                warn!(conn_id = conn.id, "failed to send broadcast frame (connection gone)");
            }
        });
        futures::future::join_all(sends).await;
    }
}
