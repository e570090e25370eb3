use crate::connection::ConnectionEvent;
use std::collections::HashMap;
use tokio::sync::mpsc::error::TrySendError;
use whiteboard_system::ConnectionId;

pub type ConnectionTx = tokio::sync::mpsc::Sender<ConnectionEvent>;

pub struct ConnectionTxStorage {
    connection_txs: HashMap<ConnectionId, ConnectionTx>,
}

impl ConnectionTxStorage {
    pub fn new() -> Self {
        Self {
            connection_txs: HashMap::new(),
        }
    }

    pub fn insert(&mut self, connection_id: ConnectionId, tx: ConnectionTx) {
        self.connection_txs.insert(connection_id, tx);
    }

    /// Fire-and-forget. A full or closed queue drops this one event.
    pub fn send(&self, to: &ConnectionId, event: ConnectionEvent) -> bool {
        match self.connection_txs.get(to) {
            Some(tx) => match tx.try_send(event) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    log::warn!("Dropped event for connection {}: queue is full", to);
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    log::warn!("Dropped event for connection {}: connection closed", to);
                    false
                }
            },
            None => {
                log::warn!("Dropped event for unknown connection {}", to);
                false
            }
        }
    }

    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<ConnectionTx> {
        self.connection_txs.remove(connection_id)
    }
}
