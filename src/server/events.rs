use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

use crate::connection::{Connection, LogInfo};

/// Published once per finished request.
#[derive(Debug, Clone)]
pub struct RequestCompleted {
    pub id: Uuid,
    pub request_log: LogInfo,
    pub response_log: LogInfo,
}

/// Fan-out of [`RequestCompleted`] events.
///
/// Listeners get their own copies of the logs. A slow or missing listener
/// never holds up a connection.
#[derive(Debug, Clone)]
pub struct RequestEvents {
    tx: broadcast::Sender<RequestCompleted>,
}

impl RequestEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RequestCompleted> {
        self.tx.subscribe()
    }

    /// Snapshots the connection's logs and sends them to every subscriber.
    pub fn publish(&self, conn: &dyn Connection) {
        let event = RequestCompleted {
            id: conn.id(),
            request_log: conn.request_log().clone(),
            response_log: conn.response_log().clone(),
        };

        if self.tx.send(event).is_err() {
            trace!(connection = %conn.id(), "No request listeners");
        }
    }
}

impl Default for RequestEvents {
    fn default() -> Self {
        Self::new(256)
    }
}
