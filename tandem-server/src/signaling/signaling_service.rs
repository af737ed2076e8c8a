use crate::config::{OverflowPolicy, RelayConfig};
use crate::error::RelayError;
use crate::router::RouterCommand;
use crate::signaling::{Delivery, SignalingOutput};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tandem_core::{ConnectionHandle, ServerMessage};
use tokio::sync::{Notify, mpsc};
use tracing::warn;

struct Outbound {
    tx: mpsc::Sender<ServerMessage>,
    kicked: Arc<Notify>,
}

struct SignalingInner {
    connections: DashMap<ConnectionHandle, Outbound>,
    outbound_capacity: usize,
    overflow: OverflowPolicy,
}

/// Per-connection outbound queues, shared between the router and the
/// WebSocket handlers.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
    pub(crate) router_tx: mpsc::Sender<RouterCommand>,
}

/// Receiving half of a registered connection.
pub struct OutboundQueue {
    pub rx: mpsc::Receiver<ServerMessage>,
    /// Fires when the overflow policy cuts the connection.
    pub kicked: Arc<Notify>,
}

impl SignalingService {
    pub fn new(router_tx: mpsc::Sender<RouterCommand>, config: &RelayConfig) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                connections: DashMap::new(),
                outbound_capacity: config.outbound_capacity.max(1),
                overflow: config.overflow,
            }),
            router_tx,
        }
    }

    pub fn open(&self, handle: ConnectionHandle) -> OutboundQueue {
        let (tx, rx) = mpsc::channel(self.inner.outbound_capacity);
        let kicked = Arc::new(Notify::new());
        self.inner.connections.insert(
            handle,
            Outbound {
                tx,
                kicked: kicked.clone(),
            },
        );
        OutboundQueue { rx, kicked }
    }

    pub fn close(&self, handle: &ConnectionHandle) {
        self.inner.connections.remove(handle);
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }

    pub async fn submit(&self, cmd: RouterCommand) -> Result<(), RelayError> {
        self.router_tx
            .send(cmd)
            .await
            .map_err(|_| RelayError::RouterClosed)
    }

    pub fn try_deliver(&self, handle: ConnectionHandle, msg: ServerMessage) -> Delivery {
        let Some(tx) = self.inner.connections.get(&handle).map(|c| c.tx.clone()) else {
            return Delivery::Closed;
        };

        match tx.try_send(msg) {
            Ok(()) => Delivery::Queued,
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.close(&handle);
                Delivery::Closed
            }
            Err(mpsc::error::TrySendError::Full(_)) => match self.inner.overflow {
                OverflowPolicy::DropNewest => {
                    warn!("Outbound queue of {} is full, dropping frame", handle);
                    Delivery::Dropped
                }
                OverflowPolicy::Disconnect => {
                    warn!("Outbound queue of {} is full, disconnecting", handle);
                    if let Some((_, outbound)) = self.inner.connections.remove(&handle) {
                        outbound.kicked.notify_one();
                    }
                    Delivery::Closed
                }
            },
        }
    }
}

#[async_trait]
impl SignalingOutput for SignalingService {
    async fn deliver(&self, handle: ConnectionHandle, msg: ServerMessage) -> Delivery {
        self.try_deliver(handle, msg)
    }
}
