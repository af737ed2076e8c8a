use async_trait::async_trait;
use tandem_core::{ConnectionHandle, ServerMessage};

/// Outcome of handing one frame to a connection's outbound queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// Queue full and the overflow policy discarded the frame.
    Dropped,
    /// No live connection behind the handle (or it was cut for overflowing).
    Closed,
}

/// Sink the router writes through, so it never touches sockets directly.
/// Implementations must not block on a slow recipient.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    async fn deliver(&self, handle: ConnectionHandle, msg: ServerMessage) -> Delivery;
}
