use tandem_core::ConnectionHandle;

/// Commands the WebSocket handlers feed into the signaling router.
#[derive(Debug)]
pub enum RouterCommand {
    /// A connection was accepted and its outbound queue is registered.
    Connect { handle: ConnectionHandle },

    /// One raw text frame from the connection, decoded by the router.
    Inbound {
        handle: ConnectionHandle,
        text: String,
    },

    /// The connection closed.
    Disconnect { handle: ConnectionHandle },
}
