use crate::error::SignalingError;
use crate::peer::MaybeSendSync;
use tandem_core::ClientMessage;
use tokio::sync::mpsc;

/// Outbound half of the signaling link as the session sees it.
pub trait SignalingSink: MaybeSendSync {
    fn send(&self, msg: ClientMessage) -> Result<(), SignalingError>;
}

impl SignalingSink for mpsc::UnboundedSender<ClientMessage> {
    fn send(&self, msg: ClientMessage) -> Result<(), SignalingError> {
        mpsc::UnboundedSender::send(self, msg).map_err(|_| SignalingError::Closed)
    }
}
