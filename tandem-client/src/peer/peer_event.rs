use tandem_core::IceCandidate;

/// Callbacks of the peer connection, delivered as values into the session loop.
#[derive(Debug, Clone)]
pub enum PeerEvent<R> {
    NegotiationNeeded,
    Track(R),
    LocalCandidate(IceCandidate),
}
