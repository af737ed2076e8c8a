use crate::error::BackendError;
use crate::peer::SignalingState;
use async_trait::async_trait;
use tandem_core::{IceCandidate, MediaKind, SessionDescription};

#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSendSync: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync> MaybeSendSync for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSendSync {}
#[cfg(target_arch = "wasm32")]
impl<T> MaybeSendSync for T {}

/// A local or remote media track.
pub trait MediaTrack: Clone + MaybeSendSync {
    fn id(&self) -> String;
    /// `None` when the backend reports a kind other than audio or video.
    fn kind(&self) -> Option<MediaKind>;
}

/// One sender of the connection and the track it currently carries.
#[derive(Debug, Clone)]
pub struct SenderSlot<S> {
    pub sender: S,
    pub track_id: Option<String>,
    pub kind: Option<MediaKind>,
}

/// The peer-connection primitive the negotiator drives.
///
/// Backends hand their asynchronous callbacks (negotiation needed, remote
/// tracks, local candidates) to the session as [`PeerEvent`]s instead of
/// exposing them here.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait PeerConnection: MaybeSendSync {
    type Track: MediaTrack;
    type RemoteTrack: MediaTrack;
    type Sender: Clone + MaybeSendSync;

    fn signaling_state(&self) -> SignalingState;

    async fn create_offer(&self) -> Result<SessionDescription, BackendError>;

    async fn create_answer(&self) -> Result<SessionDescription, BackendError>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), BackendError>;

    async fn set_remote_description(&self, desc: SessionDescription)
    -> Result<(), BackendError>;

    /// Discards the pending local offer and returns to `stable`.
    async fn rollback(&self) -> Result<(), BackendError> {
        self.set_local_description(SessionDescription::rollback())
            .await
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), BackendError>;

    async fn senders(&self) -> Vec<SenderSlot<Self::Sender>>;

    async fn replace_track(
        &self,
        sender: &Self::Sender,
        track: &Self::Track,
    ) -> Result<(), BackendError>;

    async fn add_track(
        &self,
        track: &Self::Track,
        stream_id: &str,
    ) -> Result<Self::Sender, BackendError>;

    async fn close(&self) -> Result<(), BackendError>;
}
