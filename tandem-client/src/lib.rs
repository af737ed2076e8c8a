pub mod backend;
pub mod error;
pub mod media;
pub mod negotiation;
pub mod peer;
pub mod session;
#[cfg(not(target_arch = "wasm32"))]
pub mod signaling;

pub use error::{BackendError, NegotiationError, SignalingError};
pub use media::{MediaStream, RemoteStream};
pub use negotiation::{Negotiator, NegotiatorConfig, Role};
pub use peer::{MaybeSendSync, MediaTrack, PeerConnection, PeerEvent, SenderSlot, SignalingState};
pub use session::{Session, SessionCommand, SessionConfig, SessionHandle, SessionUpdate, SignalingSink};
