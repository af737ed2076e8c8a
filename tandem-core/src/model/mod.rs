mod connection;
mod description;
mod ice;
mod media;
mod message;
mod participant;
mod room;

pub use connection::ConnectionHandle;
pub use description::{SdpType, SessionDescription};
pub use ice::{IceCandidate, IceServerConfig};
pub use media::MediaKind;
pub use message::{ClientMessage, Member, ServerMessage};
pub use participant::ParticipantId;
pub use room::RoomKey;
