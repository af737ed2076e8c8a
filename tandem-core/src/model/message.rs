use crate::error::ProtocolError;
use crate::model::{
    ConnectionHandle, IceCandidate, IceServerConfig, ParticipantId, RoomKey, SdpType,
    SessionDescription,
};
use serde::{Deserialize, Serialize};

/// Frames a browser (or native) participant sends to the relay.
///
/// `to` names either a participant identity or, failing that, the textual
/// form of a live [`ConnectionHandle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ClientMessage {
    Join {
        identity: ParticipantId,
        room: RoomKey,
    },
    Leave,
    CallOffer {
        to: String,
        offer: SessionDescription,
    },
    CallAnswer {
        to: String,
        answer: SessionDescription,
    },
    RenegotiateOffer {
        to: String,
        offer: SessionDescription,
    },
    RenegotiateAnswer {
        to: String,
        answer: SessionDescription,
    },
    IceCandidate {
        to: String,
        candidate: IceCandidate,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub identity: ParticipantId,
    pub handle: ConnectionHandle,
}

/// Frames the relay sends to a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ServerMessage {
    Welcome {
        handle: ConnectionHandle,
    },
    IceConfig {
        ice_servers: Vec<IceServerConfig>,
    },
    /// Join acknowledgment, addressed to the joiner only.
    Join {
        identity: ParticipantId,
        room: RoomKey,
        #[serde(default)]
        members: Vec<Member>,
    },
    UserJoined {
        identity: ParticipantId,
        handle: ConnectionHandle,
    },
    UserLeft {
        identity: ParticipantId,
        handle: ConnectionHandle,
    },
    CallOffer {
        from: ParticipantId,
        offer: SessionDescription,
    },
    CallAnswer {
        from: ParticipantId,
        answer: SessionDescription,
    },
    RenegotiateOffer {
        from: ParticipantId,
        offer: SessionDescription,
    },
    RenegotiateAnswer {
        from: ParticipantId,
        answer: SessionDescription,
    },
    IceCandidate {
        from: ParticipantId,
        candidate: IceCandidate,
    },
    TargetUnreachable {
        to: String,
    },
    Error {
        reason: String,
    },
}

impl ClientMessage {
    /// Parses and validates one text frame.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let msg: Self = serde_json::from_str(text)?;
        msg.validate()?;
        Ok(msg)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Self::Join { identity, room } => {
                if identity.is_blank() {
                    return Err(ProtocolError::MissingField("identity"));
                }
                if room.is_blank() {
                    return Err(ProtocolError::MissingField("room"));
                }
                Ok(())
            }
            Self::Leave => Ok(()),
            Self::CallOffer { to, offer } | Self::RenegotiateOffer { to, offer } => {
                require_target(to)?;
                require_description("offer", offer, SdpType::Offer)
            }
            Self::CallAnswer { to, answer } | Self::RenegotiateAnswer { to, answer } => {
                require_target(to)?;
                require_description("answer", answer, SdpType::Answer)
            }
            Self::IceCandidate { to, .. } => require_target(to),
        }
    }

    /// Wire name of the message type.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave => "leave",
            Self::CallOffer { .. } => "call-offer",
            Self::CallAnswer { .. } => "call-answer",
            Self::RenegotiateOffer { .. } => "renegotiate-offer",
            Self::RenegotiateAnswer { .. } => "renegotiate-answer",
            Self::IceCandidate { .. } => "ice-candidate",
        }
    }

    /// Relay target, for the message types that have one.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Join { .. } | Self::Leave => None,
            Self::CallOffer { to, .. }
            | Self::CallAnswer { to, .. }
            | Self::RenegotiateOffer { to, .. }
            | Self::RenegotiateAnswer { to, .. }
            | Self::IceCandidate { to, .. } => Some(to),
        }
    }

    /// Splits a relay message into its target and the frame the target receives,
    /// stamped with the sender's identity. `None` for non-relay messages.
    pub fn into_relay(self, from: ParticipantId) -> Option<(String, ServerMessage)> {
        let relayed = match self {
            Self::Join { .. } | Self::Leave => return None,
            Self::CallOffer { to, offer } => (to, ServerMessage::CallOffer { from, offer }),
            Self::CallAnswer { to, answer } => (to, ServerMessage::CallAnswer { from, answer }),
            Self::RenegotiateOffer { to, offer } => {
                (to, ServerMessage::RenegotiateOffer { from, offer })
            }
            Self::RenegotiateAnswer { to, answer } => {
                (to, ServerMessage::RenegotiateAnswer { from, answer })
            }
            Self::IceCandidate { to, candidate } => {
                (to, ServerMessage::IceCandidate { from, candidate })
            }
        };
        Some(relayed)
    }
}

impl ServerMessage {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Originating participant of a relayed frame.
    pub fn sender(&self) -> Option<&ParticipantId> {
        match self {
            Self::CallOffer { from, .. }
            | Self::CallAnswer { from, .. }
            | Self::RenegotiateOffer { from, .. }
            | Self::RenegotiateAnswer { from, .. }
            | Self::IceCandidate { from, .. } => Some(from),
            _ => None,
        }
    }
}

fn require_target(to: &str) -> Result<(), ProtocolError> {
    if to.trim().is_empty() {
        return Err(ProtocolError::MissingField("to"));
    }
    Ok(())
}

fn require_description(
    field: &'static str,
    desc: &SessionDescription,
    expected: SdpType,
) -> Result<(), ProtocolError> {
    if desc.sdp_type != expected {
        return Err(ProtocolError::WrongDescription {
            field,
            expected: if expected == SdpType::Offer {
                "an offer"
            } else {
                "an answer"
            },
            actual: desc.sdp_type.to_string(),
        });
    }
    if !desc.has_body() {
        return Err(ProtocolError::MissingField("sdp"));
    }
    Ok(())
}
