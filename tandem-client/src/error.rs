use crate::peer::SignalingState;
use std::fmt;
use tandem_core::{ProtocolError, SdpType};
use thiserror::Error;

/// Failure reported by the underlying peer-connection primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(msg: impl fmt::Display) -> Self {
        Self(msg.to_string())
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl From<webrtc::Error> for BackendError {
    fn from(e: webrtc::Error) -> Self {
        Self::new(e)
    }
}

#[cfg(target_arch = "wasm32")]
impl From<wasm_bindgen::JsValue> for BackendError {
    fn from(e: wasm_bindgen::JsValue) -> Self {
        Self(e.as_string().unwrap_or_else(|| format!("{:?}", e)))
    }
}

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("{operation} is not valid in signaling state {state}")]
    InvalidState {
        operation: &'static str,
        state: SignalingState,
    },

    #[error("expected {expected} description, got {actual}")]
    UnexpectedDescription { expected: SdpType, actual: SdpType },

    /// Impolite side dropped an offer that collided with its own.
    #[error("colliding offer ignored")]
    OfferIgnored,

    /// A remote offer was answered while this side's offer was being built.
    #[error("local offer superseded by a remote offer")]
    OfferSuperseded,

    #[error("peer connection rejected the operation: {0}")]
    Backend(#[from] BackendError),
}

#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("signaling link closed")]
    Closed,

    #[error("server did not complete the handshake: {0}")]
    Handshake(&'static str),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[cfg(not(target_arch = "wasm32"))]
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
