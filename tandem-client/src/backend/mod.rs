//! Peer-connection backends: the `webrtc` crate natively, `RTCPeerConnection`
//! through `web-sys` in the browser.

#[cfg(not(target_arch = "wasm32"))]
mod webrtc_peer;
#[cfg(target_arch = "wasm32")]
mod web_peer;

#[cfg(not(target_arch = "wasm32"))]
pub use webrtc_peer::*;
#[cfg(target_arch = "wasm32")]
pub use web_peer::*;
