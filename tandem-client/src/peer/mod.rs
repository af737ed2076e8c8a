mod peer_connection;
mod peer_event;
mod signaling_state;

pub use peer_connection::*;
pub use peer_event::*;
pub use signaling_state::*;
