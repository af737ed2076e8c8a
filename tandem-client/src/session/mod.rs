mod session;
mod session_command;
mod signaling_sink;

pub use session::*;
pub use session_command::*;
pub use signaling_sink::*;
