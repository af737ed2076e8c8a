mod signaling_connection;

pub use signaling_connection::*;
