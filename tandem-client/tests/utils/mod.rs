pub mod loopback;

pub use loopback::*;
pub use mock_peer::*;
