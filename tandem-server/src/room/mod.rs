mod room_membership;

pub use room_membership::*;
