mod media_stream;
mod remote_stream;

pub use media_stream::*;
pub use remote_stream::*;
