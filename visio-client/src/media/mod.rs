mod media_constraints;
mod media_source;
mod media_stream;

pub use media_constraints::*;
pub use media_source::*;
pub use media_stream::*;
