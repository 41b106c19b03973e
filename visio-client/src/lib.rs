pub mod error;
pub mod media;
pub mod negotiation;
pub mod session;
pub mod signaling;
pub mod transport;

pub use error::*;
pub use media::*;
pub use negotiation::*;
pub use session::*;
pub use signaling::*;
pub use transport::*;
