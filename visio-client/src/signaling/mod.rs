mod backoff;
mod signaling_channel;
mod signaling_output;
mod signaling_transport;
mod ws_transport;

pub use backoff::*;
pub use signaling_channel::*;
pub use signaling_output::*;
pub use signaling_transport::*;
pub use ws_transport::*;
