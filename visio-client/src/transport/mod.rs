mod connection_wrapper;
mod media_transport;
mod transport_config;
mod transport_event;

pub use connection_wrapper::*;
pub use media_transport::*;
pub use transport_config::*;
pub use transport_event::*;
