mod local_media;
mod peer_connection;
mod session;
mod session_command;
mod session_config;
mod session_event;

pub use local_media::*;
pub use peer_connection::*;
pub use session::*;
pub use session_command::*;
pub use session_config::*;
pub use session_event::*;
