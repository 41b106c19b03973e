pub use visio_core::{Message, MessageKind, PeerId, Role, Signal};

pub mod model {
    pub use visio_core::model::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use visio_client::*;
}
