mod message;
mod peer;
mod signaling;

pub use message::{Message, MessageKind};
pub use peer::{PeerId, Role, UNKNOWN_ID};
pub use signaling::{
    IceCandidate, IceServerConfig, SdpType, ServerErrorCode, SessionDescription, Signal,
    SignalingState,
};
