use thiserror::Error;

/// A frame that parsed but does not fit the signaling protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("unexpected signaling message of type \"{0}\"")]
    UnknownKind(String),

    #[error("description message without a type")]
    MissingSdpType,

    #[error("unsupported description type \"{0}\"")]
    InvalidSdpType(String),
}
