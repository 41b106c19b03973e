use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: &str) -> Self {
        Self {
            urls: vec![url.to_owned()],
            username: None,
            credential: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

impl SdpType {
    pub fn as_str(self) -> &'static str {
        match self {
            SdpType::Offer => "offer",
            SdpType::Answer => "answer",
        }
    }
}

impl FromStr for SdpType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offer" => Ok(SdpType::Offer),
            "answer" => Ok(SdpType::Answer),
            other => Err(ProtocolError::InvalidSdpType(other.to_owned())),
        }
    }
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Trickle ICE candidate. `sdp_mid` travels as the first wire param and may be
/// empty, which maps to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    pub sdp_mid: Option<String>,
}

/// Signaling state reported by a media transport engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    HaveLocalPranswer,
    HaveRemotePranswer,
    Closed,
}

/// Error codes the signaling server reports in `error` messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerErrorCode {
    NotFound,
    NotConnected,
    Other(String),
}

impl ServerErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ServerErrorCode::NotFound => "not_found",
            ServerErrorCode::NotConnected => "not_connected",
            ServerErrorCode::Other(code) => code,
        }
    }

    /// Human readable text for logs.
    pub fn description(&self) -> &'static str {
        match self {
            ServerErrorCode::NotFound => "Not found",
            ServerErrorCode::NotConnected => "Not connected",
            ServerErrorCode::Other(_) => "Unknown error",
        }
    }
}

impl From<&str> for ServerErrorCode {
    fn from(code: &str) -> Self {
        match code {
            "not_found" => ServerErrorCode::NotFound,
            "not_connected" => ServerErrorCode::NotConnected,
            other => ServerErrorCode::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for ServerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed view of a [`Message`](crate::model::Message).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Server assigned the local id (carried in the message id).
    Register,
    /// A remote participant became visible.
    Join,
    /// A remote participant went away.
    Leave,
    Description(SessionDescription),
    Candidate(IceCandidate),
    Error(ServerErrorCode),
}
