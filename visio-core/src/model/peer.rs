use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder used when a wire header carries no id.
pub const UNKNOWN_ID: &str = "unknown";

/// Participant identifier assigned by the signaling server at registration.
///
/// The value is opaque; the only thing the client relies on is the total
/// order, which decides who yields during an offer collision (see [`Role`]).
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct PeerId(pub String);

impl PeerId {
    pub fn unknown() -> Self {
        Self(UNKNOWN_ID.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for PeerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Side taken by the local peer when both ends of a pair offer at once.
///
/// The impolite side keeps its own offer and drops the remote one; the polite
/// side rolls back and answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Polite,
    Impolite,
}

impl Role {
    /// Derives the local role for the pair `(local, remote)`.
    ///
    /// Impolite iff `remote` does not compare less than `local`, so the two
    /// ends of a pair always land on opposite roles.
    pub fn for_pair(local: &PeerId, remote: &PeerId) -> Self {
        if remote < local {
            Role::Polite
        } else {
            Role::Impolite
        }
    }

    pub fn is_polite(self) -> bool {
        matches!(self, Role::Polite)
    }
}
