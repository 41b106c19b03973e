use crate::error::ProtocolError;
use crate::model::peer::{PeerId, UNKNOWN_ID};
use crate::model::signaling::{IceCandidate, ServerErrorCode, SessionDescription, Signal};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Register,
    Join,
    Leave,
    Description,
    Candidate,
    Error,
    /// Any tag this client does not understand, kept verbatim.
    Other(String),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Register => "register",
            MessageKind::Join => "join",
            MessageKind::Leave => "leave",
            MessageKind::Description => "description",
            MessageKind::Candidate => "candidate",
            MessageKind::Error => "error",
            MessageKind::Other(tag) => tag,
        }
    }
}

impl From<&str> for MessageKind {
    fn from(tag: &str) -> Self {
        match tag {
            "register" => MessageKind::Register,
            "join" => MessageKind::Join,
            "leave" => MessageKind::Leave,
            "description" => MessageKind::Description,
            "candidate" => MessageKind::Candidate,
            "error" => MessageKind::Error,
            other => MessageKind::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One signaling frame.
///
/// Wire form is a header line `<id> <type> [param]*` followed by `\n` and the
/// body. The body may span several lines and is always the last field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: PeerId,
    pub kind: MessageKind,
    pub params: Vec<String>,
    pub body: String,
}

impl Message {
    pub fn new(id: impl Into<PeerId>, kind: MessageKind) -> Self {
        Self {
            id: id.into(),
            kind,
            params: Vec::new(),
            body: String::new(),
        }
    }

    pub fn with_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// `description` message addressed to `to`.
    pub fn description(to: &PeerId, description: &SessionDescription) -> Self {
        Self::new(to.clone(), MessageKind::Description)
            .with_params([description.sdp_type.as_str()])
            .with_body(description.sdp.clone())
    }

    /// `candidate` message addressed to `to`; a missing mid becomes an empty
    /// param.
    pub fn candidate(to: &PeerId, candidate: &IceCandidate) -> Self {
        Self::new(to.clone(), MessageKind::Candidate)
            .with_params([candidate.sdp_mid.clone().unwrap_or_default()])
            .with_body(candidate.candidate.clone())
    }

    /// Parses wire text. Never fails: missing header fields fall back to
    /// `"unknown"`.
    pub fn deserialize(raw: &str) -> Self {
        let (header, body) = raw.split_once('\n').unwrap_or((raw, ""));

        let mut fields = header.split(' ');
        let id = fields
            .next()
            .filter(|field| !field.is_empty())
            .unwrap_or(UNKNOWN_ID);
        let kind = fields
            .next()
            .filter(|field| !field.is_empty())
            .unwrap_or(UNKNOWN_ID);

        Self {
            id: PeerId::from(id),
            kind: MessageKind::from(kind),
            params: fields.map(str::to_owned).collect(),
            body: body.to_owned(),
        }
    }

    pub fn serialize(&self) -> String {
        let mut out = String::with_capacity(
            self.id.as_str().len() + self.kind.as_str().len() + self.body.len() + 2,
        );
        out.push_str(self.id.as_str());
        out.push(' ');
        out.push_str(self.kind.as_str());
        for param in &self.params {
            out.push(' ');
            out.push_str(param);
        }
        out.push('\n');
        out.push_str(&self.body);
        out
    }

    /// Converts the frame into its typed form.
    pub fn signal(&self) -> Result<Signal, ProtocolError> {
        match &self.kind {
            MessageKind::Register => Ok(Signal::Register),
            MessageKind::Join => Ok(Signal::Join),
            MessageKind::Leave => Ok(Signal::Leave),
            MessageKind::Description => {
                let sdp_type = self
                    .params
                    .first()
                    .ok_or(ProtocolError::MissingSdpType)?
                    .parse()?;
                Ok(Signal::Description(SessionDescription {
                    sdp_type,
                    sdp: self.body.clone(),
                }))
            }
            MessageKind::Candidate => Ok(Signal::Candidate(IceCandidate {
                candidate: self.body.clone(),
                sdp_mid: self.params.first().filter(|mid| !mid.is_empty()).cloned(),
            })),
            MessageKind::Error => Ok(Signal::Error(ServerErrorCode::from(
                self.params.first().map(String::as_str).unwrap_or_default(),
            ))),
            MessageKind::Other(tag) => Err(ProtocolError::UnknownKind(tag.clone())),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}
