use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier used by the host side of every session.
pub const HOST_MARKER: &str = "host";

/// Stable identity of a session member: a guest id or [`HOST_MARKER`].
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn host() -> Self {
        Self(HOST_MARKER.to_owned())
    }

    pub fn is_host(&self) -> bool {
        self.0 == HOST_MARKER
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Guest,
}

/// A remote peer in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub role: Role,
    pub is_ready: bool,
    pub is_camera_active: bool,
    pub is_mic_active: bool,
}

impl Participant {
    pub fn new(id: ParticipantId, name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            is_ready: false,
            is_camera_active: false,
            is_mic_active: false,
        }
    }
}

/// How a participant is shown in the host's roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipantStatus {
    InStudio,
    AwaitingApproval,
    NotConnected,
}

impl ParticipantStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::InStudio => "In Studio",
            Self::AwaitingApproval => "Awaiting Approval",
            Self::NotConnected => "Not Connected",
        }
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
