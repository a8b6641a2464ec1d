use std::fmt;

/// Negotiation progress of one participant connection.
/// A participant without an entry is idle or closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Local offer sent, waiting for the answer.
    Offering,
    /// Remote offer applied, answer being produced.
    Answering,
    /// Remote answer applied.
    Answered,
    Connected,
    Failed,
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Offering => "offering",
            Self::Answering => "answering",
            Self::Answered => "answered",
            Self::Connected => "connected",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}
