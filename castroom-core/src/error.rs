use crate::model::ParticipantId;
use thiserror::Error;

/// Failures surfaced by the studio engine.
#[derive(Error, Debug)]
pub enum StudioError {
    /// Media permission was not granted (device labels unavailable, access denied).
    #[error("Media permission denied: {0}")]
    Permission(String),

    /// Device missing, busy or unable to satisfy the constraints.
    #[error("Device unavailable: {0}")]
    Device(String),

    /// Camera access attempted outside a secure context.
    #[error("Insecure context: {0}")]
    Security(String),

    /// Inbound socket payload lacked a required field.
    #[error("Malformed '{event}' message: missing '{field}'")]
    SignalingValidation {
        event: &'static str,
        field: &'static str,
    },

    /// Offer/answer/candidate application failed.
    #[error("Negotiation with {participant} failed: {source:#}")]
    Negotiation {
        participant: ParticipantId,
        #[source]
        source: anyhow::Error,
    },

    #[error("Capability not supported: {0}")]
    Unsupported(&'static str),

    #[error("Signaling channel error: {0}")]
    Signaling(String),

    #[error("Guest lookup failed: {0}")]
    Directory(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StudioError {
    pub fn negotiation(participant: &ParticipantId, source: anyhow::Error) -> Self {
        Self::Negotiation {
            participant: participant.clone(),
            source,
        }
    }

    /// Whether the UI should offer a retry for this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Negotiation { .. } | Self::Signaling(_))
    }
}
