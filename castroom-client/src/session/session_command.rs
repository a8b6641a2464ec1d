use castroom_core::{ParticipantId, SignalEvent, VideoQuality};

/// Commands the UI (or the socket owner) sends into a running session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Raw socket text. Parsed by the session so garbage can be reported.
    Inbound(String),
    Signal(SignalEvent),

    ConnectParticipant(ParticipantId),
    DisconnectParticipant(ParticipantId),

    ToggleCamera,
    ToggleMicrophone,
    SelectCamera(String),
    SelectMicrophone(String),
    SelectSpeaker(String),
    SetVideoQuality(VideoQuality),
    RefreshDevices,

    /// Guest side: ask the host to be let into the studio.
    RequestJoinStudio,
    ApproveJoin(ParticipantId),
    DenyJoin {
        guest_id: ParticipantId,
        reason: String,
    },
    /// Modal closed without a decision.
    DismissJoin(ParticipantId),
    /// Host-side abort of a pending request.
    CancelJoin(ParticipantId),

    Leave,
}
