use crate::device::{DeviceInventory, OutputSelection};
use crate::signaling::ConnectionPhase;
use crate::transport::RemoteTrack;
use castroom_core::{JoinRequest, ParticipantId, ParticipantStatus, StudioError};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// User-facing message. Failures end up here instead of propagating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NoticeLevel,
    pub message: String,
    pub retryable: bool,
}

/// Where inbound video is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSlot {
    /// The single remote-video element, used while exactly one peer is connected.
    Shared,
    Participant(ParticipantId),
}

/// One line of the host's participant list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRow {
    pub id: ParticipantId,
    pub name: String,
    pub status: ParticipantStatus,
    pub is_camera_active: bool,
    pub is_mic_active: bool,
}

/// How a join request left the pending set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Approved,
    Denied,
    Dismissed,
    Cancelled,
    Expired,
    /// A newer request from the same guest replaced it.
    Superseded,
}

/// Everything the session reports to its UI.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    Notice(Notification),
    Participants(Vec<ParticipantRow>),
    JoinRequestShown(JoinRequest),
    JoinRequestClosed {
        guest_id: ParticipantId,
        outcome: JoinOutcome,
    },
    /// Guest side: the host let us into the studio.
    JoinApproved {
        episode_id: String,
    },
    JoinDenied {
        reason: Option<String>,
    },
    RemoteTrack {
        participant: ParticipantId,
        slot: VideoSlot,
        track: RemoteTrack,
    },
    RemoteStreamEnded {
        participant: ParticipantId,
    },
    ConnectionState {
        participant: ParticipantId,
        phase: Option<ConnectionPhase>,
    },
    LocalMedia {
        camera_active: bool,
        mic_active: bool,
    },
    Devices(DeviceInventory),
    OutputDevice(OutputSelection),
}

/// Sending half of the UI update stream.
#[derive(Clone)]
pub struct UpdateSink {
    tx: mpsc::UnboundedSender<SessionUpdate>,
}

impl UpdateSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, update: SessionUpdate) {
        // The UI may be gone while the session winds down.
        let _ = self.tx.send(update);
    }

    fn notice(&self, level: NoticeLevel, message: String, retryable: bool) {
        self.send(SessionUpdate::Notice(Notification {
            level,
            message,
            retryable,
        }));
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.notice(NoticeLevel::Info, message, false);
    }

    /// Error notice the user can act on by retrying.
    pub fn retryable(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.notice(NoticeLevel::Error, message, true);
    }

    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.notice(NoticeLevel::Warning, message, false);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.notice(NoticeLevel::Error, message, false);
    }

    pub fn report(&self, err: &StudioError) {
        let level = match err {
            StudioError::Permission(_)
            | StudioError::Device(_)
            | StudioError::Unsupported(_)
            | StudioError::Directory(_) => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        };
        match level {
            NoticeLevel::Warning => warn!("{}", err),
            _ => error!("{}", err),
        }
        self.notice(level, err.to_string(), err.is_retryable());
    }
}
