use crate::session::session_command::SessionCommand;
use crate::signaling::ConnectionPhase;
use castroom_core::{ParticipantId, SignalEvent, StudioError, VideoQuality};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Cheap, clonable front door to a running [`StudioSession`](crate::StudioSession).
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
    phases: Arc<DashMap<ParticipantId, ConnectionPhase>>,
}

impl SessionHandle {
    pub(crate) fn new(
        tx: mpsc::Sender<SessionCommand>,
        phases: Arc<DashMap<ParticipantId, ConnectionPhase>>,
    ) -> Self {
        Self { tx, phases }
    }

    pub async fn send(&self, cmd: SessionCommand) -> Result<(), StudioError> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| StudioError::Signaling("session has ended".into()))
    }

    /// Hand over one raw socket message.
    pub async fn deliver_text(&self, text: impl Into<String>) -> Result<(), StudioError> {
        self.send(SessionCommand::Inbound(text.into())).await
    }

    pub async fn deliver(&self, event: SignalEvent) -> Result<(), StudioError> {
        self.send(SessionCommand::Signal(event)).await
    }

    pub async fn connect(&self, participant: ParticipantId) -> Result<(), StudioError> {
        self.send(SessionCommand::ConnectParticipant(participant))
            .await
    }

    pub async fn disconnect(&self, participant: ParticipantId) -> Result<(), StudioError> {
        self.send(SessionCommand::DisconnectParticipant(participant))
            .await
    }

    pub async fn toggle_camera(&self) -> Result<(), StudioError> {
        self.send(SessionCommand::ToggleCamera).await
    }

    pub async fn toggle_microphone(&self) -> Result<(), StudioError> {
        self.send(SessionCommand::ToggleMicrophone).await
    }

    pub async fn select_camera(&self, device_id: impl Into<String>) -> Result<(), StudioError> {
        self.send(SessionCommand::SelectCamera(device_id.into()))
            .await
    }

    pub async fn select_microphone(&self, device_id: impl Into<String>) -> Result<(), StudioError> {
        self.send(SessionCommand::SelectMicrophone(device_id.into()))
            .await
    }

    pub async fn select_speaker(&self, device_id: impl Into<String>) -> Result<(), StudioError> {
        self.send(SessionCommand::SelectSpeaker(device_id.into()))
            .await
    }

    pub async fn set_video_quality(&self, quality: VideoQuality) -> Result<(), StudioError> {
        self.send(SessionCommand::SetVideoQuality(quality)).await
    }

    pub async fn refresh_devices(&self) -> Result<(), StudioError> {
        self.send(SessionCommand::RefreshDevices).await
    }

    pub async fn request_join_studio(&self) -> Result<(), StudioError> {
        self.send(SessionCommand::RequestJoinStudio).await
    }

    pub async fn approve_join(&self, guest_id: ParticipantId) -> Result<(), StudioError> {
        self.send(SessionCommand::ApproveJoin(guest_id)).await
    }

    pub async fn deny_join(
        &self,
        guest_id: ParticipantId,
        reason: impl Into<String>,
    ) -> Result<(), StudioError> {
        self.send(SessionCommand::DenyJoin {
            guest_id,
            reason: reason.into(),
        })
        .await
    }

    pub async fn dismiss_join(&self, guest_id: ParticipantId) -> Result<(), StudioError> {
        self.send(SessionCommand::DismissJoin(guest_id)).await
    }

    pub async fn cancel_join(&self, guest_id: ParticipantId) -> Result<(), StudioError> {
        self.send(SessionCommand::CancelJoin(guest_id)).await
    }

    pub async fn leave(&self) -> Result<(), StudioError> {
        self.send(SessionCommand::Leave).await
    }

    pub fn connection_phase(&self, participant: &ParticipantId) -> Option<ConnectionPhase> {
        self.phases.get(participant).map(|p| *p)
    }

    /// Snapshot of every open connection, sorted by participant.
    pub fn connections(&self) -> Vec<(ParticipantId, ConnectionPhase)> {
        let mut all: Vec<_> = self
            .phases
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
