use crate::config::StudioConfig;
use crate::device::{DeviceManager, LocalTrack, MediaDevices, MediaStateChange, OutputSelection};
use crate::directory::GuestDirectory;
use crate::session::join_requests::JoinRequests;
use crate::session::roster::Roster;
use crate::session::session_command::SessionCommand;
use crate::session::session_handle::SessionHandle;
use crate::signaling::{SignalingChannel, SignalingCoordinator};
use crate::transport::{PeerTransportFactory, TransportEvent};
use crate::updates::{JoinOutcome, SessionUpdate, UpdateSink};
use castroom_core::{
    Guest, MediaKind, ParticipantId, Role, RoomId, RoomRef, SignalEvent, StreamState, StudioError,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Who the local side is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub local_id: ParticipantId,
    pub name: String,
    pub role: Role,
    pub room: RoomId,
    pub episode_id: String,
}

impl SessionIdentity {
    pub fn host(name: impl Into<String>, episode_id: impl Into<String>) -> Self {
        let episode_id = episode_id.into();
        Self {
            local_id: ParticipantId::host(),
            name: name.into(),
            role: Role::Host,
            room: RoomId::from(episode_id.as_str()),
            episode_id,
        }
    }

    pub fn guest(
        guest_id: impl Into<ParticipantId>,
        name: impl Into<String>,
        episode_id: impl Into<String>,
    ) -> Self {
        let episode_id = episode_id.into();
        Self {
            local_id: guest_id.into(),
            name: name.into(),
            role: Role::Guest,
            room: RoomId::from(episode_id.as_str()),
            episode_id,
        }
    }
}

/// External collaborators of a session.
#[derive(Clone)]
pub struct SessionPorts {
    pub media: Arc<dyn MediaDevices>,
    pub transports: Arc<dyn PeerTransportFactory>,
    pub signaling: Arc<dyn SignalingChannel>,
    pub directory: Arc<dyn GuestDirectory>,
}

/// Results of background work, fed back into the loop.
pub(super) enum Internal {
    JoinRequestNamed {
        guest_id: ParticipantId,
        generation: u64,
        guest_name: String,
    },
    JoinAck {
        guest_id: ParticipantId,
        generation: u64,
        result: Result<(), String>,
    },
    JoinRequestExpired {
        guest_id: ParticipantId,
        generation: u64,
    },
    RosterLoaded(Result<Vec<Guest>, StudioError>),
}

/// The per-room session actor. Owns the device manager and the signaling
/// coordinator and is the only place either is mutated.
pub struct StudioSession {
    pub(super) identity: SessionIdentity,
    pub(super) config: StudioConfig,
    pub(super) devices: DeviceManager,
    pub(super) coordinator: SignalingCoordinator,
    pub(super) signaling: Arc<dyn SignalingChannel>,
    pub(super) directory: Arc<dyn GuestDirectory>,
    pub(super) updates: UpdateSink,
    pub(super) join_requests: JoinRequests,
    pub(super) roster: Roster,
    command_rx: mpsc::Receiver<SessionCommand>,
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    media_rx: mpsc::UnboundedReceiver<MediaStateChange>,
    pub(super) internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
}

impl StudioSession {
    /// Build a session. Spawn [`StudioSession::run`] and drive it through the handle.
    pub fn new(
        identity: SessionIdentity,
        config: StudioConfig,
        ports: SessionPorts,
    ) -> (Self, SessionHandle, mpsc::UnboundedReceiver<SessionUpdate>) {
        let (command_tx, command_rx) = mpsc::channel(100);
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (updates, update_rx) = UpdateSink::channel();

        let (devices, media_rx) =
            DeviceManager::new(ports.media, config.device.clone(), identity.role);

        let coordinator = SignalingCoordinator::new(
            identity.local_id.clone(),
            identity.room.clone(),
            ports.transports,
            ports.signaling.clone(),
            updates.clone(),
            transport_tx,
        );
        let handle = SessionHandle::new(command_tx, coordinator.phases());

        let session = Self {
            roster: Roster::new(identity.local_id.clone()),
            identity,
            config,
            devices,
            coordinator,
            signaling: ports.signaling,
            directory: ports.directory,
            updates,
            join_requests: JoinRequests::new(),
            command_rx,
            transport_rx,
            media_rx,
            internal_tx,
            internal_rx,
        };
        (session, handle, update_rx)
    }

    pub async fn run(mut self) {
        info!(
            "Session loop started for {} ({:?}) in {}",
            self.identity.local_id, self.identity.role, self.identity.room
        );

        self.start().await;

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SessionCommand::Leave) => break,
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("Command channel closed. Leaving session.");
                            break;
                        }
                    }
                }

                Some(evt) = self.transport_rx.recv() => {
                    self.coordinator.handle_transport_event(evt).await;
                }

                Some(change) = self.media_rx.recv() => {
                    self.handle_media_change(change).await;
                }

                Some(internal) = self.internal_rx.recv() => {
                    self.handle_internal(internal).await;
                }
            }
        }

        self.leave().await;
        info!("Session loop finished");
    }

    async fn start(&mut self) {
        // A successful capture is what grants permission, so media comes
        // before enumeration.
        if let Err(e) = self.devices.start_microphone(None).await {
            self.updates.report(&e);
        }
        if let Err(e) = self.devices.start_camera(None).await {
            self.updates.report(&e);
        }

        self.refresh_devices().await;

        let inventory = self.devices.inventory();
        let mic_missing = self.devices.local_stream().track(MediaKind::Audio).is_none();
        if inventory.audio_available() && mic_missing {
            let before = self.current_track(MediaKind::Audio);
            if let Err(e) = self.devices.start_microphone(None).await {
                self.updates.report(&e);
            }
            self.sync_track(MediaKind::Audio, before).await;
        }

        self.publish_local_media();

        match self.identity.role {
            Role::Guest => {
                let event = SignalEvent::JoinGreenroom(RoomRef {
                    room: self.identity.room.to_string(),
                });
                if let Err(e) = self.signaling.emit(event).await {
                    self.updates.report(&e);
                }
            }
            Role::Host => self.load_roster(),
        }
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Inbound(text) => match SignalEvent::from_json(&text) {
                Ok(event) => self.handle_signal(event).await,
                Err(e) => self.updates.report(&e),
            },

            SessionCommand::Signal(event) => self.handle_signal(event).await,

            SessionCommand::ConnectParticipant(id) => self.connect(&id).await,

            SessionCommand::DisconnectParticipant(id) => {
                self.coordinator.close_connection(&id).await;
            }

            SessionCommand::ToggleCamera => {
                let before = self.current_track(MediaKind::Video);
                if let Err(e) = self.devices.toggle_camera().await {
                    self.updates.report(&e);
                }
                self.sync_track(MediaKind::Video, before).await;
            }

            SessionCommand::ToggleMicrophone => {
                let before = self.current_track(MediaKind::Audio);
                if let Err(e) = self.devices.toggle_microphone().await {
                    self.updates.report(&e);
                }
                self.sync_track(MediaKind::Audio, before).await;
            }

            SessionCommand::SelectCamera(device_id) => {
                let before = self.current_track(MediaKind::Video);
                if let Err(e) = self.devices.select_camera(&device_id).await {
                    self.updates.report(&e);
                }
                self.sync_track(MediaKind::Video, before).await;
            }

            SessionCommand::SelectMicrophone(device_id) => {
                let before = self.current_track(MediaKind::Audio);
                if let Err(e) = self.devices.select_microphone(&device_id).await {
                    self.updates.report(&e);
                }
                self.sync_track(MediaKind::Audio, before).await;
            }

            SessionCommand::SelectSpeaker(device_id) => {
                let selection = self.devices.set_audio_output(&device_id).await;
                match &selection {
                    OutputSelection::Applied(_) => {}
                    OutputSelection::Unsupported => {
                        self.updates
                            .warn("Choosing an audio output is not supported on this platform");
                    }
                    OutputSelection::Failed(reason) => {
                        self.updates
                            .warn(format!("Could not switch audio output: {reason}"));
                    }
                }
                self.updates.send(SessionUpdate::OutputDevice(selection));
            }

            SessionCommand::SetVideoQuality(quality) => {
                let before = self.current_track(MediaKind::Video);
                if let Err(e) = self.devices.set_video_quality(quality).await {
                    self.updates.report(&e);
                }
                self.sync_track(MediaKind::Video, before).await;
            }

            SessionCommand::RefreshDevices => self.refresh_devices().await,

            SessionCommand::RequestJoinStudio => self.request_join_studio().await,

            SessionCommand::ApproveJoin(guest_id) => self.approve_join(&guest_id),

            SessionCommand::DenyJoin { guest_id, reason } => {
                self.deny_join(&guest_id, reason).await;
            }

            SessionCommand::DismissJoin(guest_id) => self.dismiss_join(&guest_id),

            SessionCommand::CancelJoin(guest_id) => self.cancel_join(&guest_id),

            SessionCommand::Leave => {}
        }
    }

    async fn handle_signal(&mut self, event: SignalEvent) {
        debug!("Inbound '{}'", event.name());

        let result = match event {
            SignalEvent::Offer(msg) => {
                self.coordinator
                    .handle_offer(msg, self.devices.local_stream())
                    .await
            }
            SignalEvent::Answer(msg) => self.coordinator.handle_answer(msg).await,
            SignalEvent::IceCandidate(msg) => self.coordinator.handle_ice_candidate(msg).await,

            SignalEvent::UserJoined(joined) => {
                if !self.in_our_room(&joined.room) || joined.user_id.trim().is_empty() {
                    return;
                }
                let id = ParticipantId(joined.user_id);
                if id == self.identity.local_id {
                    return;
                }
                info!("{} ({}) joined the studio", id, joined.user_name);
                self.roster.studio_join(id.clone(), joined.user_name, joined.role);
                self.publish_participants();
                // The member already present makes the offer.
                self.connect(&id).await;
                Ok(())
            }

            SignalEvent::UserLeft(left) => {
                if !self.in_our_room(&left.room) {
                    return;
                }
                let id = ParticipantId(left.user_id);
                info!("{} left", id);
                self.coordinator.close_connection(&id).await;
                self.roster.remove(&id);
                self.cancel_join(&id);
                self.publish_participants();
                Ok(())
            }

            SignalEvent::GreenroomUsers(list) => {
                if self.in_our_room(&list.room) {
                    self.roster.set_greenroom(list.users);
                    self.publish_participants();
                }
                Ok(())
            }

            SignalEvent::UpdateStreamState(state) => {
                if self.in_our_room(&state.room) {
                    self.roster.apply_stream_state(&state);
                    self.publish_participants();
                }
                Ok(())
            }

            SignalEvent::RequestJoinStudio(request) => {
                self.receive_join_request(request);
                Ok(())
            }

            SignalEvent::JoinStudioApproved(decision) => {
                self.join_decision(decision, true);
                Ok(())
            }

            SignalEvent::JoinStudioDenied(decision) => {
                self.join_decision(decision, false);
                Ok(())
            }

            SignalEvent::JoinGreenroom(_)
            | SignalEvent::ApproveJoinStudio(_)
            | SignalEvent::DenyJoinStudio(_) => {
                debug!("Ignoring outbound-only event");
                Ok(())
            }
        };

        if let Err(e) = result {
            self.updates.report(&e);
        }
    }

    async fn handle_internal(&mut self, internal: Internal) {
        match internal {
            Internal::JoinRequestNamed {
                guest_id,
                generation,
                guest_name,
            } => self.show_join_request(&guest_id, generation, guest_name),
            Internal::JoinAck {
                guest_id,
                generation,
                result,
            } => self.join_acknowledged(&guest_id, generation, result),
            Internal::JoinRequestExpired {
                guest_id,
                generation,
            } => self.join_expired(&guest_id, generation),
            Internal::RosterLoaded(Ok(guests)) => {
                debug!("Loaded {} episode guests", guests.len());
                self.roster.set_episode_guests(guests);
                self.publish_participants();
            }
            Internal::RosterLoaded(Err(e)) => self.updates.report(&e),
        }
    }

    async fn connect(&mut self, id: &ParticipantId) {
        if let Err(e) = self
            .coordinator
            .connect_to_participant(id, self.devices.local_stream())
            .await
        {
            self.updates.report(&e);
        }
    }

    async fn handle_media_change(&mut self, change: MediaStateChange) {
        let (is_camera_active, is_mic_active) = match change.kind {
            MediaKind::Video => (Some(change.active), None),
            MediaKind::Audio => (None, Some(change.active)),
        };
        let event = SignalEvent::UpdateStreamState(StreamState {
            room: self.identity.room.to_string(),
            user_id: self.identity.local_id.to_string(),
            is_camera_active,
            is_mic_active,
        });
        if let Err(e) = self.signaling.emit(event).await {
            self.updates.report(&e);
        }
        self.publish_local_media();
    }

    async fn refresh_devices(&mut self) {
        match self.devices.enumerate_and_populate().await {
            Ok(inventory) => {
                if !inventory.video_available() {
                    self.updates
                        .warn("No camera detected. Continuing with audio only.");
                }
                if !inventory.audio_available() {
                    self.updates
                        .error("No microphone detected. A microphone is required to join.");
                }
                self.updates.send(SessionUpdate::Devices(inventory));
            }
            Err(e) => self.updates.report(&e),
        }
    }

    fn current_track(&self, kind: MediaKind) -> Option<LocalTrack> {
        self.devices.local_stream().track(kind).cloned()
    }

    /// Push a newly acquired track to every open connection.
    async fn sync_track(&mut self, kind: MediaKind, before: Option<LocalTrack>) {
        let Some(track) = self.current_track(kind) else {
            return;
        };
        if before.is_some_and(|b| b.same_track(&track)) {
            return;
        }
        self.coordinator.replace_local_track(&track).await;
    }

    fn load_roster(&self) {
        let directory = self.directory.clone();
        let episode_id = self.identity.episode_id.clone();
        let tx = self.internal_tx.clone();

        tokio::spawn(async move {
            let result = directory.guests_for_episode(&episode_id).await;
            let _ = tx.send(Internal::RosterLoaded(result));
        });
    }

    pub(super) fn publish_participants(&self) {
        let rows = self
            .roster
            .participant_rows(&self.join_requests.pending_ids());
        self.updates.send(SessionUpdate::Participants(rows));
    }

    fn publish_local_media(&self) {
        self.updates.send(SessionUpdate::LocalMedia {
            camera_active: self.devices.camera_active(),
            mic_active: self.devices.mic_active(),
        });
    }

    pub(super) fn in_our_room(&self, room: &str) -> bool {
        if room == self.identity.room.as_str() {
            return true;
        }
        debug!("Ignoring event for room {}", room);
        false
    }

    async fn leave(&mut self) {
        for (request, outcome) in self.join_requests.resolve_all(JoinOutcome::Cancelled) {
            self.updates.send(SessionUpdate::JoinRequestClosed {
                guest_id: request.guest_id,
                outcome,
            });
        }

        self.coordinator.close_all().await;
        self.devices.stop_all();
        info!("{} left {}", self.identity.local_id, self.identity.room);
    }
}
