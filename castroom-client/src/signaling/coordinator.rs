use crate::device::{LocalMediaStream, LocalTrack};
use crate::signaling::candidate_queue::CandidateQueue;
use crate::signaling::connection_phase::ConnectionPhase;
use crate::signaling::signaling_channel::SignalingChannel;
use crate::transport::{
    ConnectionKey, PeerConnectionState, PeerTransport, PeerTransportFactory, SignalingState,
    TransportEvent,
};
use crate::updates::{SessionUpdate, UpdateSink, VideoSlot};
use anyhow::anyhow;
use castroom_core::{
    AnswerMessage, IceCandidate, IceCandidateMessage, OfferMessage, ParticipantId, RoomId, Routed,
    SessionDescription, SignalEvent, StudioError,
};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

struct PeerEntry {
    serial: u64,
    transport: Box<dyn PeerTransport>,
    /// Answer that arrived outside `have-local-offer`. Latest wins.
    pending_answer: Option<SessionDescription>,
}

/// Owns every peer connection of one local participant in one room.
pub struct SignalingCoordinator {
    local_id: ParticipantId,
    room: RoomId,
    factory: Arc<dyn PeerTransportFactory>,
    signaling: Arc<dyn SignalingChannel>,
    updates: UpdateSink,
    transport_tx: mpsc::UnboundedSender<TransportEvent>,
    peers: HashMap<ParticipantId, PeerEntry>,
    candidate_queues: HashMap<ParticipantId, CandidateQueue>,
    phases: Arc<DashMap<ParticipantId, ConnectionPhase>>,
    next_serial: u64,
}

impl SignalingCoordinator {
    pub fn new(
        local_id: ParticipantId,
        room: RoomId,
        factory: Arc<dyn PeerTransportFactory>,
        signaling: Arc<dyn SignalingChannel>,
        updates: UpdateSink,
        transport_tx: mpsc::UnboundedSender<TransportEvent>,
    ) -> Self {
        Self {
            local_id,
            room,
            factory,
            signaling,
            updates,
            transport_tx,
            peers: HashMap::new(),
            candidate_queues: HashMap::new(),
            phases: Arc::new(DashMap::new()),
            next_serial: 0,
        }
    }

    /// Open a connection to `participant`, attach the local tracks and send an offer.
    /// An existing connection for the same participant is torn down first.
    pub async fn connect_to_participant(
        &mut self,
        participant: &ParticipantId,
        stream: &LocalMediaStream,
    ) -> Result<(), StudioError> {
        if self.peers.contains_key(participant) {
            info!("Replacing existing connection for {}", participant);
            self.close_connection(participant).await;
        }

        self.open_connection(participant, stream).await?;

        let offer = match self.transport(participant)?.create_offer().await {
            Ok(offer) => offer,
            Err(e) => {
                let err = StudioError::negotiation(participant, e);
                return Err(self.fail_connection(participant, err).await);
            }
        };
        self.set_phase(participant, ConnectionPhase::Offering);

        info!("Sending offer to {}", participant);
        let sent = self
            .signaling
            .emit(SignalEvent::Offer(OfferMessage::new(
                &self.room,
                participant,
                &self.local_id,
                offer,
            )))
            .await;
        if let Err(e) = sent {
            return Err(self.fail_connection(participant, e).await);
        }

        self.apply_held_answer(participant).await;
        Ok(())
    }

    async fn open_connection(
        &mut self,
        participant: &ParticipantId,
        stream: &LocalMediaStream,
    ) -> Result<(), StudioError> {
        self.next_serial += 1;
        let key = ConnectionKey {
            participant: participant.clone(),
            serial: self.next_serial,
        };

        let transport = self
            .factory
            .create(key.clone(), self.transport_tx.clone())
            .await
            .map_err(|e| StudioError::negotiation(participant, e))?;

        for track in stream.tracks().iter().filter(|t| !t.is_stopped()) {
            if let Err(e) = transport.add_local_track(track).await {
                let _ = transport.close().await;
                return Err(StudioError::negotiation(participant, e));
            }
        }

        info!(
            "Connection {} created with {} local tracks",
            key,
            stream.tracks().len()
        );
        self.peers.insert(
            participant.clone(),
            PeerEntry {
                serial: key.serial,
                transport,
                pending_answer: None,
            },
        );
        Ok(())
    }

    /// Apply a remote offer and answer it. A missing connection is created.
    pub async fn handle_offer(
        &mut self,
        msg: OfferMessage,
        stream: &LocalMediaStream,
    ) -> Result<(), StudioError> {
        let routed = msg.validate()?;
        if !self.addressed_to_us(&routed, "offer") {
            return Ok(());
        }
        let from = routed.from;

        if !self.peers.contains_key(&from) {
            info!("Offer from {} without a connection, creating one", from);
            self.open_connection(&from, stream).await?;
        }
        self.set_phase(&from, ConnectionPhase::Answering);

        let answer = match self.answer_offer(&from, routed.payload).await {
            Ok(answer) => answer,
            Err(e) => return Err(self.fail_connection(&from, e).await),
        };

        info!("Sending answer to {}", from);
        let sent = self
            .signaling
            .emit(SignalEvent::Answer(AnswerMessage::new(
                &self.room,
                &from,
                &self.local_id,
                answer,
            )))
            .await;
        match sent {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail_connection(&from, e).await),
        }
    }

    async fn answer_offer(
        &mut self,
        from: &ParticipantId,
        offer: SessionDescription,
    ) -> Result<SessionDescription, StudioError> {
        self.transport(from)?
            .set_remote_description(offer)
            .await
            .map_err(|e| StudioError::negotiation(from, e))?;

        self.drain_candidates(from).await;

        self.transport(from)?
            .create_answer()
            .await
            .map_err(|e| StudioError::negotiation(from, e))
    }

    /// Apply a remote answer, or hold it until the connection reaches `have-local-offer`.
    pub async fn handle_answer(&mut self, msg: AnswerMessage) -> Result<(), StudioError> {
        let routed = msg.validate()?;
        if !self.addressed_to_us(&routed, "answer") {
            return Ok(());
        }
        let from = routed.from;

        let Some(entry) = self.peers.get_mut(&from) else {
            warn!("Answer from {} has no connection, dropping it", from);
            return Ok(());
        };

        let state = entry.transport.signaling_state();
        if state != SignalingState::HaveLocalOffer {
            info!("Holding answer from {} until have-local-offer (now {:?})", from, state);
            entry.pending_answer = Some(routed.payload);
            return Ok(());
        }

        self.apply_answer(&from, routed.payload).await
    }

    async fn apply_answer(
        &mut self,
        from: &ParticipantId,
        answer: SessionDescription,
    ) -> Result<(), StudioError> {
        if let Err(e) = self.transport(from)?.set_remote_description(answer).await {
            let err = StudioError::negotiation(from, e);
            return Err(self.fail_connection(from, err).await);
        }

        debug!("Applied answer from {}", from);
        self.set_phase(from, ConnectionPhase::Answered);
        self.drain_candidates(from).await;
        Ok(())
    }

    async fn apply_held_answer(&mut self, participant: &ParticipantId) {
        let Some(entry) = self.peers.get_mut(participant) else {
            return;
        };
        if entry.transport.signaling_state() != SignalingState::HaveLocalOffer {
            return;
        }
        let Some(answer) = entry.pending_answer.take() else {
            return;
        };

        info!("Applying held answer from {}", participant);
        if let Err(e) = self.apply_answer(participant, answer).await {
            self.updates.report(&e);
        }
    }

    /// Apply a remote candidate now, or queue it until the remote description is set.
    pub async fn handle_ice_candidate(
        &mut self,
        msg: IceCandidateMessage,
    ) -> Result<(), StudioError> {
        let routed = msg.validate()?;
        if !self.addressed_to_us(&routed, "ice_candidate") {
            return Ok(());
        }
        let from = routed.from;

        let ready = match self.peers.get(&from) {
            Some(entry) => entry.transport.has_remote_description().await,
            None => false,
        };

        if !ready {
            let queue = self.candidate_queues.entry(from.clone()).or_default();
            queue.push(routed.payload);
            debug!("Queued candidate from {} ({} waiting)", from, queue.len());
            return Ok(());
        }

        self.apply_candidate(&from, routed.payload).await;
        Ok(())
    }

    async fn drain_candidates(&mut self, participant: &ParticipantId) {
        let Some(mut queue) = self.candidate_queues.remove(participant) else {
            return;
        };
        let queued = queue.drain();
        if queued.is_empty() {
            return;
        }

        debug!("Draining {} candidates for {}", queued.len(), participant);
        for candidate in queued {
            self.apply_candidate(participant, candidate).await;
        }
    }

    async fn apply_candidate(&self, participant: &ParticipantId, candidate: IceCandidate) {
        let Some(entry) = self.peers.get(participant) else {
            return;
        };
        let Err(e) = entry.transport.add_ice_candidate(candidate).await else {
            return;
        };
        warn!("Failed to add ICE candidate for {}: {:?}", participant, e);
    }

    /// Swap a local track on every connection after a device switch.
    pub async fn replace_local_track(&self, track: &LocalTrack) {
        for (participant, entry) in &self.peers {
            if let Err(e) = entry.transport.replace_local_track(track).await {
                warn!(
                    "Failed to replace {} track for {}: {:?}",
                    track.kind(),
                    participant,
                    e
                );
            }
        }
    }

    /// Tear down one connection. Local tracks are left running.
    /// Returns whether a connection existed.
    pub async fn close_connection(&mut self, participant: &ParticipantId) -> bool {
        self.candidate_queues.remove(participant);
        self.phases.remove(participant);

        let Some(entry) = self.peers.remove(participant) else {
            return false;
        };

        info!("Closing connection {}#{}", participant, entry.serial);
        if let Err(e) = entry.transport.close().await {
            warn!("Error closing connection for {}: {:?}", participant, e);
        }

        self.updates.send(SessionUpdate::RemoteStreamEnded {
            participant: participant.clone(),
        });
        self.updates.send(SessionUpdate::ConnectionState {
            participant: participant.clone(),
            phase: None,
        });
        true
    }

    /// A negotiation step failed: report the phase, then drop the connection
    /// so it no longer counts as a peer.
    async fn fail_connection(
        &mut self,
        participant: &ParticipantId,
        error: StudioError,
    ) -> StudioError {
        warn!("Dropping connection to {}: {}", participant, error);
        self.set_phase(participant, ConnectionPhase::Failed);
        self.close_connection(participant).await;
        error
    }

    pub async fn close_all(&mut self) {
        let entries: Vec<_> = self.peers.drain().collect();
        self.candidate_queues.clear();
        self.phases.clear();

        let closes = entries.iter().map(|(_, entry)| entry.transport.close());
        let results = futures::future::join_all(closes).await;
        for ((participant, _), result) in entries.iter().zip(results) {
            if let Err(e) = result {
                warn!("Error closing connection for {}: {:?}", participant, e);
            }
        }
        info!("Closed {} connections", entries.len());
    }

    pub async fn handle_transport_event(&mut self, event: TransportEvent) {
        let key = event.key().clone();
        let current = self.peers.get(&key.participant).map(|e| e.serial);
        if current != Some(key.serial) {
            debug!("Ignoring event from stale connection {}", key);
            return;
        }
        let participant = key.participant;

        match event {
            TransportEvent::CandidateGenerated(_, candidate) => {
                let msg =
                    IceCandidateMessage::new(&self.room, &participant, &self.local_id, candidate);
                if let Err(e) = self.signaling.emit(SignalEvent::IceCandidate(msg)).await {
                    self.updates.report(&e);
                }
            }

            TransportEvent::TrackReceived(_, track) => {
                let slot = if self.peers.len() == 1 {
                    VideoSlot::Shared
                } else {
                    VideoSlot::Participant(participant.clone())
                };
                info!("Remote {} track from {} -> {:?}", track.kind, participant, slot);
                self.updates.send(SessionUpdate::RemoteTrack {
                    participant,
                    slot,
                    track,
                });
            }

            TransportEvent::StateChanged(_, state) => match state {
                PeerConnectionState::Connected => {
                    self.set_phase(&participant, ConnectionPhase::Connected);
                }
                PeerConnectionState::Disconnected => {
                    // ICE often recovers from this on its own.
                    info!("Connection to {} interrupted", participant);
                    self.updates.warn(format!(
                        "Connection to {participant} interrupted, waiting for it to recover"
                    ));
                }
                PeerConnectionState::Failed => {
                    self.set_phase(&participant, ConnectionPhase::Failed);
                    let err = StudioError::negotiation(
                        &participant,
                        anyhow!("peer connection is {:?}", state),
                    );
                    self.updates.report(&err);
                }
                PeerConnectionState::Closed => {
                    self.close_connection(&participant).await;
                }
                PeerConnectionState::New | PeerConnectionState::Connecting => {}
            },

            TransportEvent::SignalingStateChanged(_, state) => {
                if state == SignalingState::HaveLocalOffer {
                    self.apply_held_answer(&participant).await;
                }
            }
        }
    }

    fn addressed_to_us<T>(&self, routed: &Routed<T>, event: &str) -> bool {
        if routed.room != self.room || routed.target != self.local_id {
            debug!(
                "Ignoring {} for {} in room {}",
                event, routed.target, routed.room
            );
            return false;
        }
        true
    }

    fn transport(&self, participant: &ParticipantId) -> Result<&dyn PeerTransport, StudioError> {
        self.peers
            .get(participant)
            .map(|entry| entry.transport.as_ref())
            .ok_or_else(|| StudioError::negotiation(participant, anyhow!("no connection")))
    }

    fn set_phase(&self, participant: &ParticipantId, phase: ConnectionPhase) {
        debug!("{} -> {}", participant, phase);
        self.phases.insert(participant.clone(), phase);
        self.updates.send(SessionUpdate::ConnectionState {
            participant: participant.clone(),
            phase: Some(phase),
        });
    }

    pub fn phases(&self) -> Arc<DashMap<ParticipantId, ConnectionPhase>> {
        self.phases.clone()
    }

    pub fn phase(&self, participant: &ParticipantId) -> Option<ConnectionPhase> {
        self.phases.get(participant).map(|p| *p)
    }

    pub fn connection_count(&self) -> usize {
        self.peers.len()
    }

    pub fn has_connection(&self, participant: &ParticipantId) -> bool {
        self.peers.contains_key(participant)
    }

    pub fn connected_participants(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<_> = self.peers.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn queued_candidates(&self, participant: &ParticipantId) -> usize {
        self.candidate_queues
            .get(participant)
            .map_or(0, CandidateQueue::len)
    }

    pub fn local_id(&self) -> &ParticipantId {
        &self.local_id
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }
}
