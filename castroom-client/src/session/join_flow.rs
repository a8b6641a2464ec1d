use crate::directory::resolve_guest_name;
use crate::session::session::{Internal, StudioSession};
use crate::updates::{JoinOutcome, SessionUpdate};
use castroom_core::{
    ApproveJoinStudio, DenyJoinStudio, JoinDecision, JoinRequest, JoinStudioRequest,
    ParticipantId, Role, RoomId, SignalEvent, StudioError,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

impl StudioSession {
    /// Guest side: ask to move from the greenroom into the studio.
    pub(super) async fn request_join_studio(&mut self) {
        if self.identity.role != Role::Guest {
            warn!("Only guests request to join the studio");
            return;
        }

        let event = SignalEvent::RequestJoinStudio(JoinStudioRequest {
            room: self.identity.room.to_string(),
            episode_id: self.identity.episode_id.clone(),
            guest_id: self.identity.local_id.to_string(),
            guest_name: self.identity.name.clone(),
        });
        match self.signaling.emit(event).await {
            Ok(()) => self.updates.info("Asked the host to join the studio"),
            Err(e) => self.updates.report(&e),
        }
    }

    /// Host side: a guest knocked. The request is pending from this point on;
    /// the modal waits for the name lookup, which runs off the loop.
    pub(super) fn receive_join_request(&mut self, request: JoinStudioRequest) {
        if self.identity.role != Role::Host {
            debug!("Ignoring join request on a guest session");
            return;
        }
        if request.guest_id.trim().is_empty() {
            self.updates.report(&StudioError::SignalingValidation {
                event: "request_join_studio",
                field: "guestId",
            });
            return;
        }

        let room = if request.room.trim().is_empty() {
            self.identity.room.clone()
        } else {
            RoomId(request.room)
        };
        if room != self.identity.room {
            debug!("Join request for another room {}", room);
            return;
        }
        let episode_id = if request.episode_id.trim().is_empty() {
            self.identity.episode_id.clone()
        } else {
            request.episode_id
        };

        let request = JoinRequest {
            guest_id: ParticipantId(request.guest_id),
            guest_name: request.guest_name,
            episode_id,
            room,
        };
        let opened = self.join_requests.open(request.clone());
        if let Some(old) = opened.superseded {
            self.updates.send(SessionUpdate::JoinRequestClosed {
                guest_id: old.guest_id,
                outcome: JoinOutcome::Superseded,
            });
        }
        self.spawn_expiry(&request.guest_id, opened.generation, opened.token.clone());
        self.spawn_name_lookup(request, opened.generation, opened.token);
        self.publish_participants();
    }

    fn spawn_name_lookup(&self, request: JoinRequest, generation: u64, token: CancellationToken) {
        let directory = self.directory.clone();
        let tx = self.internal_tx.clone();

        tokio::spawn(async move {
            let lookup = resolve_guest_name(
                directory.as_ref(),
                &request.episode_id,
                &request.guest_id,
                &request.guest_name,
            );
            tokio::select! {
                _ = token.cancelled() => {}
                guest_name = lookup => {
                    let _ = tx.send(Internal::JoinRequestNamed {
                        guest_id: request.guest_id.clone(),
                        generation,
                        guest_name,
                    });
                }
            }
        });
    }

    pub(super) fn show_join_request(
        &mut self,
        guest_id: &ParticipantId,
        generation: u64,
        guest_name: String,
    ) {
        let Some(request) = self.join_requests.rename(guest_id, generation, guest_name) else {
            debug!("Join request from {} resolved before its name lookup", guest_id);
            return;
        };
        self.updates.send(SessionUpdate::JoinRequestShown(request));
        self.publish_participants();
    }

    fn spawn_expiry(&self, guest_id: &ParticipantId, generation: u64, token: CancellationToken) {
        let expiry = self.config.join.request_expiry();
        let guest_id = guest_id.clone();
        let tx = self.internal_tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(expiry) => {
                    let _ = tx.send(Internal::JoinRequestExpired { guest_id, generation });
                }
            }
        });
    }

    /// Send the approval and wait for the ack in the background. The request
    /// stays open until the ack arrives.
    pub(super) fn approve_join(&mut self, guest_id: &ParticipantId) {
        let Some((request, generation, token)) = self.join_requests.begin_approval(guest_id) else {
            warn!("No approvable join request from {}", guest_id);
            return;
        };

        let event = SignalEvent::ApproveJoinStudio(ApproveJoinStudio {
            guest_id: request.guest_id.to_string(),
            episode_id: request.episode_id.clone(),
            room: request.room.to_string(),
            guest_name: request.guest_name.clone(),
        });
        let signaling = self.signaling.clone();
        let ack_timeout = self.config.join.ack_timeout();
        let tx = self.internal_tx.clone();
        let guest_id = guest_id.clone();

        info!("Approving {} into {}", guest_id, request.room);
        tokio::spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => return,
                ack = tokio::time::timeout(ack_timeout, signaling.emit_with_ack(event)) => {
                    match ack {
                        Ok(Ok(value)) => ack_error(&value).map_or(Ok(()), Err),
                        Ok(Err(e)) => Err(e.to_string()),
                        Err(_) => Err(format!(
                            "no acknowledgement within {} ms",
                            ack_timeout.as_millis()
                        )),
                    }
                }
            };
            let _ = tx.send(Internal::JoinAck {
                guest_id,
                generation,
                result,
            });
        });
    }

    pub(super) fn join_acknowledged(
        &mut self,
        guest_id: &ParticipantId,
        generation: u64,
        result: Result<(), String>,
    ) {
        if !self.join_requests.is_current(guest_id, generation) {
            debug!("Late ack for {} ignored", guest_id);
            return;
        }

        match result {
            Ok(()) => self.close_join(guest_id, JoinOutcome::Approved),
            Err(reason) => {
                self.join_requests.end_approval(guest_id);
                self.updates
                    .retryable(format!("Approving {guest_id} failed: {reason}"));
            }
        }
    }

    pub(super) async fn deny_join(&mut self, guest_id: &ParticipantId, reason: String) {
        let Some((request, outcome)) = self.join_requests.resolve(guest_id, JoinOutcome::Denied)
        else {
            warn!("No pending join request from {}", guest_id);
            return;
        };
        self.announce_closed(request.guest_id.clone(), outcome);

        let event = SignalEvent::DenyJoinStudio(DenyJoinStudio {
            guest_id: request.guest_id.to_string(),
            reason,
            room: request.room.to_string(),
        });
        if let Err(e) = self.signaling.emit(event).await {
            self.updates.report(&e);
        }
    }

    pub(super) fn dismiss_join(&mut self, guest_id: &ParticipantId) {
        self.close_join(guest_id, JoinOutcome::Dismissed);
    }

    pub(super) fn cancel_join(&mut self, guest_id: &ParticipantId) {
        self.close_join(guest_id, JoinOutcome::Cancelled);
    }

    pub(super) fn join_expired(&mut self, guest_id: &ParticipantId, generation: u64) {
        if !self.join_requests.is_current(guest_id, generation) {
            return;
        }
        if let Some(request) = self.join_requests.get(guest_id) {
            self.updates.warn(format!(
                "Join request from {} expired",
                request.guest_name
            ));
        }
        self.close_join(guest_id, JoinOutcome::Expired);
    }

    fn close_join(&mut self, guest_id: &ParticipantId, outcome: JoinOutcome) {
        if let Some((request, outcome)) = self.join_requests.resolve(guest_id, outcome) {
            self.announce_closed(request.guest_id, outcome);
        }
    }

    fn announce_closed(&self, guest_id: ParticipantId, outcome: JoinOutcome) {
        self.updates
            .send(SessionUpdate::JoinRequestClosed { guest_id, outcome });
        self.publish_participants();
    }

    /// Guest side: the host decided on our request.
    pub(super) fn join_decision(&mut self, decision: JoinDecision, approved: bool) {
        if decision.guest_id != self.identity.local_id.as_str() {
            return;
        }
        if let Some(room) = &decision.room {
            if !self.in_our_room(room) {
                return;
            }
        }

        if approved {
            self.updates.info("The host let you into the studio");
            self.updates.send(SessionUpdate::JoinApproved {
                episode_id: decision.episode_id,
            });
        } else {
            let message = match &decision.reason {
                Some(reason) => format!("The host declined your request: {reason}"),
                None => "The host declined your request".to_owned(),
            };
            self.updates.warn(message);
            self.updates.send(SessionUpdate::JoinDenied {
                reason: decision.reason,
            });
        }
    }
}

/// Acks are `{"error": ".."}` on failure; anything else counts as success.
fn ack_error(value: &serde_json::Value) -> Option<String> {
    match value.get("error")? {
        serde_json::Value::Null | serde_json::Value::Bool(false) => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
