use castroom::client::{OutboundFrame, SessionHandle};
use castroom::model::{
    GreenroomUser, GreenroomUsers, JoinDecision, ParticipantId, Role, SignalEvent, UserJoined,
};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One side of the in-memory socket server.
pub struct Endpoint {
    pub id: ParticipantId,
    pub name: String,
    pub handle: SessionHandle,
    pub frames: mpsc::UnboundedReceiver<OutboundFrame>,
}

/// Stand-in for the socket server: forwards negotiation traffic between the
/// two sessions and answers the greenroom events the way the server would.
pub struct LoopbackRelay {
    room: String,
    episode_id: String,
    host: Endpoint,
    guest: Endpoint,
}

#[derive(Clone, Copy)]
enum Side {
    Host,
    Guest,
}

impl LoopbackRelay {
    pub fn new(room: String, episode_id: String, host: Endpoint, guest: Endpoint) -> Self {
        Self {
            room,
            episode_id,
            host,
            guest,
        }
    }

    pub async fn run(mut self) {
        info!("Relay started for room {}", self.room);

        loop {
            tokio::select! {
                Some(frame) = self.host.frames.recv() => self.route(Side::Host, frame).await,
                Some(frame) = self.guest.frames.recv() => self.route(Side::Guest, frame).await,
                else => break,
            }
        }

        info!("Relay stopped");
    }

    async fn route(&self, from: Side, frame: OutboundFrame) {
        let text = frame.text.clone();
        let event = match SignalEvent::from_json(&text) {
            Ok(event) => event,
            Err(e) => {
                warn!("Dropping unreadable frame: {}", e);
                frame.acknowledge(Err("malformed event".into()));
                return;
            }
        };
        debug!("Relay <- {}", event.name());

        let (sender, other) = match from {
            Side::Host => (&self.host, &self.guest),
            Side::Guest => (&self.guest, &self.host),
        };

        match event {
            SignalEvent::Offer(_)
            | SignalEvent::Answer(_)
            | SignalEvent::IceCandidate(_)
            | SignalEvent::UpdateStreamState(_) => {
                self.forward_text(other, text).await;
            }

            SignalEvent::JoinGreenroom(_) => {
                self.deliver(&self.host, self.greenroom(vec![GreenroomUser {
                    user_id: sender.id.to_string(),
                    user_name: sender.name.clone(),
                }]))
                .await;
            }

            SignalEvent::RequestJoinStudio(_) => {
                self.forward_text(&self.host, text).await;
            }

            SignalEvent::ApproveJoinStudio(approve) => {
                frame.acknowledge(Ok(json!({ "ok": true })));

                let decision = JoinDecision {
                    episode_id: self.episode_id.clone(),
                    guest_id: approve.guest_id.clone(),
                    reason: None,
                    room: Some(self.room.clone()),
                };
                self.deliver(&self.guest, SignalEvent::JoinStudioApproved(decision))
                    .await;
                self.deliver(&self.host, self.greenroom(vec![])).await;
                // Only the member already in the studio hears about the newcomer.
                self.deliver(
                    &self.host,
                    SignalEvent::UserJoined(UserJoined {
                        room: self.room.clone(),
                        user_id: approve.guest_id,
                        user_name: approve.guest_name,
                        role: Role::Guest,
                    }),
                )
                .await;
                return;
            }

            SignalEvent::DenyJoinStudio(deny) => {
                let decision = JoinDecision {
                    episode_id: self.episode_id.clone(),
                    guest_id: deny.guest_id,
                    reason: Some(deny.reason),
                    room: Some(self.room.clone()),
                };
                self.deliver(&self.guest, SignalEvent::JoinStudioDenied(decision))
                    .await;
            }

            other_event => debug!("Relay ignores '{}'", other_event.name()),
        }

        frame.acknowledge(Ok(json!({ "ok": true })));
    }

    fn greenroom(&self, users: Vec<GreenroomUser>) -> SignalEvent {
        SignalEvent::GreenroomUsers(GreenroomUsers {
            room: self.room.clone(),
            users,
        })
    }

    async fn forward_text(&self, to: &Endpoint, text: String) {
        if let Err(e) = to.handle.deliver_text(text).await {
            warn!("Could not reach {}: {}", to.id, e);
        }
    }

    async fn deliver(&self, to: &Endpoint, event: SignalEvent) {
        if let Err(e) = to.handle.deliver(event).await {
            warn!("Could not reach {}: {}", to.id, e);
        }
    }
}
