use crate::updates::JoinOutcome;
use castroom_core::{JoinRequest, ParticipantId};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

struct PendingJoin {
    request: JoinRequest,
    generation: u64,
    token: CancellationToken,
    awaiting_ack: bool,
}

/// A request that was just opened.
#[derive(Debug, Clone)]
pub struct OpenedJoin {
    pub generation: u64,
    /// Cancelled when the request resolves, by whatever path.
    pub token: CancellationToken,
    /// Earlier request from the same guest that this one replaced.
    pub superseded: Option<JoinRequest>,
}

/// The host's pending join requests (the greenroom working set).
///
/// Every request leaves through [`JoinRequests::resolve`], which removes it
/// and cancels its token. A second resolve for the same request is a no-op.
#[derive(Default)]
pub struct JoinRequests {
    pending: HashMap<ParticipantId, PendingJoin>,
    next_generation: u64,
}

impl JoinRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, request: JoinRequest) -> OpenedJoin {
        let superseded = self
            .resolve(&request.guest_id, JoinOutcome::Superseded)
            .map(|(old, _)| old);

        self.next_generation += 1;
        let generation = self.next_generation;
        let token = CancellationToken::new();

        info!(
            "Join request #{} from {} ({})",
            generation, request.guest_id, request.guest_name
        );
        self.pending.insert(
            request.guest_id.clone(),
            PendingJoin {
                request,
                generation,
                token: token.clone(),
                awaiting_ack: false,
            },
        );

        OpenedJoin {
            generation,
            token,
            superseded,
        }
    }

    /// Mark an approval as in flight. `None` if the guest has no pending
    /// request or an approval is already waiting for its ack.
    pub fn begin_approval(
        &mut self,
        guest_id: &ParticipantId,
    ) -> Option<(JoinRequest, u64, CancellationToken)> {
        let pending = self.pending.get_mut(guest_id)?;
        if pending.awaiting_ack {
            debug!("Approval for {} already in flight", guest_id);
            return None;
        }
        pending.awaiting_ack = true;
        Some((
            pending.request.clone(),
            pending.generation,
            pending.token.clone(),
        ))
    }

    /// Re-arm approval after a failed ack; the request stays pending.
    pub fn end_approval(&mut self, guest_id: &ParticipantId) {
        if let Some(pending) = self.pending.get_mut(guest_id) {
            pending.awaiting_ack = false;
        }
    }

    /// Swap in the looked-up display name. `None` once the request is gone
    /// or was replaced by a newer one.
    pub fn rename(
        &mut self,
        guest_id: &ParticipantId,
        generation: u64,
        guest_name: String,
    ) -> Option<JoinRequest> {
        let pending = self
            .pending
            .get_mut(guest_id)
            .filter(|p| p.generation == generation)?;
        pending.request.guest_name = guest_name;
        Some(pending.request.clone())
    }

    pub fn is_current(&self, guest_id: &ParticipantId, generation: u64) -> bool {
        self.pending
            .get(guest_id)
            .is_some_and(|p| p.generation == generation)
    }

    /// Remove the request and cancel its background work.
    pub fn resolve(
        &mut self,
        guest_id: &ParticipantId,
        outcome: JoinOutcome,
    ) -> Option<(JoinRequest, JoinOutcome)> {
        let pending = self.pending.remove(guest_id)?;
        pending.token.cancel();
        info!(
            "Join request #{} from {} resolved: {:?}",
            pending.generation, guest_id, outcome
        );
        Some((pending.request, outcome))
    }

    pub fn resolve_all(&mut self, outcome: JoinOutcome) -> Vec<(JoinRequest, JoinOutcome)> {
        let ids: Vec<_> = self.pending.keys().cloned().collect();
        ids.iter()
            .filter_map(|id| self.resolve(id, outcome))
            .collect()
    }

    pub fn get(&self, guest_id: &ParticipantId) -> Option<&JoinRequest> {
        self.pending.get(guest_id).map(|p| &p.request)
    }

    pub fn contains(&self, guest_id: &ParticipantId) -> bool {
        self.pending.contains_key(guest_id)
    }

    pub fn pending_ids(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<_> = self.pending.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
