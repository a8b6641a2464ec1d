pub mod test_device_switch_in_call;
pub mod test_guest_flow;
pub mod test_join_approval;

use castroom_client::{JoinOutcome, SessionUpdate};
use castroom_core::{JoinStudioRequest, ParticipantId, SignalEvent};
use tokio::sync::mpsc;

use crate::integration::ROOM;
use crate::utils::{UPDATE_TIMEOUT_MS, wait_for_update};

pub fn join_request(guest_id: &str, guest_name: &str) -> SignalEvent {
    SignalEvent::RequestJoinStudio(JoinStudioRequest {
        room: ROOM.into(),
        episode_id: ROOM.into(),
        guest_id: guest_id.into(),
        guest_name: guest_name.into(),
    })
}

/// Name shown in the approval modal for `guest_id`.
pub async fn wait_for_shown(
    rx: &mut mpsc::UnboundedReceiver<SessionUpdate>,
    guest_id: &str,
) -> Option<String> {
    match wait_for_update(rx, UPDATE_TIMEOUT_MS, |u| {
        matches!(u, SessionUpdate::JoinRequestShown(r) if r.guest_id.as_str() == guest_id)
    })
    .await
    {
        Some(SessionUpdate::JoinRequestShown(request)) => Some(request.guest_name),
        _ => None,
    }
}

pub async fn wait_for_closed(
    rx: &mut mpsc::UnboundedReceiver<SessionUpdate>,
    guest_id: &str,
    timeout_ms: u64,
) -> Option<JoinOutcome> {
    let guest_id = ParticipantId::from(guest_id);
    match wait_for_update(rx, timeout_ms, |u| {
        matches!(u, SessionUpdate::JoinRequestClosed { guest_id: g, .. } if g == &guest_id)
    })
    .await
    {
        Some(SessionUpdate::JoinRequestClosed { outcome, .. }) => Some(outcome),
        _ => None,
    }
}
