use castroom_client::{
    ConnectionPhase, NoticeLevel, PeerConnectionState, SessionUpdate, VideoSlot,
};
use castroom_core::{MediaKind, ParticipantId};

use crate::integration::{coordinator_harness, init_tracing};
use crate::utils::drain_updates;

fn remote_slots(updates: &[SessionUpdate]) -> Vec<(ParticipantId, VideoSlot)> {
    updates
        .iter()
        .filter_map(|u| match u {
            SessionUpdate::RemoteTrack {
                participant, slot, ..
            } => Some((participant.clone(), slot.clone())),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_single_peer_uses_shared_slot() {
    init_tracing();
    let mut h = coordinator_harness(ParticipantId::from("guest-7")).await;
    let host = ParticipantId::host();

    h.coordinator
        .connect_to_participant(&host, h.devices.local_stream())
        .await
        .unwrap();
    h.factory.latest(&host).unwrap().fire_track(MediaKind::Video).await;
    h.pump_transport_events().await;

    assert_eq!(
        remote_slots(&drain_updates(&mut h.updates)),
        vec![(host, VideoSlot::Shared)]
    );
}

#[tokio::test]
async fn test_multiple_peers_get_their_own_slots() {
    init_tracing();
    let mut h = coordinator_harness(ParticipantId::host()).await;
    let a = ParticipantId::from("guest-7");
    let b = ParticipantId::from("guest-8");

    for guest in [&a, &b] {
        h.coordinator
            .connect_to_participant(guest, h.devices.local_stream())
            .await
            .unwrap();
    }
    h.factory.latest(&b).unwrap().fire_track(MediaKind::Video).await;
    h.pump_transport_events().await;

    assert_eq!(
        remote_slots(&drain_updates(&mut h.updates)),
        vec![(b.clone(), VideoSlot::Participant(b))]
    );
}

#[tokio::test]
async fn test_events_from_replaced_connection_are_ignored() {
    init_tracing();
    let mut h = coordinator_harness(ParticipantId::host()).await;
    let guest = ParticipantId::from("guest-7");

    h.coordinator
        .connect_to_participant(&guest, h.devices.local_stream())
        .await
        .unwrap();
    let stale = h.factory.latest(&guest).unwrap();
    h.coordinator
        .connect_to_participant(&guest, h.devices.local_stream())
        .await
        .unwrap();
    drain_updates(&mut h.updates);

    stale.fire_track(MediaKind::Audio).await;
    stale.fire_state(PeerConnectionState::Failed).await;
    stale.fire_candidate("stale-candidate").await;
    h.pump_transport_events().await;

    assert!(drain_updates(&mut h.updates).is_empty());
    assert!(h.signaling.candidates().await.is_empty());
    assert_eq!(h.coordinator.phase(&guest), Some(ConnectionPhase::Offering));
}

#[tokio::test]
async fn test_connected_and_failed_states_update_phase() {
    init_tracing();
    let mut h = coordinator_harness(ParticipantId::host()).await;
    let guest = ParticipantId::from("guest-7");

    h.coordinator
        .connect_to_participant(&guest, h.devices.local_stream())
        .await
        .unwrap();
    let connection = h.factory.latest(&guest).unwrap();

    connection.fire_state(PeerConnectionState::Connected).await;
    h.pump_transport_events().await;
    assert_eq!(h.coordinator.phase(&guest), Some(ConnectionPhase::Connected));

    drain_updates(&mut h.updates);
    connection.fire_state(PeerConnectionState::Failed).await;
    h.pump_transport_events().await;
    assert_eq!(h.coordinator.phase(&guest), Some(ConnectionPhase::Failed));

    let updates = drain_updates(&mut h.updates);
    assert!(updates.iter().any(|u| matches!(
        u,
        SessionUpdate::Notice(n) if n.retryable
    )));
}

#[tokio::test]
async fn test_disconnected_is_a_warning_not_a_failure() {
    init_tracing();
    let mut h = coordinator_harness(ParticipantId::host()).await;
    let guest = ParticipantId::from("guest-7");

    h.coordinator
        .connect_to_participant(&guest, h.devices.local_stream())
        .await
        .unwrap();
    let connection = h.factory.latest(&guest).unwrap();
    connection.fire_state(PeerConnectionState::Connected).await;
    h.pump_transport_events().await;

    drain_updates(&mut h.updates);
    connection.fire_state(PeerConnectionState::Disconnected).await;
    h.pump_transport_events().await;

    let updates = drain_updates(&mut h.updates);
    assert!(updates.iter().any(|u| matches!(
        u,
        SessionUpdate::Notice(n) if n.level == NoticeLevel::Warning
    )));
    assert!(!updates.iter().any(|u| matches!(
        u,
        SessionUpdate::Notice(n) if n.level == NoticeLevel::Error
    )));
    assert_eq!(h.coordinator.phase(&guest), Some(ConnectionPhase::Connected));
    assert!(h.coordinator.has_connection(&guest));

    connection.fire_state(PeerConnectionState::Connected).await;
    h.pump_transport_events().await;
    assert_eq!(h.coordinator.phase(&guest), Some(ConnectionPhase::Connected));
}
