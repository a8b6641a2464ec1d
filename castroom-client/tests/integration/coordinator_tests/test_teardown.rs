use castroom_client::{ConnectionPhase, SessionUpdate};
use castroom_core::{MediaKind, ParticipantId};

use crate::integration::{coordinator_harness, init_tracing};
use crate::utils::drain_updates;

#[tokio::test]
async fn test_close_connection_keeps_local_media() {
    init_tracing();
    let mut h = coordinator_harness(ParticipantId::host()).await;
    let guest = ParticipantId::from("guest-7");

    h.coordinator
        .connect_to_participant(&guest, h.devices.local_stream())
        .await
        .unwrap();
    drain_updates(&mut h.updates);

    assert!(h.coordinator.close_connection(&guest).await);

    assert_eq!(h.coordinator.connection_count(), 0);
    assert_eq!(h.coordinator.phase(&guest), None);
    assert!(h.factory.latest(&guest).unwrap().is_closed());

    let stream = h.devices.local_stream();
    assert!(stream.track(MediaKind::Audio).unwrap().is_live());
    assert!(stream.track(MediaKind::Video).unwrap().is_live());

    let updates = drain_updates(&mut h.updates);
    assert!(updates.iter().any(|u| matches!(
        u,
        SessionUpdate::RemoteStreamEnded { participant } if participant == &guest
    )));
    assert!(updates.iter().any(|u| matches!(
        u,
        SessionUpdate::ConnectionState { participant, phase: None } if participant == &guest
    )));

    assert!(!h.coordinator.close_connection(&guest).await);
}

#[tokio::test]
async fn test_close_all_tears_down_every_connection() {
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
    assert_eq!(h.coordinator.connected_participants(), vec![a.clone(), b.clone()]);
    assert_eq!(h.coordinator.phase(&b), Some(ConnectionPhase::Offering));

    h.coordinator.close_all().await;

    assert_eq!(h.coordinator.connection_count(), 0);
    assert!(h.coordinator.phases().is_empty());
    assert!(h.factory.latest(&a).unwrap().is_closed());
    assert!(h.factory.latest(&b).unwrap().is_closed());
}

#[tokio::test]
async fn test_remote_close_state_removes_connection() {
    init_tracing();
    let mut h = coordinator_harness(ParticipantId::host()).await;
    let guest = ParticipantId::from("guest-7");

    h.coordinator
        .connect_to_participant(&guest, h.devices.local_stream())
        .await
        .unwrap();
    h.factory
        .latest(&guest)
        .unwrap()
        .fire_state(castroom_client::PeerConnectionState::Closed)
        .await;
    h.pump_transport_events().await;

    assert!(!h.coordinator.has_connection(&guest));
}
