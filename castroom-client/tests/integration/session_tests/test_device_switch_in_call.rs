use castroom_client::{OutputSelection, SessionUpdate, StaticGuestDirectory, StudioConfig};
use castroom_core::{MediaKind, ParticipantId};

use crate::integration::{init_tracing, spawn_host};
use crate::utils::{TransportCall, UPDATE_TIMEOUT_MS, wait_for_signal, wait_for_update, wait_until};

#[tokio::test]
async fn test_camera_switch_replaces_track_on_open_connections() {
    init_tracing();
    let mut h = spawn_host(StaticGuestDirectory::new(), StudioConfig::default());
    let guest_id = ParticipantId::from("guest-7");

    h.handle.connect(guest_id.clone()).await.unwrap();
    wait_for_signal(&mut h.signal_rx, "offer", UPDATE_TIMEOUT_MS)
        .await
        .unwrap();

    h.handle.select_camera("cam-2").await.unwrap();

    let connection = h.factory.latest(&guest_id).unwrap();
    let replaced = TransportCall::ReplaceTrack(MediaKind::Video, "cam-2".into());
    assert!(wait_until(UPDATE_TIMEOUT_MS, || connection.calls().contains(&replaced)).await);
    assert_eq!(h.factory.created(), 1, "no renegotiation for a device switch");
    assert!(
        !connection
            .calls()
            .iter()
            .any(|c| matches!(c, TransportCall::ReplaceTrack(MediaKind::Audio, _)))
    );
}

#[tokio::test]
async fn test_speaker_selection_is_reported() {
    init_tracing();
    let mut h = spawn_host(StaticGuestDirectory::new(), StudioConfig::default());

    h.handle.select_speaker("spk-2").await.unwrap();

    let outcome = wait_for_update(&mut h.updates, UPDATE_TIMEOUT_MS, |u| {
        matches!(u, SessionUpdate::OutputDevice(_))
    })
    .await;
    assert_eq!(
        outcome,
        Some(SessionUpdate::OutputDevice(OutputSelection::Applied(
            "spk-2".into()
        )))
    );
    assert_eq!(h.devices.sink().await.as_deref(), Some("spk-2"));
}
