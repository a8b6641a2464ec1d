use castroom_client::{SessionIdentity, SessionUpdate, StaticGuestDirectory, StudioConfig};
use castroom_core::{JoinDecision, SignalEvent};

use crate::integration::{ROOM, init_tracing, spawn_session};
use crate::utils::{UPDATE_TIMEOUT_MS, wait_for_signal, wait_for_update};

fn decision(guest_id: &str, reason: Option<&str>) -> JoinDecision {
    JoinDecision {
        episode_id: ROOM.into(),
        guest_id: guest_id.into(),
        reason: reason.map(str::to_owned),
        room: Some(ROOM.into()),
    }
}

#[tokio::test]
async fn test_guest_waits_in_greenroom_until_approved() {
    init_tracing();
    let mut h = spawn_session(
        SessionIdentity::guest("guest-7", "Dana", ROOM),
        StaticGuestDirectory::new(),
        StudioConfig::default(),
    );

    let Some(SignalEvent::JoinGreenroom(greenroom)) =
        wait_for_signal(&mut h.signal_rx, "join_greenroom", UPDATE_TIMEOUT_MS).await
    else {
        panic!("guest never entered the greenroom");
    };
    assert_eq!(greenroom.room, ROOM);

    h.handle.request_join_studio().await.unwrap();
    let Some(SignalEvent::RequestJoinStudio(request)) =
        wait_for_signal(&mut h.signal_rx, "request_join_studio", UPDATE_TIMEOUT_MS).await
    else {
        panic!("join request was never sent");
    };
    assert_eq!(request.guest_id, "guest-7");
    assert_eq!(request.guest_name, "Dana");

    // Decisions for someone else are not ours.
    h.handle
        .deliver(SignalEvent::JoinStudioApproved(decision("guest-8", None)))
        .await
        .unwrap();
    h.handle
        .deliver(SignalEvent::JoinStudioApproved(decision("guest-7", None)))
        .await
        .unwrap();

    let approved = wait_for_update(&mut h.updates, UPDATE_TIMEOUT_MS, |u| {
        matches!(u, SessionUpdate::JoinApproved { .. })
    })
    .await;
    assert_eq!(
        approved,
        Some(SessionUpdate::JoinApproved {
            episode_id: ROOM.into()
        })
    );
}

#[tokio::test]
async fn test_guest_sees_denial_reason() {
    init_tracing();
    let mut h = spawn_session(
        SessionIdentity::guest("guest-7", "Dana", ROOM),
        StaticGuestDirectory::new(),
        StudioConfig::default(),
    );

    h.handle
        .deliver(SignalEvent::JoinStudioDenied(decision(
            "guest-7",
            Some("Studio is full"),
        )))
        .await
        .unwrap();

    let denied = wait_for_update(&mut h.updates, UPDATE_TIMEOUT_MS, |u| {
        matches!(u, SessionUpdate::JoinDenied { .. })
    })
    .await;
    assert_eq!(
        denied,
        Some(SessionUpdate::JoinDenied {
            reason: Some("Studio is full".into())
        })
    );
}

#[tokio::test]
async fn test_guest_publishes_stream_state_on_toggle() {
    init_tracing();
    let mut h = spawn_session(
        SessionIdentity::guest("guest-7", "Dana", ROOM),
        StaticGuestDirectory::new(),
        StudioConfig::default(),
    );
    wait_for_signal(&mut h.signal_rx, "join_greenroom", UPDATE_TIMEOUT_MS)
        .await
        .unwrap();

    h.handle.toggle_microphone().await.unwrap();

    // Startup publishes the initial state too; look for the mute.
    let muted = loop {
        let Some(SignalEvent::UpdateStreamState(state)) =
            wait_for_signal(&mut h.signal_rx, "update_stream_state", UPDATE_TIMEOUT_MS).await
        else {
            panic!("mute was never published");
        };
        if state.is_mic_active == Some(false) {
            break state;
        }
    };
    assert_eq!(muted.user_id, "guest-7");
    assert_eq!(muted.room, ROOM);
    assert_eq!(muted.is_camera_active, None);
}
