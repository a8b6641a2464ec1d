use castroom_client::{JoinOutcome, SessionUpdate, StaticGuestDirectory, StudioConfig};
use castroom_core::{ParticipantId, ParticipantStatus, SignalEvent};
use serde_json::json;

use crate::integration::session_tests::{join_request, wait_for_closed, wait_for_shown};
use crate::integration::{ROOM, guest, init_tracing, spawn_host};
use crate::utils::{
    AckMode, QUIET_PERIOD_MS, UPDATE_TIMEOUT_MS, wait_for_signal, wait_for_update,
};

fn directory() -> StaticGuestDirectory {
    StaticGuestDirectory::new().with_episode(ROOM, vec![guest("guest-7", "Dana Ortiz")])
}

#[tokio::test]
async fn test_approve_closes_after_ack() {
    init_tracing();
    let mut h = spawn_host(directory(), StudioConfig::default());
    let guest_id = ParticipantId::from("guest-7");

    h.handle.deliver(join_request("guest-7", "dana")).await.unwrap();
    assert_eq!(
        wait_for_shown(&mut h.updates, "guest-7").await.as_deref(),
        Some("Dana Ortiz"),
        "directory name wins over the event name"
    );

    h.handle.approve_join(guest_id.clone()).await.unwrap();

    let Some(SignalEvent::ApproveJoinStudio(approve)) =
        wait_for_signal(&mut h.signal_rx, "approve_join_studio", UPDATE_TIMEOUT_MS).await
    else {
        panic!("approval was never sent");
    };
    assert_eq!(approve.guest_id, "guest-7");
    assert_eq!(approve.room, ROOM);
    assert_eq!(approve.episode_id, ROOM);
    assert_eq!(approve.guest_name, "Dana Ortiz");

    assert_eq!(
        wait_for_closed(&mut h.updates, "guest-7", UPDATE_TIMEOUT_MS).await,
        Some(JoinOutcome::Approved)
    );

    // Already resolved, so nothing closes twice.
    h.handle.dismiss_join(guest_id.clone()).await.unwrap();
    h.handle.approve_join(guest_id).await.unwrap();
    assert_eq!(
        wait_for_closed(&mut h.updates, "guest-7", QUIET_PERIOD_MS).await,
        None
    );
    assert_eq!(h.signaling.named("approve_join_studio").await.len(), 1);
}

#[tokio::test]
async fn test_pending_request_shows_in_participant_list() {
    init_tracing();
    let mut h = spawn_host(directory(), StudioConfig::default());

    h.handle.deliver(join_request("guest-7", "dana")).await.unwrap();

    // The roster and the name lookup load independently; wait for both.
    let rows = wait_for_update(&mut h.updates, UPDATE_TIMEOUT_MS, |u| {
        matches!(u, SessionUpdate::Participants(rows)
            if rows.iter().any(|r| r.status == ParticipantStatus::AwaitingApproval
                && r.name == "Dana Ortiz"))
    })
    .await;
    let Some(SessionUpdate::Participants(rows)) = rows else {
        panic!("pending guest never listed");
    };
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id.as_str(), "guest-7");
}

#[tokio::test]
async fn test_failed_ack_keeps_request_open_for_retry() {
    init_tracing();
    let mut h = spawn_host(directory(), StudioConfig::default());
    let guest_id = ParticipantId::from("guest-7");
    h.signaling
        .set_ack(AckMode::Ok(json!({ "error": "guest already left" })))
        .await;

    h.handle.deliver(join_request("guest-7", "dana")).await.unwrap();
    wait_for_shown(&mut h.updates, "guest-7").await.unwrap();
    h.handle.approve_join(guest_id.clone()).await.unwrap();

    let notice = wait_for_update(&mut h.updates, UPDATE_TIMEOUT_MS, |u| {
        matches!(u, SessionUpdate::Notice(n) if n.retryable)
    })
    .await;
    let Some(SessionUpdate::Notice(notice)) = notice else {
        panic!("no retryable notice");
    };
    assert!(notice.message.contains("guest already left"));
    assert_eq!(
        wait_for_closed(&mut h.updates, "guest-7", QUIET_PERIOD_MS).await,
        None
    );

    h.signaling.set_ack(AckMode::Err("socket dropped".into())).await;
    h.handle.approve_join(guest_id.clone()).await.unwrap();
    let notice = wait_for_update(&mut h.updates, UPDATE_TIMEOUT_MS, |u| {
        matches!(u, SessionUpdate::Notice(n) if n.retryable)
    })
    .await;
    assert!(matches!(
        notice,
        Some(SessionUpdate::Notice(n)) if n.message.contains("socket dropped")
    ));

    h.signaling.set_ack(AckMode::Ok(json!({ "ok": true }))).await;
    h.handle.approve_join(guest_id).await.unwrap();
    assert_eq!(
        wait_for_closed(&mut h.updates, "guest-7", UPDATE_TIMEOUT_MS).await,
        Some(JoinOutcome::Approved)
    );
    assert_eq!(h.signaling.named("approve_join_studio").await.len(), 3);
}

#[tokio::test]
async fn test_missing_ack_times_out() {
    init_tracing();
    let mut config = StudioConfig::default();
    config.join.ack_timeout_ms = 50;
    let mut h = spawn_host(directory(), config);
    h.signaling.set_ack(AckMode::Never).await;

    h.handle.deliver(join_request("guest-7", "dana")).await.unwrap();
    wait_for_shown(&mut h.updates, "guest-7").await.unwrap();
    h.handle
        .approve_join(ParticipantId::from("guest-7"))
        .await
        .unwrap();

    let notice = wait_for_update(&mut h.updates, UPDATE_TIMEOUT_MS, |u| {
        matches!(u, SessionUpdate::Notice(n) if n.retryable)
    })
    .await;
    assert!(matches!(
        notice,
        Some(SessionUpdate::Notice(n)) if n.message.contains("no acknowledgement")
    ));
    assert_eq!(
        wait_for_closed(&mut h.updates, "guest-7", QUIET_PERIOD_MS).await,
        None
    );
}

#[tokio::test]
async fn test_unknown_guest_uses_event_name_and_repeat_supersedes() {
    init_tracing();
    let mut h = spawn_host(directory(), StudioConfig::default());

    h.handle.deliver(join_request("guest-9", "Sam")).await.unwrap();
    assert_eq!(
        wait_for_shown(&mut h.updates, "guest-9").await.as_deref(),
        Some("Sam")
    );

    h.handle.deliver(join_request("guest-9", "Sam K")).await.unwrap();
    assert_eq!(
        wait_for_closed(&mut h.updates, "guest-9", UPDATE_TIMEOUT_MS).await,
        Some(JoinOutcome::Superseded)
    );
    assert_eq!(
        wait_for_shown(&mut h.updates, "guest-9").await.as_deref(),
        Some("Sam K")
    );
}
