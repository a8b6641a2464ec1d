use castroom_client::{ConnectionPhase, SessionUpdate, VideoSlot};
use castroom_core::{
    IceCandidate, IceCandidateMessage, MediaKind, OfferMessage, ParticipantId, RoomId,
    SessionDescription,
};

use crate::integration::{ROOM, coordinator_harness, init_tracing};
use crate::utils::{TransportCall, drain_updates};

#[tokio::test]
async fn test_offer_creates_connection_and_answers_the_sender() {
    init_tracing();
    let me = ParticipantId::from("guest-7");
    let host = ParticipantId::host();
    let mut h = coordinator_harness(me.clone()).await;

    // A candidate can overtake the offer it belongs to.
    h.coordinator
        .handle_ice_candidate(IceCandidateMessage::new(
            &RoomId::from(ROOM),
            &me,
            &host,
            IceCandidate::new("h1"),
        ))
        .await
        .unwrap();
    assert_eq!(h.coordinator.queued_candidates(&host), 1);
    assert_eq!(h.factory.created(), 0);

    h.coordinator
        .handle_offer(
            OfferMessage::new(
                &RoomId::from(ROOM),
                &me,
                &host,
                SessionDescription::offer("host-offer"),
            ),
            h.devices.local_stream(),
        )
        .await
        .expect("offer should be answered");

    let connection = h.factory.latest(&host).expect("connection created for the offer");
    assert_eq!(
        connection.calls(),
        vec![
            TransportCall::AddTrack(MediaKind::Audio, "mic-1".into()),
            TransportCall::AddTrack(MediaKind::Video, "cam-1".into()),
            TransportCall::SetRemote(SessionDescription::offer("host-offer")),
            TransportCall::AddCandidate("h1".into()),
            TransportCall::CreateAnswer,
        ]
    );
    assert_eq!(h.coordinator.queued_candidates(&host), 0);
    assert_eq!(h.coordinator.phase(&host), Some(ConnectionPhase::Answering));

    let answers = h.signaling.answers().await;
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].target_user_id.as_deref(), Some("host"));
    assert_eq!(answers[0].from_user_id.as_deref(), Some("guest-7"));
    assert_eq!(
        answers[0].answer.as_ref().map(|a| a.sdp.clone()),
        Some(format!("answer-{}", connection.connection_key()))
    );
}

#[tokio::test]
async fn test_offer_reuses_existing_connection() {
    init_tracing();
    let host = ParticipantId::host();
    let guest = ParticipantId::from("guest-7");
    let mut h = coordinator_harness(host.clone()).await;

    h.coordinator
        .connect_to_participant(&guest, h.devices.local_stream())
        .await
        .unwrap();
    h.coordinator
        .handle_offer(
            OfferMessage::new(
                &RoomId::from(ROOM),
                &host,
                &guest,
                SessionDescription::offer("renegotiate"),
            ),
            h.devices.local_stream(),
        )
        .await
        .unwrap();

    assert_eq!(h.factory.created(), 1);
    assert_eq!(h.signaling.answers().await.len(), 1);
}

#[tokio::test]
async fn test_unparseable_offer_drops_the_new_connection() {
    init_tracing();
    let me = ParticipantId::from("guest-7");
    let host = ParticipantId::host();
    let mut h = coordinator_harness(me.clone()).await;

    let result = h
        .coordinator
        .handle_offer(
            OfferMessage::new(
                &RoomId::from(ROOM),
                &me,
                &host,
                SessionDescription::offer("fail"),
            ),
            h.devices.local_stream(),
        )
        .await;

    assert!(result.is_err());
    assert_eq!(h.coordinator.connection_count(), 0);
    assert_eq!(h.coordinator.phase(&host), None);
    assert!(h.factory.latest(&host).unwrap().is_closed());
    assert!(h.signaling.answers().await.is_empty());

    let phases: Vec<_> = drain_updates(&mut h.updates)
        .into_iter()
        .filter_map(|u| match u {
            SessionUpdate::ConnectionState { participant, phase } if participant == host => {
                Some(phase)
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        phases,
        vec![
            Some(ConnectionPhase::Answering),
            Some(ConnectionPhase::Failed),
            None
        ]
    );
}

#[tokio::test]
async fn test_failed_offer_does_not_count_toward_track_slots() {
    init_tracing();
    let me = ParticipantId::host();
    let mut h = coordinator_harness(me.clone()).await;
    let good = ParticipantId::from("guest-7");
    let bad = ParticipantId::from("guest-9");

    h.coordinator
        .connect_to_participant(&good, h.devices.local_stream())
        .await
        .unwrap();
    let _ = h
        .coordinator
        .handle_offer(
            OfferMessage::new(
                &RoomId::from(ROOM),
                &me,
                &bad,
                SessionDescription::offer("fail"),
            ),
            h.devices.local_stream(),
        )
        .await;
    assert_eq!(h.coordinator.connected_participants(), vec![good.clone()]);

    drain_updates(&mut h.updates);
    h.factory.latest(&good).unwrap().fire_track(MediaKind::Video).await;
    h.pump_transport_events().await;

    assert!(drain_updates(&mut h.updates).iter().any(|u| matches!(
        u,
        SessionUpdate::RemoteTrack { slot: VideoSlot::Shared, .. }
    )));
}
