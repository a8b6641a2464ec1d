use castroom_client::MediaStateChange;
use castroom_core::{MediaKind, Role, StudioError};

use crate::integration::{init_tracing, started_devices};

#[tokio::test]
async fn test_switching_camera_keeps_audio_track() {
    init_tracing();
    let (mut devices, mut state_rx, backend) = started_devices(Role::Guest).await;
    while state_rx.try_recv().is_ok() {}

    let mic = devices.local_stream().track(MediaKind::Audio).unwrap().clone();
    let old_camera = devices.local_stream().track(MediaKind::Video).unwrap().clone();

    devices.select_camera("cam-2").await.expect("switch to cam-2");

    let stream = devices.local_stream();
    assert_eq!(stream.tracks().len(), 2);
    assert_eq!(stream.tracks_of(MediaKind::Video), 1);
    assert_eq!(stream.track(MediaKind::Video).unwrap().device_id(), "cam-2");
    assert!(stream.track(MediaKind::Audio).unwrap().same_track(&mic));
    assert!(mic.is_live(), "audio keeps flowing through a camera switch");
    assert!(old_camera.is_stopped());
    assert_eq!(devices.selected_camera(), Some("cam-2"));

    let last = backend.requests().await.pop().unwrap();
    assert!(last.audio.is_none(), "a camera switch never reopens the microphone");
    assert_eq!(
        last.video.and_then(|v| v.device_id).as_deref(),
        Some("cam-2")
    );

    // Live before and after, so nothing to report.
    assert!(state_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_failed_switch_leaves_camera_off() {
    init_tracing();
    let (mut devices, mut state_rx, _backend) = started_devices(Role::Guest).await;
    while state_rx.try_recv().is_ok() {}

    let err = devices.select_camera("cam-9").await.unwrap_err();

    assert!(matches!(err, StudioError::Device(_)));
    assert!(!devices.camera_active());
    assert!(devices.mic_active());
    assert_eq!(
        state_rx.try_recv().ok(),
        Some(MediaStateChange {
            kind: MediaKind::Video,
            active: false
        })
    );
}

#[tokio::test]
async fn test_switching_microphone_keeps_video_track() {
    init_tracing();
    let (mut devices, _state_rx, _backend) = started_devices(Role::Host).await;
    let camera = devices.local_stream().track(MediaKind::Video).unwrap().clone();

    devices.select_microphone("mic-2").await.unwrap();

    let stream = devices.local_stream();
    assert_eq!(stream.track(MediaKind::Audio).unwrap().device_id(), "mic-2");
    assert!(stream.track(MediaKind::Video).unwrap().same_track(&camera));
    assert!(camera.is_live());
}

#[tokio::test]
async fn test_denied_permission_is_a_device_error() {
    init_tracing();
    let (mut devices, _state_rx, backend) = started_devices(Role::Guest).await;
    backend.deny(true);

    let err = devices.start_microphone(None).await.unwrap_err();

    assert!(matches!(err, StudioError::Device(msg) if msg.contains("audio")));
    assert!(!devices.mic_active());
    assert!(devices.camera_active());
}
