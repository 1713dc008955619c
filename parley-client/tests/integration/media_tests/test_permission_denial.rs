use parley_client::MediaError;
use parley_client::media::{DeviceKind, LocalMedia, TrackKind};
use std::sync::Arc;

use crate::integration::init_tracing;
use crate::utils::MockDevices;

#[tokio::test]
async fn test_denied_devices_fall_back_to_placeholders() {
    init_tracing();

    let devices = Arc::new(MockDevices::denying_all());
    let media = LocalMedia::acquire(devices.clone()).await;

    assert_eq!(devices.requests(), 2);
    assert!(media.track(DeviceKind::Camera).is_placeholder());
    assert_eq!(media.track(DeviceKind::Camera).kind, TrackKind::Video);
    assert!(media.track(DeviceKind::Microphone).is_placeholder());
    assert_eq!(media.track(DeviceKind::Microphone).kind, TrackKind::Audio);

    let state = media.device_state(false);
    assert!(!state.camera_enabled);
    assert!(!state.mic_enabled);
}

#[tokio::test]
async fn test_enabling_asks_again() {
    init_tracing();

    let devices = Arc::new(MockDevices::denying_all());
    let mut media = LocalMedia::acquire(devices.clone()).await;

    let err = media.set_enabled(DeviceKind::Camera, true).await.unwrap_err();
    assert!(matches!(err, MediaError::PermissionDenied(DeviceKind::Camera)));
    assert!(!media.is_enabled(DeviceKind::Camera));
    assert_eq!(devices.requests(), 3);

    devices.grant(DeviceKind::Camera);
    let toggle = media.set_enabled(DeviceKind::Camera, true).await.unwrap();
    let track = toggle.new_track.expect("granted camera track");
    assert!(!track.is_placeholder());
    assert_eq!(track.width, Some(1280));
    assert!(media.is_enabled(DeviceKind::Camera));
    assert_eq!(media.track(DeviceKind::Camera), &track);

    // Toggling a real track never prompts again.
    media.set_enabled(DeviceKind::Camera, false).await.unwrap();
    let toggle = media.set_enabled(DeviceKind::Camera, true).await.unwrap();
    assert!(toggle.new_track.is_none());
    assert_eq!(devices.requests(), 4);
}

#[tokio::test]
async fn test_disabling_a_placeholder_is_allowed() {
    init_tracing();

    let mut media = LocalMedia::acquire(Arc::new(MockDevices::denying_all())).await;
    let toggle = media
        .set_enabled(DeviceKind::Microphone, false)
        .await
        .unwrap();
    assert!(!toggle.enabled);
    assert!(toggle.new_track.is_none());
}
