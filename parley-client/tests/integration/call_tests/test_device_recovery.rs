use parley_client::media::{DeviceKind, TrackSource};
use parley_client::{CallError, MediaError};
use parley_core::{ControlMessage, DeviceState, VbgSettings};

use super::TestCall;
use crate::integration::init_tracing;
use crate::utils::{MockDevices, eventually, peer};

fn camera_state(frames: &[ControlMessage]) -> Vec<bool> {
    frames
        .iter()
        .filter_map(|msg| match msg {
            ControlMessage::DeviceState(state) => Some(state.camera_enabled),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_denied_devices_still_join_and_recover() {
    init_tracing();

    let call = TestCall::join(MockDevices::denying_all(), vec![peer("bob")])
        .await
        .unwrap();
    let transport = call.factory.transport("bob").unwrap();

    // Placeholders go out until the camera is granted.
    let video = transport.video_sender().unwrap();
    assert!(eventually(|| {
        video
            .last_track()
            .is_some_and(|track| track.source == TrackSource::Placeholder)
    })
    .await);

    let channel = transport.open_control().await;
    assert!(eventually(|| channel.sent().len() >= 2).await);
    assert_eq!(
        channel.frames()[..2],
        [
            ControlMessage::DeviceState(DeviceState {
                camera_enabled: false,
                mic_enabled: false,
                virtual_background_enabled: false,
            }),
            ControlMessage::VbgSettings(VbgSettings::none()),
        ]
    );

    call.devices.grant(DeviceKind::Camera);
    call.handle
        .set_device_enabled(DeviceKind::Camera, true)
        .await
        .unwrap();
    assert_eq!(
        video.last_track().map(|track| track.source),
        Some(TrackSource::Camera)
    );
    assert!(eventually(|| camera_state(&channel.frames()) == vec![false, true]).await);

    let err = call
        .handle
        .set_device_enabled(DeviceKind::Microphone, true)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CallError::Media(MediaError::PermissionDenied(DeviceKind::Microphone))
    ));
}

#[tokio::test]
async fn test_background_change_reaches_peer_once() {
    init_tracing();

    let call = TestCall::join(MockDevices::granting_all(), vec![peer("bob")])
        .await
        .unwrap();
    let transport = call.factory.transport("bob").unwrap();
    let channel = transport.open_control().await;
    assert!(eventually(|| channel.sent().len() >= 2).await);

    call.handle
        .set_background(VbgSettings::blur(8))
        .await
        .unwrap();
    call.handle
        .set_background(VbgSettings::blur(8))
        .await
        .unwrap();
    call.handle
        .set_background(VbgSettings::none())
        .await
        .unwrap();

    let backgrounds = || -> Vec<VbgSettings> {
        channel
            .frames()
            .into_iter()
            .filter_map(|msg| match msg {
                ControlMessage::VbgSettings(settings) => Some(settings),
                _ => None,
            })
            .collect()
    };
    assert!(
        eventually(|| backgrounds()
            == vec![VbgSettings::none(), VbgSettings::blur(8), VbgSettings::none()])
        .await
    );

    let video = transport.video_sender().unwrap();
    assert_eq!(
        video.last_track().map(|track| track.source),
        Some(TrackSource::Camera)
    );
}
