use parley_client::control::ControlMux;
use parley_core::{ChatMessage, ControlMessage, DeviceState, VbgSettings};
use parley_core::utils::CONTROL_CHANNEL_LABEL;

use crate::integration::init_tracing;
use crate::utils::MockChannel;

#[tokio::test]
async fn test_state_then_queued_chat_on_open() {
    init_tracing();

    let mut mux = ControlMux::new();
    let first = ChatMessage::new("first", "alice");
    let second = ChatMessage::new("second", "alice");

    mux.send_or_queue(ControlMessage::Chat(first.clone()))
        .await
        .unwrap();
    mux.send_or_queue(ControlMessage::Chat(second.clone()))
        .await
        .unwrap();
    mux.set_device_state(DeviceState {
        camera_enabled: false,
        mic_enabled: true,
        virtual_background_enabled: false,
    })
    .await
    .unwrap();
    assert_eq!(mux.queued(), 2);

    let channel = MockChannel::new(CONTROL_CHANNEL_LABEL);
    mux.on_open(channel.clone()).await.unwrap();

    assert_eq!(mux.queued(), 0);
    assert_eq!(
        channel.frames(),
        vec![
            ControlMessage::DeviceState(DeviceState {
                camera_enabled: false,
                mic_enabled: true,
                virtual_background_enabled: false,
            }),
            ControlMessage::VbgSettings(VbgSettings::none()),
            ControlMessage::Chat(first),
            ControlMessage::Chat(second),
        ]
    );
}

#[tokio::test]
async fn test_chat_sent_immediately_once_open() {
    init_tracing();

    let mut mux = ControlMux::new();
    let channel = MockChannel::new(CONTROL_CHANNEL_LABEL);
    mux.on_open(channel.clone()).await.unwrap();
    let before = channel.sent().len();

    let msg = ChatMessage::new("hi", "alice");
    mux.send_or_queue(ControlMessage::Chat(msg.clone()))
        .await
        .unwrap();

    assert_eq!(mux.queued(), 0);
    assert_eq!(channel.frames_from(before), vec![ControlMessage::Chat(msg)]);
}

#[tokio::test]
async fn test_messages_requeue_after_close() {
    init_tracing();

    let mut mux = ControlMux::new();
    let channel = MockChannel::new(CONTROL_CHANNEL_LABEL);
    mux.on_open(channel.clone()).await.unwrap();

    channel.set_open(false);
    mux.on_closed();
    assert!(!mux.is_open());

    mux.send_or_queue(ControlMessage::Chat(ChatMessage::new("later", "alice")))
        .await
        .unwrap();
    assert_eq!(mux.queued(), 1);

    let reopened = MockChannel::new(CONTROL_CHANNEL_LABEL);
    mux.on_open(reopened.clone()).await.unwrap();
    let frames = reopened.frames();
    assert_eq!(frames[0], ControlMessage::VbgSettings(VbgSettings::none()));
    assert!(matches!(&frames[1], ControlMessage::Chat(c) if c.text == "later"));
}

#[tokio::test]
async fn test_initial_state_published_on_first_open() {
    init_tracing();

    let state = DeviceState {
        camera_enabled: true,
        mic_enabled: false,
        virtual_background_enabled: true,
    };
    let mut mux = ControlMux::with_state(state, VbgSettings::blur(8));
    assert!(!mux.is_open());

    let channel = MockChannel::new(CONTROL_CHANNEL_LABEL);
    mux.on_open(channel.clone()).await.unwrap();
    assert_eq!(
        channel.frames(),
        vec![
            ControlMessage::DeviceState(state),
            ControlMessage::VbgSettings(VbgSettings::blur(8)),
        ]
    );

    // Already published on open.
    assert!(!mux.set_background(VbgSettings::blur(8)).await.unwrap());
    assert_eq!(channel.frames().len(), 2);
}
