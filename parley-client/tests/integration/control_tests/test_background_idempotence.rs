use parley_client::control::ControlMux;
use parley_core::{ControlMessage, VbgSettings};
use parley_core::utils::CONTROL_CHANNEL_LABEL;

use crate::integration::init_tracing;
use crate::utils::MockChannel;

fn background_frames(channel: &MockChannel) -> Vec<VbgSettings> {
    channel
        .frames()
        .into_iter()
        .filter_map(|msg| match msg {
            ControlMessage::VbgSettings(settings) => Some(settings),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_none_is_published_once() {
    init_tracing();

    let mut mux = ControlMux::new();
    let channel = MockChannel::new(CONTROL_CHANNEL_LABEL);
    mux.on_open(channel.clone()).await.unwrap();

    // Opening already published an explicit "none".
    assert!(!mux.set_background(VbgSettings::none()).await.unwrap());
    assert!(!mux.set_background(VbgSettings::none()).await.unwrap());
    assert_eq!(background_frames(&channel), vec![VbgSettings::none()]);
}

#[tokio::test]
async fn test_changes_are_published_in_order() {
    init_tracing();

    let mut mux = ControlMux::new();
    let channel = MockChannel::new(CONTROL_CHANNEL_LABEL);
    mux.on_open(channel.clone()).await.unwrap();

    assert!(mux.set_background(VbgSettings::blur(8)).await.unwrap());
    assert!(!mux.set_background(VbgSettings::blur(8)).await.unwrap());
    assert!(mux.set_background(VbgSettings::none()).await.unwrap());

    assert_eq!(
        background_frames(&channel),
        vec![VbgSettings::none(), VbgSettings::blur(8), VbgSettings::none()]
    );
}

#[tokio::test]
async fn test_setting_before_open_is_sent_on_open() {
    init_tracing();

    let mut mux = ControlMux::new();
    assert!(mux.set_background(VbgSettings::blur(4)).await.unwrap());

    let channel = MockChannel::new(CONTROL_CHANNEL_LABEL);
    mux.on_open(channel.clone()).await.unwrap();
    assert_eq!(background_frames(&channel), vec![VbgSettings::blur(4)]);
}
