use parley_client::CallEvent;
use parley_client::transport::PeerConnectionState;
use parley_core::{ConnectionIndicator, PeerId, RelayEvent, SessionDescription, SignalPayload};
use std::time::Duration;

use super::TestCall;
use crate::integration::init_tracing;
use crate::utils::{MockDevices, TEST_SDP, next_signal, peer};

/// Default reconciliation window plus a margin.
const PAST_WINDOW: Duration = Duration::from_secs(9);

async fn answer_next_offer(call: &mut TestCall, ice_restart: bool) {
    let offer = next_signal(&mut call.signals, |p| matches!(p, SignalPayload::Offer(_)))
        .await
        .unwrap();
    assert_eq!(offer.target, Some(PeerId::from("bob")));
    let transport = call.factory.transport("bob").unwrap();
    assert_eq!(transport.ice_restarts() > 0, ice_restart);

    call.relay
        .send(RelayEvent::Answer {
            from: PeerId::from("bob"),
            description: SessionDescription::answer(TEST_SDP),
        })
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_restarts_ice_then_fails() {
    init_tracing();

    let mut call = TestCall::join(MockDevices::granting_all(), vec![peer("bob")])
        .await
        .unwrap();
    answer_next_offer(&mut call, false).await;
    let transport = call.factory.transport("bob").unwrap();

    transport
        .set_connection(PeerConnectionState::Connected)
        .await;

    transport
        .set_connection(PeerConnectionState::Disconnected)
        .await;
    call.next_event(|e| matches!(e, CallEvent::Indicator(ConnectionIndicator::Degraded)))
        .await
        .unwrap();

    // Each expired window spends one restart.
    tokio::time::sleep(PAST_WINDOW).await;
    answer_next_offer(&mut call, true).await;
    assert_eq!(transport.ice_restarts(), 1);

    tokio::time::sleep(PAST_WINDOW).await;
    answer_next_offer(&mut call, true).await;
    assert_eq!(transport.ice_restarts(), 2);

    // Budget spent: no third restart, the connection is given up.
    tokio::time::sleep(PAST_WINDOW).await;
    call.next_event(|e| matches!(e, CallEvent::Indicator(ConnectionIndicator::Failed)))
        .await
        .unwrap();
    let rejoin = call
        .next_event(|e| matches!(e, CallEvent::RejoinRequired { .. }))
        .await
        .unwrap();
    assert!(
        matches!(rejoin, CallEvent::RejoinRequired { peer_id, .. } if peer_id == PeerId::from("bob"))
    );
    assert_eq!(transport.ice_restarts(), 2);
    assert!(transport.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_recovery_within_window_needs_no_restart() {
    init_tracing();

    let mut call = TestCall::join(MockDevices::granting_all(), vec![peer("bob")])
        .await
        .unwrap();
    answer_next_offer(&mut call, false).await;
    let transport = call.factory.transport("bob").unwrap();

    transport
        .set_connection(PeerConnectionState::Connected)
        .await;
    transport
        .set_connection(PeerConnectionState::Disconnected)
        .await;
    tokio::time::sleep(Duration::from_secs(3)).await;
    transport
        .set_connection(PeerConnectionState::Connected)
        .await;

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(transport.ice_restarts(), 0);
    assert_eq!(transport.offers(), 1);
    assert!(!transport.is_closed());
}
