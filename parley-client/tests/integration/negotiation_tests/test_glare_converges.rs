use parley_client::negotiation::Negotiator;
use parley_client::transport::{PeerTransport, SignalingState};
use parley_core::{PeerId, SdpType};

use crate::integration::init_tracing;
use crate::utils::MockTransport;

#[tokio::test]
async fn test_simultaneous_offers_converge_to_stable() {
    init_tracing();

    let transport_a = MockTransport::detached("b");
    let transport_b = MockTransport::detached("a");
    let mut a = Negotiator::new(PeerId::from("a"), PeerId::from("b"), transport_a.clone());
    let mut b = Negotiator::new(PeerId::from("b"), PeerId::from("a"), transport_b.clone());
    assert!(!a.is_polite());
    assert!(b.is_polite());

    // Both sides fire negotiation-needed before seeing the other's offer.
    let offer_a = a.on_negotiation_needed(false).await.unwrap().unwrap();
    let offer_b = b.on_negotiation_needed(false).await.unwrap().unwrap();
    assert_eq!(transport_a.signaling_state(), SignalingState::HaveLocalOffer);
    assert_eq!(transport_b.signaling_state(), SignalingState::HaveLocalOffer);

    // The impolite side ignores the colliding offer.
    assert!(a.on_remote_description(offer_b).await.unwrap().is_none());
    assert!(a.state().ignore_offer);

    // The polite side rolls back and answers.
    let answer_b = b.on_remote_description(offer_a).await.unwrap().unwrap();
    assert_eq!(answer_b.kind, SdpType::Answer);
    assert_eq!(transport_b.signaling_state(), SignalingState::Stable);

    assert!(a.on_remote_description(answer_b).await.unwrap().is_none());
    assert_eq!(transport_a.signaling_state(), SignalingState::Stable);
    assert_eq!(transport_b.signaling_state(), SignalingState::Stable);
}

#[tokio::test]
async fn test_negotiation_deferred_while_offer_pending() {
    init_tracing();

    let transport = MockTransport::detached("b");
    let mut a = Negotiator::new(PeerId::from("a"), PeerId::from("b"), transport.clone());

    a.on_negotiation_needed(false).await.unwrap().unwrap();
    assert!(a.restart_ice().await.unwrap().is_none());
    assert!(a.state().deferred.is_some());
    assert!(a.take_deferred().is_none());

    let answer = parley_core::SessionDescription::answer(crate::utils::TEST_SDP);
    a.on_remote_description(answer).await.unwrap();

    let deferred = a.take_deferred().expect("deferred request replays once stable");
    assert!(deferred.ice_restart);
    assert_eq!(transport.offers(), 1);
}

#[tokio::test]
async fn test_stale_answer_is_dropped() {
    init_tracing();

    let transport = MockTransport::detached("b");
    let mut a = Negotiator::new(PeerId::from("a"), PeerId::from("b"), transport.clone());

    let answer = parley_core::SessionDescription::answer(crate::utils::TEST_SDP);
    assert!(a.on_remote_description(answer).await.unwrap().is_none());
    assert_eq!(transport.signaling_state(), SignalingState::Stable);
    assert!(!transport.has_remote_description().await);
}
