use parley_core::{PeerId, RelayEvent, RoomId};
use parley_server::{RelayConfig, RelayError};

use crate::integration::{create_test_manager, init_tracing};
use crate::utils::{ice_envelope, peer};

#[tokio::test]
async fn test_targeted_ice_candidate_is_unicast() {
    init_tracing();

    let (manager, _signaling, mut rx) = create_test_manager(RelayConfig::default());
    let room = RoomId::from("trio");
    for id in ["a", "b", "c"] {
        manager.join(&room, peer(id, None)).await.unwrap();
    }
    while rx.try_recv().is_ok() {}

    let delivered = manager.publish(ice_envelope("trio", "a", "c")).await.unwrap();
    assert_eq!(delivered, 1);

    let delivery = rx.try_recv().unwrap();
    assert_eq!(delivery.peer_id, PeerId::from("c"));
    assert!(matches!(
        delivery.event,
        RelayEvent::IceCandidate { ref from, .. } if from == &PeerId::from("a")
    ));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_target_outside_room_rejected() {
    init_tracing();

    let (manager, _signaling, _rx) = create_test_manager(RelayConfig::default());
    let room = RoomId::from("duo");
    manager.join(&room, peer("a", None)).await.unwrap();
    manager.join(&room, peer("b", None)).await.unwrap();

    let err = manager
        .publish(ice_envelope("duo", "a", "zed"))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::UnknownPeer(ref p) if p == &PeerId::from("zed")));

    // Targeting yourself is no different.
    let err = manager
        .publish(ice_envelope("duo", "a", "a"))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::UnknownPeer(_)));
}
