use parley_core::{PeerId, RelayEvent, RoomId};
use parley_server::{RelayConfig, RelayError};

use crate::integration::{create_test_manager, init_tracing};
use crate::utils::{offer_envelope, peer};

#[tokio::test]
async fn test_offer_fans_out_without_reflection() {
    init_tracing();

    let (manager, signaling, mut rx) = create_test_manager(RelayConfig::default());
    let room = RoomId::from("trio");
    for id in ["a", "b", "c"] {
        manager.join(&room, peer(id, None)).await.unwrap();
    }
    while rx.try_recv().is_ok() {}

    let delivered = manager.publish(offer_envelope("trio", "a")).await.unwrap();
    assert_eq!(delivered, 2);

    let mut recipients = Vec::new();
    while let Ok(delivery) = rx.try_recv() {
        assert!(matches!(
            &delivery.event,
            RelayEvent::Offer { from, .. } if from == &PeerId::from("a")
        ));
        recipients.push(delivery.peer_id);
    }
    recipients.sort_by(|x, y| x.as_str().cmp(y.as_str()));
    assert_eq!(recipients, vec![PeerId::from("b"), PeerId::from("c")]);

    // The sender never receives its own message.
    let to_a = signaling.events_for(&PeerId::from("a")).await;
    assert!(!to_a.iter().any(|e| matches!(e, RelayEvent::Offer { .. })));
}

#[tokio::test]
async fn test_publish_from_non_member_rejected() {
    init_tracing();

    let (manager, _signaling, _rx) = create_test_manager(RelayConfig::default());
    let room = RoomId::from("duo");
    manager.join(&room, peer("a", None)).await.unwrap();

    let err = manager
        .publish(offer_envelope("duo", "stranger"))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::UnknownPeer(_)));

    let err = manager
        .publish(offer_envelope("nowhere", "a"))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::UnknownRoom(_)));
}
