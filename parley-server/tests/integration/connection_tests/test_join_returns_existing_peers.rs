use parley_core::{PeerId, RelayEvent, RoomId};
use parley_server::RelayConfig;

use crate::integration::{create_test_manager, init_tracing};
use crate::utils::peer;

#[tokio::test]
async fn test_join_returns_existing_peers() {
    init_tracing();

    let (manager, signaling, _rx) = create_test_manager(RelayConfig::default());
    let room = RoomId::from("room-1");

    let first = manager.join(&room, peer("a", None)).await.unwrap();
    assert!(first.accepted);
    assert!(first.existing_peers.is_empty());

    let second = manager.join(&room, peer("b", None)).await.unwrap();
    let ids: Vec<_> = second.existing_peers.iter().map(|p| p.peer_id.clone()).collect();
    assert_eq!(ids, vec![PeerId::from("a")]);

    // Only the earlier member hears about the newcomer.
    let to_a = signaling.events_for(&PeerId::from("a")).await;
    assert!(matches!(
        to_a.as_slice(),
        [RelayEvent::PeerJoined { peer }] if peer.peer_id == PeerId::from("b")
    ));
    assert!(signaling.events_for(&PeerId::from("b")).await.is_empty());
    assert_eq!(manager.room_count(), 1);
}

#[tokio::test]
async fn test_same_peer_rejoin_replaces_entry_silently() {
    init_tracing();

    let (manager, signaling, _rx) = create_test_manager(RelayConfig::default());
    let room = RoomId::from("room-1");

    manager.join(&room, peer("a", Some("1"))).await.unwrap();
    manager.join(&room, peer("b", Some("2"))).await.unwrap();
    let again = manager.join(&room, peer("a", Some("1"))).await.unwrap();

    let ids: Vec<_> = again.existing_peers.iter().map(|p| p.peer_id.clone()).collect();
    assert_eq!(ids, vec![PeerId::from("b")]);
    assert_eq!(manager.members(&room).await.len(), 2);

    // No eviction notice for a peer re-joining under its own id.
    let all = signaling.all().await;
    assert!(
        !all.iter()
            .any(|d| matches!(d.event, RelayEvent::PeerReplaced { .. }))
    );
}
