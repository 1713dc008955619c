use parley_core::{LeaveReason, PeerId, RelayEvent, RoomId};
use parley_server::RelayConfig;

use crate::integration::{create_test_manager, init_tracing};
use crate::utils::peer;

#[tokio::test]
async fn test_peer_leaves_others_stay() {
    init_tracing();

    let (manager, signaling, _rx) = create_test_manager(RelayConfig::default());
    let room = RoomId::from("r");
    for id in ["a", "b", "c"] {
        manager.join(&room, peer(id, None)).await.unwrap();
    }

    manager
        .leave(&room, &PeerId::from("b"), LeaveReason::Left)
        .await
        .unwrap();

    let members: Vec<_> = manager
        .members(&room)
        .await
        .into_iter()
        .map(|p| p.peer_id)
        .collect();
    assert_eq!(members, vec![PeerId::from("a"), PeerId::from("c")]);

    for id in ["a", "c"] {
        let events = signaling.events_for(&PeerId::from(id)).await;
        assert!(events.contains(&RelayEvent::PeerLeft {
            peer_id: PeerId::from("b"),
            reason: LeaveReason::Left,
        }));
    }
}

#[tokio::test]
async fn test_last_leave_destroys_room() {
    init_tracing();

    let (manager, _signaling, _rx) = create_test_manager(RelayConfig::default());
    let room = RoomId::from("r");
    manager.join(&room, peer("a", None)).await.unwrap();
    manager.join(&room, peer("b", None)).await.unwrap();

    manager
        .leave(&room, &PeerId::from("a"), LeaveReason::Left)
        .await
        .unwrap();
    assert!(manager.contains_room(&room));

    manager
        .leave(&room, &PeerId::from("b"), LeaveReason::Left)
        .await
        .unwrap();

    // The room unregisters itself right after replying.
    for _ in 0..50 {
        if !manager.contains_room(&room) {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(!manager.contains_room(&room));

    // A fresh join recreates it.
    let accepted = manager.join(&room, peer("c", None)).await.unwrap();
    assert!(accepted.existing_peers.is_empty());
}
