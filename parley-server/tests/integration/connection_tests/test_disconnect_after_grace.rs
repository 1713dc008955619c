use parley_core::{LeaveReason, PeerId, RelayEvent, RoomId};
use parley_server::{RelayConfig, SignalingService};
use std::time::Duration;

use crate::integration::{init_tracing, subscribe};
use crate::utils::{join_envelope, next_event, stays_quiet};

#[tokio::test(start_paused = true)]
async fn test_peer_disconnect_triggers_leave_after_grace() {
    init_tracing();

    let service = SignalingService::new(RelayConfig::default());
    let room = RoomId::from("r");

    let dropped = subscribe(&service, "r", "a");
    service.handle(join_envelope("r", "a", None)).await.unwrap();
    let mut watcher = subscribe(&service, "r", "b");
    service.handle(join_envelope("r", "b", None)).await.unwrap();

    drop(dropped);

    // Still a member during the grace period.
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(service.rooms().members(&room).await.len(), 2);

    tokio::time::sleep(Duration::from_secs(4)).await;
    let event = next_event(&mut watcher).await.unwrap();
    assert_eq!(
        event,
        RelayEvent::PeerLeft {
            peer_id: PeerId::from("a"),
            reason: LeaveReason::Disconnected,
        }
    );
    assert_eq!(service.rooms().members(&room).await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_resubscribe_within_grace_keeps_membership() {
    init_tracing();

    let service = SignalingService::new(RelayConfig::default());
    let room = RoomId::from("r");

    let first = subscribe(&service, "r", "a");
    service.handle(join_envelope("r", "a", None)).await.unwrap();
    let mut watcher = subscribe(&service, "r", "b");
    service.handle(join_envelope("r", "b", None)).await.unwrap();

    drop(first);
    tokio::time::sleep(Duration::from_secs(1)).await;
    let _second = subscribe(&service, "r", "a");

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(stays_quiet(&mut watcher).await);
    assert_eq!(service.rooms().members(&room).await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_last_disconnect_destroys_room() {
    init_tracing();

    let service = SignalingService::new(RelayConfig::default());
    let room = RoomId::from("lonely");

    let only = subscribe(&service, "lonely", "a");
    service
        .handle(join_envelope("lonely", "a", None))
        .await
        .unwrap();
    assert!(service.rooms().contains_room(&room));

    drop(only);
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(!service.rooms().contains_room(&room));
    assert_eq!(service.rooms().room_count(), 0);
}
