pub mod messaging_tests;
pub mod multi_peer_tests;

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Level;

use parley_core::{PeerId, RoomId};
use parley_server::{RelayConfig, RoomManager, SessionKey, SignalingService, Subscription};

use crate::utils::{Delivery, MockSignalingOutput};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn create_test_manager(
    config: RelayConfig,
) -> (
    RoomManager,
    MockSignalingOutput,
    mpsc::UnboundedReceiver<Delivery>,
) {
    let (signaling, rx) = MockSignalingOutput::new();
    let manager = RoomManager::new(Arc::new(signaling.clone()), config);
    (manager, signaling, rx)
}

pub fn key(room: &str, peer: &str) -> SessionKey {
    SessionKey::new(RoomId::from(room), PeerId::from(peer))
}

pub fn subscribe(service: &SignalingService, room: &str, peer: &str) -> Subscription {
    service
        .subscribe(key(room, peer), Some("test-token"))
        .expect("subscription refused")
}
