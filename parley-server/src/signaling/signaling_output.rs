use async_trait::async_trait;
use parley_core::{PeerId, RelayEvent, RoomId};

/// Push side of the relay: rooms hand events to it, it routes them to the
/// subscribed client.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Queue `event` for the subscription of `peer_id` in `room_id`.
    /// Returns `false` when nobody is listening.
    async fn deliver(&self, room_id: &RoomId, peer_id: &PeerId, event: RelayEvent) -> bool;
}
