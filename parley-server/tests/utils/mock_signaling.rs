use async_trait::async_trait;
use parley_core::{PeerId, RelayEvent, RoomId};
use parley_server::SignalingOutput;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub room_id: RoomId,
    pub peer_id: PeerId,
    pub event: RelayEvent,
}

/// Mock SignalingOutput that captures every delivery in order.
#[derive(Clone)]
pub struct MockSignalingOutput {
    tx: mpsc::UnboundedSender<Delivery>,
    deliveries: Arc<Mutex<Vec<Delivery>>>,
}

impl MockSignalingOutput {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let signaling = Self {
            tx,
            deliveries: Arc::new(Mutex::new(Vec::new())),
        };
        (signaling, rx)
    }

    pub async fn all(&self) -> Vec<Delivery> {
        self.deliveries.lock().await.clone()
    }

    /// Events delivered to `peer_id`, in delivery order.
    pub async fn events_for(&self, peer_id: &PeerId) -> Vec<RelayEvent> {
        self.deliveries
            .lock()
            .await
            .iter()
            .filter(|d| &d.peer_id == peer_id)
            .map(|d| d.event.clone())
            .collect()
    }
}

#[async_trait]
impl SignalingOutput for MockSignalingOutput {
    async fn deliver(&self, room_id: &RoomId, peer_id: &PeerId, event: RelayEvent) -> bool {
        let delivery = Delivery {
            room_id: room_id.clone(),
            peer_id: peer_id.clone(),
            event,
        };
        self.deliveries.lock().await.push(delivery.clone());
        let _ = self.tx.send(delivery);
        true
    }
}
