use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::room::room::RoomTable;
use crate::room::{Room, RoomCommand};
use crate::signaling::SignalingOutput;
use dashmap::DashMap;
use parley_core::{JoinAccepted, LeaveReason, PeerId, PeerInfo, RoomId, SignalEnvelope};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// A command may race with its room retiring; it is retried on a fresh room.
const DISPATCH_ATTEMPTS: usize = 3;

/// Registry of live rooms. Each room runs as its own actor task, so rooms
/// never contend with each other and one room's mutations are serialized.
#[derive(Clone)]
pub struct RoomManager {
    rooms: RoomTable,
    signaling: Arc<dyn SignalingOutput>,
    config: RelayConfig,
}

impl RoomManager {
    pub fn new(signaling: Arc<dyn SignalingOutput>, config: RelayConfig) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            signaling,
            config,
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn contains_room(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    fn get_or_create_room(&self, room_id: &RoomId) -> mpsc::Sender<RoomCommand> {
        self.rooms
            .entry(room_id.clone())
            .or_insert_with(|| {
                info!("Creating new room: {}", room_id);
                let (tx, rx) = mpsc::channel(self.config.room_command_buffer);
                let room = Room::new(
                    room_id.clone(),
                    rx,
                    self.signaling.clone(),
                    self.config.max_peers_per_room,
                )
                .registered(self.rooms.clone(), &tx);
                tokio::spawn(room.run());
                tx
            })
            .clone()
    }

    fn existing_room(&self, room_id: &RoomId) -> Result<mpsc::Sender<RoomCommand>, RelayError> {
        self.rooms
            .get(room_id)
            .map(|tx| tx.clone())
            .ok_or_else(|| RelayError::UnknownRoom(room_id.clone()))
    }

    fn forget_if_stale(&self, room_id: &RoomId, tx: &mpsc::Sender<RoomCommand>) {
        self.rooms.remove_if(room_id, |_, current| current.same_channel(tx));
    }

    /// Registers `peer`, evicting an older session of the same user first.
    pub async fn join(&self, room_id: &RoomId, peer: PeerInfo) -> Result<JoinAccepted, RelayError> {
        for _ in 0..DISPATCH_ATTEMPTS {
            let tx = self.get_or_create_room(room_id);
            let (reply, rx) = oneshot::channel();
            let cmd = RoomCommand::Join {
                peer: peer.clone(),
                reply,
            };

            if tx.send(cmd).await.is_err() {
                self.forget_if_stale(room_id, &tx);
                continue;
            }

            match rx.await {
                Ok(Err(RelayError::RoomClosed(_))) | Err(_) => {
                    debug!(room = %room_id, "Room retired during join, retrying");
                    self.forget_if_stale(room_id, &tx);
                }
                Ok(result) => {
                    return result.map(|existing_peers| JoinAccepted {
                        accepted: true,
                        existing_peers,
                    });
                }
            }
        }
        Err(RelayError::RoomClosed(room_id.clone()))
    }

    /// Forwards an offer/answer/ice envelope to the other members.
    pub async fn publish(&self, envelope: SignalEnvelope) -> Result<usize, RelayError> {
        let room_id = envelope.room_id.clone();
        let tx = self.existing_room(&room_id)?;
        let (reply, rx) = oneshot::channel();

        if tx.send(RoomCommand::Publish { envelope, reply }).await.is_err() {
            self.forget_if_stale(&room_id, &tx);
            return Err(RelayError::UnknownRoom(room_id));
        }
        rx.await
            .unwrap_or_else(|_| Err(RelayError::UnknownRoom(room_id.clone())))
    }

    pub async fn leave(
        &self,
        room_id: &RoomId,
        peer_id: &PeerId,
        reason: LeaveReason,
    ) -> Result<(), RelayError> {
        let tx = self.existing_room(room_id)?;
        let (reply, rx) = oneshot::channel();
        let cmd = RoomCommand::Leave {
            peer_id: peer_id.clone(),
            reason,
            reply,
        };

        if tx.send(cmd).await.is_err() {
            self.forget_if_stale(room_id, &tx);
            return Err(RelayError::UnknownRoom(room_id.clone()));
        }
        rx.await
            .unwrap_or_else(|_| Err(RelayError::UnknownRoom(room_id.clone())))
    }

    /// Snapshot of the member list; empty for unknown rooms.
    pub async fn members(&self, room_id: &RoomId) -> Vec<PeerInfo> {
        let Ok(tx) = self.existing_room(room_id) else {
            return Vec::new();
        };
        let (reply, rx) = oneshot::channel();
        if tx.send(RoomCommand::Members { reply }).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }
}
