use crate::error::RelayError;
use crate::room::room_command::RoomCommand;
use crate::signaling::SignalingOutput;
use dashmap::DashMap;
use parley_core::{
    LeaveReason, PeerId, PeerInfo, RelayEvent, RoomId, SignalEnvelope, SignalPayload,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub(crate) type RoomTable = Arc<DashMap<RoomId, mpsc::Sender<RoomCommand>>>;

/// Link back to the registry so an emptied room can remove itself.
struct Registration {
    table: RoomTable,
    self_tx: mpsc::WeakSender<RoomCommand>,
}

/// Actor owning the member set of one room. All mutations of a room go
/// through its command queue, so they are applied one at a time.
pub struct Room {
    id: RoomId,
    members: Vec<PeerInfo>,
    command_rx: mpsc::Receiver<RoomCommand>,
    signaling: Arc<dyn SignalingOutput>,
    max_peers: usize,
    registration: Option<Registration>,
}

impl Room {
    pub fn new(
        id: RoomId,
        command_rx: mpsc::Receiver<RoomCommand>,
        signaling: Arc<dyn SignalingOutput>,
        max_peers: usize,
    ) -> Self {
        Self {
            id,
            members: Vec::new(),
            command_rx,
            signaling,
            max_peers,
            registration: None,
        }
    }

    pub(crate) fn registered(mut self, table: RoomTable, self_tx: &mpsc::Sender<RoomCommand>) -> Self {
        self.registration = Some(Registration {
            table,
            self_tx: self_tx.downgrade(),
        });
        self
    }

    pub async fn run(mut self) {
        info!(room = %self.id, "Room event loop started");

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd).await;

            if self.members.is_empty() && self.registration.is_some() {
                self.retire().await;
                break;
            }
        }

        info!(room = %self.id, "Room event loop finished");
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { peer, reply } => {
                let result = self.join(peer).await;
                let _ = reply.send(result);
            }
            RoomCommand::Publish { envelope, reply } => {
                let result = self.publish(envelope).await;
                let _ = reply.send(result);
            }
            RoomCommand::Leave {
                peer_id,
                reason,
                reply,
            } => {
                let result = self.leave(&peer_id, reason).await;
                let _ = reply.send(result);
            }
            RoomCommand::Members { reply } => {
                let _ = reply.send(self.members.clone());
            }
        }
    }

    async fn join(&mut self, peer: PeerInfo) -> Result<Vec<PeerInfo>, RelayError> {
        info!(room = %self.id, peer = %peer.peer_id, user = ?peer.user_id, "Processing join");

        // Same connection attempt re-joining: drop the stale entry silently.
        if let Some(pos) = self.position(&peer.peer_id) {
            debug!(room = %self.id, peer = %peer.peer_id, "Replacing stale entry of rejoining peer");
            self.members.remove(pos);
        }

        let duplicate = peer.user_id.as_ref().and_then(|user_id| {
            self.members
                .iter()
                .position(|m| m.user_id.as_ref() == Some(user_id))
        });

        if let Some(pos) = duplicate {
            let old_peer = self.members[pos].peer_id.clone();
            info!(
                room = %self.id,
                evicted = %old_peer,
                replacement = %peer.peer_id,
                "Evicting older session of the same user"
            );

            // The evicted peer hears about it before the replacement is admitted.
            let notice = RelayEvent::PeerReplaced {
                room_id: self.id.clone(),
                replaced_by: peer.peer_id.clone(),
            };
            if !self.signaling.deliver(&self.id, &old_peer, notice).await {
                warn!(room = %self.id, peer = %old_peer, "Evicted peer had no live subscription");
            }

            self.members.remove(pos);
            self.broadcast(
                &old_peer,
                RelayEvent::PeerLeft {
                    peer_id: old_peer.clone(),
                    reason: LeaveReason::Replaced,
                },
            )
            .await;
        }

        if self.members.len() >= self.max_peers {
            warn!(room = %self.id, peer = %peer.peer_id, "Room full, join rejected");
            return Err(RelayError::RoomFull(self.id.clone()));
        }

        let existing = self.members.clone();
        self.members.push(peer.clone());
        self.broadcast(&peer.peer_id, RelayEvent::PeerJoined { peer: peer.clone() })
            .await;

        info!(room = %self.id, peer = %peer.peer_id, members = self.members.len(), "Peer admitted");
        Ok(existing)
    }

    async fn publish(&mut self, envelope: SignalEnvelope) -> Result<usize, RelayError> {
        let sender = envelope.sender.clone();
        if self.position(&sender).is_none() {
            return Err(RelayError::UnknownPeer(sender));
        }

        let event = match envelope.payload {
            SignalPayload::Offer(description) => RelayEvent::Offer {
                from: sender.clone(),
                description,
            },
            SignalPayload::Answer(description) => RelayEvent::Answer {
                from: sender.clone(),
                description,
            },
            SignalPayload::Ice(candidate) => RelayEvent::IceCandidate {
                from: sender.clone(),
                candidate,
            },
            other => return Err(RelayError::NotRelayable(other.action())),
        };

        match envelope.target {
            Some(target) => {
                if target == sender || self.position(&target).is_none() {
                    return Err(RelayError::UnknownPeer(target));
                }
                let delivered = self.signaling.deliver(&self.id, &target, event).await;
                Ok(usize::from(delivered))
            }
            None => Ok(self.broadcast(&sender, event).await),
        }
    }

    async fn leave(&mut self, peer_id: &PeerId, reason: LeaveReason) -> Result<(), RelayError> {
        let Some(pos) = self.position(peer_id) else {
            return Err(RelayError::UnknownPeer(peer_id.clone()));
        };

        self.members.remove(pos);
        info!(room = %self.id, peer = %peer_id, ?reason, "Peer removed");

        self.broadcast(
            peer_id,
            RelayEvent::PeerLeft {
                peer_id: peer_id.clone(),
                reason,
            },
        )
        .await;
        Ok(())
    }

    /// Delivers to every member except `except`. Returns the delivery count.
    async fn broadcast(&self, except: &PeerId, event: RelayEvent) -> usize {
        let mut delivered = 0;
        for member in self.members.iter().filter(|m| &m.peer_id != except) {
            if self
                .signaling
                .deliver(&self.id, &member.peer_id, event.clone())
                .await
            {
                delivered += 1;
            }
        }
        delivered
    }

    fn position(&self, peer_id: &PeerId) -> Option<usize> {
        self.members.iter().position(|m| &m.peer_id == peer_id)
    }

    /// Unregisters the empty room and turns away whatever is still queued.
    async fn retire(&mut self) {
        if let Some(reg) = self.registration.take() {
            if let Some(me) = reg.self_tx.upgrade() {
                reg.table.remove_if(&self.id, |_, tx| tx.same_channel(&me));
            }
        }
        self.command_rx.close();

        while let Some(cmd) = self.command_rx.recv().await {
            let closed = || RelayError::RoomClosed(self.id.clone());
            match cmd {
                RoomCommand::Join { reply, .. } => {
                    let _ = reply.send(Err(closed()));
                }
                RoomCommand::Publish { reply, .. } => {
                    let _ = reply.send(Err(closed()));
                }
                RoomCommand::Leave { reply, .. } => {
                    let _ = reply.send(Err(closed()));
                }
                RoomCommand::Members { reply } => {
                    let _ = reply.send(Vec::new());
                }
            }
        }

        info!(room = %self.id, "Room empty, destroyed");
    }
}
