use crate::error::RelayError;
use parley_core::{LeaveReason, PeerId, PeerInfo, SignalEnvelope};
use tokio::sync::oneshot;

pub type Reply<T> = oneshot::Sender<Result<T, RelayError>>;

/// Commands delivered to a room actor by the registry.
#[derive(Debug)]
pub enum RoomCommand {
    /// Admit a peer, evicting an older session of the same user.
    /// Replies with the surviving members the newcomer should negotiate with.
    Join { peer: PeerInfo, reply: Reply<Vec<PeerInfo>> },

    /// Fan an offer/answer/ice envelope out to the other members.
    /// Replies with the number of members it was delivered to.
    Publish { envelope: SignalEnvelope, reply: Reply<usize> },

    /// Explicit leave or relay-detected disconnect.
    Leave {
        peer_id: PeerId,
        reason: LeaveReason,
        reply: Reply<()>,
    },

    /// Current member list, in join order.
    Members { reply: oneshot::Sender<Vec<PeerInfo>> },
}
