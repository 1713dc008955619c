use crate::model::peer::{PeerId, PeerInfo, RoomId};
use crate::model::signaling::{IceCandidate, SessionDescription};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LeaveReason {
    Left,
    Disconnected,
    Replaced,
}

/// Events pushed by the relay to one subscribed peer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum RelayEvent {
    PeerJoined {
        peer: PeerInfo,
    },
    Offer {
        from: PeerId,
        description: SessionDescription,
    },
    Answer {
        from: PeerId,
        description: SessionDescription,
    },
    IceCandidate {
        from: PeerId,
        candidate: IceCandidate,
    },
    /// The receiving peer was evicted by a newer session of the same user.
    PeerReplaced {
        room_id: RoomId,
        replaced_by: PeerId,
    },
    PeerLeft {
        peer_id: PeerId,
        reason: LeaveReason,
    },
}

impl RelayEvent {
    /// Event name used on the SSE stream.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PeerJoined { .. } => "peer-joined",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::IceCandidate { .. } => "ice-candidate",
            Self::PeerReplaced { .. } => "peer-replaced",
            Self::PeerLeft { .. } => "peer-left",
        }
    }
}

/// Reply to an accepted `join`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinAccepted {
    pub accepted: bool,
    pub existing_peers: Vec<PeerInfo>,
}
