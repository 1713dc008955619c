use parley_core::{FileId, PeerId, WireError};
use thiserror::Error;

use crate::media::DeviceKind;
use crate::transport::SignalingState;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("peer connection error: {0}")]
    PeerConnection(String),

    #[error("operation `{op}` not allowed in signaling state {state:?}")]
    InvalidState {
        op: &'static str,
        state: SignalingState,
    },

    #[error("control channel is closed")]
    ChannelClosed,

    #[error("relay connection error: {0}")]
    Relay(String),

    #[error("relay rejected command: {code}: {message}")]
    Rejected {
        code: String,
        message: String,
        action: Option<String>,
    },

    #[error(transparent)]
    WebRtc(#[from] webrtc::Error),
}

#[derive(Debug, Error)]
pub enum NegotiationError {
    /// Unusable description: the attempt is abandoned and the peer must rejoin.
    #[error(transparent)]
    Malformed(#[from] WireError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("control channel is not open")]
    NotOpen,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("unknown transfer {0}")]
    UnknownFile(FileId),

    #[error("file of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("chunk {got} arrived while expecting {expected}")]
    Gap { expected: u32, got: u32 },

    #[error("transfer {0} timed out")]
    TimedOut(FileId),

    #[error("transfer {0} is not in a state that allows this")]
    InvalidState(FileId),

    #[error("cannot send an empty file")]
    Empty,

    #[error("invalid transfer settings: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Control(#[from] ControlError),
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("permission denied for {0:?}")]
    PermissionDenied(DeviceKind),

    #[error("device unavailable: {0}")]
    Unavailable(String),

    #[error("background transform failed: {0}")]
    Transform(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Error)]
pub enum CallError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("no session with peer {0}")]
    UnknownPeer(PeerId),

    #[error("call engine stopped")]
    Stopped,
}
