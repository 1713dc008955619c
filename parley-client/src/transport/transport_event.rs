use crate::media::MediaTrack;
use crate::transport::{ControlChannel, PeerConnectionState};
use parley_core::IceCandidate;
use std::sync::Arc;

/// Events a transport generates for the session that owns it.
pub enum TransportEvent {
    /// Local changes require a new offer/answer exchange.
    NegotiationNeeded,

    /// Trickle ICE: a local candidate to forward to the remote peer.
    LocalCandidate(IceCandidate),

    ConnectionState(PeerConnectionState),

    /// The control channel is open. The channel itself is passed along so
    /// the session can write to it.
    ControlOpen(Arc<dyn ControlChannel>),

    /// Text frame received on the control channel.
    ControlMessage(String),

    ControlClosed,

    /// The control channel buffer drained below the low-water mark.
    BufferedAmountLow,

    RemoteTrack(MediaTrack),
}

impl std::fmt::Debug for TransportEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegotiationNeeded => write!(f, "NegotiationNeeded"),
            Self::LocalCandidate(c) => write!(f, "LocalCandidate({})", c.candidate),
            Self::ConnectionState(s) => write!(f, "ConnectionState({:?})", s),
            Self::ControlOpen(ch) => write!(f, "ControlOpen({})", ch.label()),
            Self::ControlMessage(text) => write!(f, "ControlMessage({} bytes)", text.len()),
            Self::ControlClosed => write!(f, "ControlClosed"),
            Self::BufferedAmountLow => write!(f, "BufferedAmountLow"),
            Self::RemoteTrack(t) => write!(f, "RemoteTrack({})", t.id),
        }
    }
}
