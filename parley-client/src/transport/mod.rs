mod relay_client;
mod transport_event;
mod webrtc_backend;

pub use relay_client::*;
pub use transport_event::*;
pub use webrtc_backend::*;

use crate::error::TransportError;
use crate::media::MediaTrack;
use async_trait::async_trait;
use parley_core::{
    EncoderParams, IceCandidate, JoinAccepted, JoinRequest, PeerId, RoomId, SessionDescription,
    SignalEnvelope, StatsSample,
};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    HaveLocalPranswer,
    HaveRemotePranswer,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// One peer connection. Events flow back through the `TransportEvent`
/// channel handed to [`TransportFactory::create`].
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn create_offer(&self, ice_restart: bool) -> Result<SessionDescription, TransportError>;

    async fn create_answer(&self) -> Result<SessionDescription, TransportError>;

    async fn set_local_description(&self, desc: SessionDescription)
    -> Result<(), TransportError>;

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), TransportError>;

    /// Drops a pending local offer and returns to `stable`.
    async fn rollback(&self) -> Result<(), TransportError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError>;

    fn signaling_state(&self) -> SignalingState;

    async fn has_remote_description(&self) -> bool;

    /// Creates the ordered, reliable control channel. It is reported through
    /// `TransportEvent::ControlOpen` once usable.
    async fn create_control_channel(&self, label: &str) -> Result<(), TransportError>;

    /// Adds an outbound track and returns its sender.
    async fn attach_track(&self, track: MediaTrack)
    -> Result<Arc<dyn MediaSender>, TransportError>;

    /// Latest outbound statistics, if any were collected yet.
    async fn stats(&self) -> Option<StatsSample>;

    async fn close(&self) -> Result<(), TransportError>;
}

#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        remote: &PeerId,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>, TransportError>;
}

/// Ordered, reliable text channel between two peers.
#[async_trait]
pub trait ControlChannel: Send + Sync {
    fn label(&self) -> &str;

    fn is_open(&self) -> bool;

    async fn send_text(&self, text: String) -> Result<(), TransportError>;

    /// Bytes queued but not yet handed to the network.
    async fn buffered_amount(&self) -> usize;

    /// `TransportEvent::BufferedAmountLow` fires when the buffer drains below this.
    async fn set_low_water_mark(&self, bytes: usize);

    async fn close(&self);
}

/// Outbound track slot; replacing the track never renegotiates.
#[async_trait]
pub trait MediaSender: Send + Sync {
    async fn replace_track(&self, track: Option<MediaTrack>) -> Result<(), TransportError>;

    /// `None` goes back to the encoder's own defaults.
    async fn set_encoding(&self, params: Option<EncoderParams>) -> Result<(), TransportError>;
}

#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn sample(&self) -> Option<StatsSample>;
}

/// Path to the relay.
#[async_trait]
pub trait SignalSink: Send + Sync {
    async fn join(
        &self,
        room_id: &RoomId,
        peer_id: &PeerId,
        request: JoinRequest,
    ) -> Result<JoinAccepted, TransportError>;

    /// Fire-and-forget delivery of an offer, answer, candidate or leave.
    async fn signal(&self, envelope: SignalEnvelope) -> Result<(), TransportError>;
}
