mod background;
mod control;
mod peer;
mod quality;
mod relay_event;
mod signaling;
mod transfer;
mod whiteboard;

pub use background::{BackgroundMode, VbgSettings};
pub use control::{ChatMessage, ControlMessage, DeviceState, MAX_CHUNK_SIZE};
pub use peer::{PeerId, PeerInfo, Role, RoomId, UserId};
pub use quality::{ConnectionIndicator, EncoderParams, StatsSample};
pub use relay_event::{JoinAccepted, LeaveReason, RelayEvent};
pub use signaling::{
    IceCandidate, IceServerConfig, JoinRequest, SdpType, SessionDescription, SignalAction,
    SignalCommand, SignalEnvelope, SignalPayload,
};
pub use transfer::{FileAck, FileChunk, FileId, FileOffer, FileReject, TransferStatus};
pub use whiteboard::{Point, WhiteboardMessage, WhiteboardOp};
