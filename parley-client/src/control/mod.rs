mod control_mux;
mod transfer;
mod whiteboard;

pub use control_mux::*;
pub use transfer::*;
pub use whiteboard::*;

use parley_core::{ChatMessage, DeviceState, VbgSettings, WhiteboardMessage};

/// What arrived on (or happened to) the control channel of one peer.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    Opened,
    Chat(ChatMessage),
    DeviceState(DeviceState),
    Whiteboard(WhiteboardMessage),
    Background(VbgSettings),
    Transfer(TransferEvent),
}
