pub mod background;
pub mod call;
pub mod config;
pub mod control;
pub mod error;
pub mod indicator;
pub mod media;
pub mod negotiation;
pub mod screen_share;
pub mod session;
pub mod transport;

pub use call::{CallDeps, CallEngine, CallEvent, CallHandle, CallParams};
pub use config::ClientConfig;
pub use error::{
    CallError, ControlError, MediaError, NegotiationError, TransferError, TransportError,
};
