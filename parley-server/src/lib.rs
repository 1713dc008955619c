mod config;
mod error;
mod room;
mod signaling;

pub use config::{ConfigError, RelayConfig};
pub use error::RelayError;
pub use room::*;
pub use signaling::*;
