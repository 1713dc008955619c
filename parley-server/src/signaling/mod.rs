mod command_handler;
mod credential;
mod router;
mod signaling_output;
mod signaling_service;
mod sse_handler;
mod subscription;
mod ws_handler;

pub use command_handler::*;
pub use credential::*;
pub use router::*;
pub use signaling_output::*;
pub use signaling_service::*;
pub use sse_handler::*;
pub use subscription::*;
pub use ws_handler::*;
