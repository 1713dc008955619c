use crate::session::{PeerSession, SessionCommand};
use parley_core::{ControlMessage, SignalPayload};
use std::ops::ControlFlow;
use tracing::{info, warn};

impl PeerSession {
    pub(super) async fn on_command(&mut self, cmd: SessionCommand) -> ControlFlow<()> {
        match cmd {
            SessionCommand::RemoteDescription(desc) => {
                match self.negotiator.on_remote_description(desc).await {
                    Ok(Some(answer)) => self.send_signal(SignalPayload::Answer(answer)).await,
                    Ok(None) => {}
                    Err(e) => return self.abandon(e),
                }
            }
            SessionCommand::RemoteCandidate(candidate) => {
                self.negotiator.on_remote_candidate(candidate).await;
            }
            SessionCommand::Chat(chat) => {
                if let Err(e) = self.mux.send_or_queue(ControlMessage::Chat(chat)).await {
                    warn!(peer = %self.remote, "Chat not sent: {}", e);
                }
            }
            SessionCommand::Whiteboard(wb) => {
                if let Err(e) = self.mux.send_or_queue(ControlMessage::Whiteboard(wb)).await {
                    warn!(peer = %self.remote, "Whiteboard op not sent: {}", e);
                }
            }
            SessionCommand::DeviceState(state) => {
                if let Err(e) = self.mux.set_device_state(state).await {
                    warn!(peer = %self.remote, "Device state not sent: {}", e);
                }
            }
            SessionCommand::Background(settings) => {
                if let Err(e) = self.mux.set_background(settings).await {
                    warn!(peer = %self.remote, "Background settings not sent: {}", e);
                }
            }
            SessionCommand::SendFile {
                name,
                mime_type,
                data,
                reply,
            } => {
                let result = self.transfers.offer(&self.mux, name, mime_type, data).await;
                let _ = reply.send(result);
            }
            SessionCommand::AcceptFile(file_id) => {
                if let Err(e) = self.transfers.accept(&self.mux, &file_id).await {
                    warn!(peer = %self.remote, file = %file_id, "Accept failed: {}", e);
                }
            }
            SessionCommand::RejectFile { file_id, reason } => {
                if let Err(e) = self.transfers.reject(&self.mux, &file_id, &reason).await {
                    warn!(peer = %self.remote, file = %file_id, "Reject failed: {}", e);
                }
            }
            SessionCommand::CancelFile(file_id) => {
                match self.transfers.cancel(&self.mux, &file_id).await {
                    Ok(event) => self.emit_transfers(vec![event]),
                    Err(e) => warn!(peer = %self.remote, file = %file_id, "Cancel failed: {}", e),
                }
            }
            SessionCommand::RestartIce => {
                info!(peer = %self.remote, "ICE restart requested");
                return self.negotiate(true).await;
            }
            SessionCommand::Close => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }
}
