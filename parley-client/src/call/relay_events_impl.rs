use crate::call::{CallEngine, CallEvent};
use crate::session::SessionCommand;
use parley_core::{PeerId, RelayEvent};
use std::ops::ControlFlow;
use tracing::{debug, info, warn};

impl CallEngine {
    pub(super) async fn on_relay_event(&mut self, event: RelayEvent) -> ControlFlow<()> {
        match event {
            RelayEvent::PeerJoined { peer } => {
                if peer.peer_id == self.local {
                    return ControlFlow::Continue(());
                }
                info!(peer = %peer.peer_id, name = %peer.display_name, "Peer joined");
                // A rejoining peer starts from scratch.
                if self.sessions.contains_key(&peer.peer_id) {
                    self.close_session(&peer.peer_id).await;
                }
                let remote = peer.peer_id.clone();
                self.emit(CallEvent::PeerJoined(peer));
                self.open_session(remote, false).await;
            }
            RelayEvent::Offer { from, description } => {
                if !self.sessions.contains_key(&from) {
                    debug!(peer = %from, "Offer before peer-joined, opening session");
                    self.open_session(from.clone(), false).await;
                }
                self.forward(&from, SessionCommand::RemoteDescription(description))
                    .await;
            }
            RelayEvent::Answer { from, description } => {
                self.forward(&from, SessionCommand::RemoteDescription(description))
                    .await;
            }
            RelayEvent::IceCandidate { from, candidate } => {
                self.forward(&from, SessionCommand::RemoteCandidate(candidate))
                    .await;
            }
            RelayEvent::PeerReplaced { replaced_by, .. } => {
                warn!(peer = %self.local, by = %replaced_by, "Logged in elsewhere, leaving call");
                self.teardown().await;
                self.emit(CallEvent::LoggedInElsewhere { replaced_by });
                return ControlFlow::Break(());
            }
            RelayEvent::PeerLeft { peer_id, reason } => {
                info!(peer = %peer_id, ?reason, "Peer left");
                self.close_session(&peer_id).await;
                self.emit(CallEvent::PeerLeft { peer_id, reason });
            }
        }
        ControlFlow::Continue(())
    }

    async fn forward(&self, from: &PeerId, cmd: SessionCommand) {
        let Some(session) = self.sessions.get(from) else {
            debug!(peer = %from, "Signal for unknown peer dropped");
            return;
        };
        if let Err(e) = session.send(cmd).await {
            warn!(peer = %from, "Signal not forwarded: {}", e);
        }
    }
}
