use crate::negotiation::Negotiator;
use parley_core::IceCandidate;
use tracing::{debug, warn};

impl Negotiator {
    /// Adds a remote candidate, or buffers it until a remote description
    /// exists. Failures are logged and never fatal.
    pub async fn on_remote_candidate(&mut self, candidate: IceCandidate) {
        if !self.transport.has_remote_description().await {
            debug!(peer = %self.remote, "Buffering early ICE candidate");
            self.pending_candidates.push(candidate);
            return;
        }
        self.add_candidate(candidate).await;
    }

    pub(super) async fn flush_candidates(&mut self) {
        if self.pending_candidates.is_empty() {
            return;
        }
        debug!(
            peer = %self.remote,
            count = self.pending_candidates.len(),
            "Flushing buffered ICE candidates"
        );
        for candidate in std::mem::take(&mut self.pending_candidates) {
            self.add_candidate(candidate).await;
        }
    }

    async fn add_candidate(&self, candidate: IceCandidate) {
        if let Err(e) = self.transport.add_ice_candidate(candidate).await {
            // Candidates of an ignored offer are expected to fail.
            if !self.state.ignore_offer {
                warn!(peer = %self.remote, "Failed to add ICE candidate: {}", e);
            }
        }
    }
}
