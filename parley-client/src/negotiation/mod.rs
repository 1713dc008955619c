use crate::transport::PeerTransport;
use parley_core::{IceCandidate, PeerId, Politeness, politeness};
use std::sync::Arc;

mod handle_candidate_impl;
mod handle_description_impl;
mod negotiation_needed_impl;

/// Perfect-negotiation flags of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiationState {
    pub politeness: Politeness,
    pub making_offer: bool,
    pub ignore_offer: bool,
    pub is_setting_remote_answer_pending: bool,
    /// A negotiation request arrived while the connection was busy.
    pub deferred: Option<Deferred>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deferred {
    pub ice_restart: bool,
}

/// Drives the offer/answer exchange of one peer connection. Both peers run
/// the same code; the role decides who yields on a collision.
pub struct Negotiator {
    local: PeerId,
    remote: PeerId,
    state: NegotiationState,
    transport: Arc<dyn PeerTransport>,
    /// Remote candidates received before any remote description.
    pending_candidates: Vec<IceCandidate>,
}

impl Negotiator {
    pub fn new(local: PeerId, remote: PeerId, transport: Arc<dyn PeerTransport>) -> Self {
        let role = politeness(&local, &remote);
        Self {
            local,
            remote,
            state: NegotiationState {
                politeness: role,
                making_offer: false,
                ignore_offer: false,
                is_setting_remote_answer_pending: false,
                deferred: None,
            },
            transport,
            pending_candidates: Vec::new(),
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn is_polite(&self) -> bool {
        self.state.politeness.is_polite()
    }

    pub fn remote(&self) -> &PeerId {
        &self.remote
    }

    pub fn local(&self) -> &PeerId {
        &self.local
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending_candidates.len()
    }
}
