use crate::error::NegotiationError;
use crate::negotiation::{Deferred, Negotiator};
use crate::transport::SignalingState;
use parley_core::SessionDescription;
use tracing::{debug, info};

impl Negotiator {
    /// Creates and applies a local offer. Returns `None` when the request was
    /// deferred because another exchange is in flight; it is replayed by
    /// [`Negotiator::take_deferred`] once the connection is stable again.
    pub async fn on_negotiation_needed(
        &mut self,
        ice_restart: bool,
    ) -> Result<Option<SessionDescription>, NegotiationError> {
        if self.state.making_offer || self.transport.signaling_state() != SignalingState::Stable {
            debug!(
                peer = %self.remote,
                making_offer = self.state.making_offer,
                "Deferring negotiation"
            );
            let restart = self.state.deferred.is_some_and(|d| d.ice_restart) || ice_restart;
            self.state.deferred = Some(Deferred {
                ice_restart: restart,
            });
            return Ok(None);
        }

        self.state.making_offer = true;
        let result = self.make_offer(ice_restart).await;
        self.state.making_offer = false;

        let offer = result?;
        info!(peer = %self.remote, ice_restart, "Local offer applied");
        Ok(Some(offer))
    }

    async fn make_offer(&self, ice_restart: bool) -> Result<SessionDescription, NegotiationError> {
        let offer = self.transport.create_offer(ice_restart).await?;
        self.transport.set_local_description(offer.clone()).await?;
        Ok(offer)
    }

    /// The deferred negotiation request, once nothing blocks it any more.
    pub fn take_deferred(&mut self) -> Option<Deferred> {
        if self.state.making_offer || self.transport.signaling_state() != SignalingState::Stable {
            return None;
        }
        self.state.deferred.take()
    }

    /// Manual ICE restart. Always allowed; deferred like any other offer
    /// while an exchange is in flight.
    pub async fn restart_ice(&mut self) -> Result<Option<SessionDescription>, NegotiationError> {
        self.on_negotiation_needed(true).await
    }
}
