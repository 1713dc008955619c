use crate::error::NegotiationError;
use crate::negotiation::Negotiator;
use crate::transport::SignalingState;
use parley_core::{SdpType, SessionDescription, WireError};
use tracing::{debug, info, warn};

impl Negotiator {
    /// Applies a remote offer or answer. Returns the local answer to send
    /// back when the description was an offer.
    pub async fn on_remote_description(
        &mut self,
        desc: SessionDescription,
    ) -> Result<Option<SessionDescription>, NegotiationError> {
        match desc.kind {
            SdpType::Offer | SdpType::Answer => desc.validate(desc.kind)?,
            other => {
                return Err(WireError::MalformedDescription(format!(
                    "unexpected remote description type {:?}",
                    other
                ))
                .into());
            }
        }

        let signaling_state = self.transport.signaling_state();
        let ready_for_offer = !self.state.making_offer
            && (signaling_state == SignalingState::Stable
                || self.state.is_setting_remote_answer_pending);
        let offer_collision = desc.kind == SdpType::Offer && !ready_for_offer;

        self.state.ignore_offer = !self.is_polite() && offer_collision;
        if self.state.ignore_offer {
            info!(peer = %self.remote, "Ignoring colliding offer (impolite)");
            return Ok(None);
        }

        if desc.kind == SdpType::Answer && signaling_state != SignalingState::HaveLocalOffer {
            warn!(peer = %self.remote, ?signaling_state, "Dropping stale answer");
            return Ok(None);
        }

        if offer_collision {
            info!(peer = %self.remote, "Offer collision, rolling back local offer (polite)");
            self.transport.rollback().await?;
        }

        self.state.is_setting_remote_answer_pending = desc.kind == SdpType::Answer;
        let kind = desc.kind;
        let applied = self.transport.set_remote_description(desc).await;
        self.state.is_setting_remote_answer_pending = false;
        applied?;
        debug!(peer = %self.remote, ?kind, "Remote description applied");

        self.flush_candidates().await;

        if kind != SdpType::Offer {
            return Ok(None);
        }

        let answer = self.transport.create_answer().await?;
        self.transport.set_local_description(answer.clone()).await?;
        info!(peer = %self.remote, "Local answer applied");
        Ok(Some(answer))
    }
}
