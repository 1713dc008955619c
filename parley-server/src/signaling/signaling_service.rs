use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::room::RoomManager;
use crate::signaling::{
    AcceptBearer, ClosedSubscription, CredentialCheck, SessionKey, Subscription, SubscriptionHub,
};
use chrono::Utc;
use parley_core::{
    IceServerConfig, JoinAccepted, LeaveReason, PeerInfo, SignalEnvelope, SignalPayload,
};
use serde::Serialize;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const DEFAULT_DISPLAY_NAME: &str = "Guest";

/// Response body of an accepted command.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum CommandReply {
    Joined(JoinAccepted),
    Relayed { ok: bool, delivered: usize },
    Left { ok: bool },
}

struct SignalingInner {
    hub: Arc<SubscriptionHub>,
    rooms: RoomManager,
    credentials: Arc<dyn CredentialCheck>,
    config: RelayConfig,
}

/// Front door of the relay, shared by the HTTP, SSE and WebSocket handlers.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl SignalingService {
    /// Must be called from within a tokio runtime.
    pub fn new(config: RelayConfig) -> Self {
        Self::with_credentials(config, Arc::new(AcceptBearer))
    }

    pub fn with_credentials(config: RelayConfig, credentials: Arc<dyn CredentialCheck>) -> Self {
        let (closed_tx, closed_rx) = mpsc::unbounded_channel();
        let hub = Arc::new(SubscriptionHub::new(config.push_buffer, closed_tx));
        let rooms = RoomManager::new(hub.clone(), config.clone());

        let inner = Arc::new(SignalingInner {
            hub,
            rooms,
            credentials,
            config,
        });
        tokio::spawn(reap_closed_subscriptions(Arc::downgrade(&inner), closed_rx));

        Self { inner }
    }

    pub fn rooms(&self) -> &RoomManager {
        &self.inner.rooms
    }

    pub fn ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.config.ice_servers.clone()
    }

    /// Opens the push channel of `key` after checking the bearer token.
    pub fn subscribe(
        &self,
        key: SessionKey,
        token: Option<&str>,
    ) -> Result<Subscription, RelayError> {
        let token = token.ok_or(RelayError::Unauthorized)?;
        if !self
            .inner
            .credentials
            .authorize(&key.room_id, &key.peer_id, token)
        {
            warn!(room = %key.room_id, peer = %key.peer_id, "Subscription refused");
            return Err(RelayError::Unauthorized);
        }

        info!(room = %key.room_id, peer = %key.peer_id, "Push channel opened");
        Ok(self.inner.hub.subscribe(key))
    }

    pub fn is_subscribed(&self, key: &SessionKey) -> bool {
        self.inner.hub.is_subscribed(key)
    }

    /// Applies one validated command.
    pub async fn handle(&self, envelope: SignalEnvelope) -> Result<CommandReply, RelayError> {
        let key = SessionKey::new(envelope.room_id.clone(), envelope.sender.clone());

        match &envelope.payload {
            SignalPayload::Join(join) => {
                if !self.inner.hub.is_subscribed(&key) {
                    return Err(RelayError::NotSubscribed(key.peer_id));
                }

                let display_name = if join.display_name.trim().is_empty() {
                    DEFAULT_DISPLAY_NAME.to_owned()
                } else {
                    join.display_name.clone()
                };
                let peer = PeerInfo {
                    peer_id: key.peer_id.clone(),
                    user_id: join.user_id.clone(),
                    display_name,
                    role: join.role,
                    joined_at: Utc::now(),
                };

                let accepted = self.inner.rooms.join(&key.room_id, peer).await?;
                Ok(CommandReply::Joined(accepted))
            }
            SignalPayload::Leave => {
                let result = self
                    .inner
                    .rooms
                    .leave(&key.room_id, &key.peer_id, LeaveReason::Left)
                    .await;
                self.inner.hub.unsubscribe(&key);
                result?;
                Ok(CommandReply::Left { ok: true })
            }
            _ => {
                let delivered = self.inner.rooms.publish(envelope).await?;
                Ok(CommandReply::Relayed {
                    ok: true,
                    delivered,
                })
            }
        }
    }
}

/// Turns dropped push channels into leaves once the grace period passes
/// without the peer subscribing again.
async fn reap_closed_subscriptions(
    inner: Weak<SignalingInner>,
    mut closed_rx: mpsc::UnboundedReceiver<ClosedSubscription>,
) {
    while let Some(closed) = closed_rx.recv().await {
        let Some(strong) = inner.upgrade() else {
            break;
        };

        if !strong.hub.remove_generation(&closed.key, closed.generation) {
            // Superseded by a newer subscription or closed by an explicit leave.
            continue;
        }

        let grace = strong.config.disconnect_grace();
        debug!(
            room = %closed.key.room_id,
            peer = %closed.key.peer_id,
            ?grace,
            "Push channel dropped, starting grace period"
        );

        let inner = inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let Some(strong) = inner.upgrade() else {
                return;
            };
            if strong.hub.is_subscribed(&closed.key) {
                debug!(peer = %closed.key.peer_id, "Peer resubscribed within grace period");
                return;
            }

            match strong
                .rooms
                .leave(
                    &closed.key.room_id,
                    &closed.key.peer_id,
                    LeaveReason::Disconnected,
                )
                .await
            {
                Ok(()) => info!(
                    room = %closed.key.room_id,
                    peer = %closed.key.peer_id,
                    "Removed disconnected peer"
                ),
                Err(e) => debug!(peer = %closed.key.peer_id, "No removal needed: {}", e),
            }
        });
    }
}
