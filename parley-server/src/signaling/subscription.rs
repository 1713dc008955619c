use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use dashmap::DashMap;
use futures::Stream;
use parley_core::{PeerId, RelayEvent, RoomId};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll, ready};
use tokio::sync::{mpsc, oneshot};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// A peer's push channel is keyed by room and peer.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct SessionKey {
    pub room_id: RoomId,
    pub peer_id: PeerId,
}

impl SessionKey {
    pub fn new(room_id: RoomId, peer_id: PeerId) -> Self {
        Self { room_id, peer_id }
    }
}

/// Sent when a subscription stream is dropped by its transport.
#[derive(Debug, Clone)]
pub struct ClosedSubscription {
    pub key: SessionKey,
    pub generation: u64,
}

struct Subscriber {
    /// `None` once the subscriber overflowed; its stream ends after the
    /// queued events and the client has to subscribe again.
    tx: Option<mpsc::Sender<RelayEvent>>,
    /// Reserved slot for `peer-replaced`, delivered after the queued events
    /// even when the buffer is full.
    terminal: Option<oneshot::Sender<RelayEvent>>,
    generation: u64,
}

/// Live push channels, one per `(room, peer)`.
pub struct SubscriptionHub {
    subscribers: DashMap<SessionKey, Subscriber>,
    next_generation: AtomicU64,
    buffer: usize,
    closed_tx: mpsc::UnboundedSender<ClosedSubscription>,
}

impl SubscriptionHub {
    pub fn new(buffer: usize, closed_tx: mpsc::UnboundedSender<ClosedSubscription>) -> Self {
        Self {
            subscribers: DashMap::new(),
            next_generation: AtomicU64::new(1),
            buffer: buffer.max(1),
            closed_tx,
        }
    }

    /// Opens a push channel. A previous channel for the same key is closed.
    pub fn subscribe(&self, key: SessionKey) -> Subscription {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);
        let (terminal, terminal_rx) = oneshot::channel();
        let subscriber = Subscriber {
            tx: Some(tx),
            terminal: Some(terminal),
            generation,
        };

        if self.subscribers.insert(key.clone(), subscriber).is_some()
        {
            debug!(room = %key.room_id, peer = %key.peer_id, "Superseding previous subscription");
        }

        Subscription {
            key,
            generation,
            rx,
            terminal: Some(terminal_rx),
            closed_tx: self.closed_tx.clone(),
        }
    }

    /// True while `key` has a push channel that still accepts events.
    pub fn is_subscribed(&self, key: &SessionKey) -> bool {
        self.subscribers
            .get(key)
            .is_some_and(|sub| sub.tx.is_some())
    }

    pub fn unsubscribe(&self, key: &SessionKey) {
        self.subscribers.remove(key);
    }

    /// Removes the entry only if it still belongs to `generation`.
    pub fn remove_generation(&self, key: &SessionKey, generation: u64) -> bool {
        self.subscribers
            .remove_if(key, |_, sub| sub.generation == generation)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

#[async_trait]
impl SignalingOutput for SubscriptionHub {
    async fn deliver(&self, room_id: &RoomId, peer_id: &PeerId, event: RelayEvent) -> bool {
        let key = SessionKey::new(room_id.clone(), peer_id.clone());

        // An evicted peer gets its notice, then its channel is closed.
        if matches!(event, RelayEvent::PeerReplaced { .. }) {
            let Some((_, sub)) = self.subscribers.remove(&key) else {
                warn!("Attempted to push {} to unsubscribed peer {}", event.name(), peer_id);
                return false;
            };
            return sub
                .terminal
                .is_some_and(|terminal| terminal.send(event).is_ok());
        }

        let Some(tx) = self.subscribers.get(&key).and_then(|sub| sub.tx.clone()) else {
            warn!("Attempted to push {} to unsubscribed peer {}", event.name(), peer_id);
            return false;
        };

        match tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!(
                    "Push buffer full for {}, closing its channel after dropping {}",
                    peer_id,
                    event.name()
                );
                if let Some(mut sub) = self.subscribers.get_mut(&key) {
                    sub.tx = None;
                    sub.terminal = None;
                }
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Receiving end of a push channel. Dropping it reports the closure so the
/// relay can schedule the peer's removal.
pub struct Subscription {
    key: SessionKey,
    generation: u64,
    rx: mpsc::Receiver<RelayEvent>,
    terminal: Option<oneshot::Receiver<RelayEvent>>,
    closed_tx: mpsc::UnboundedSender<ClosedSubscription>,
}

impl Subscription {
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub async fn recv(&mut self) -> Option<RelayEvent> {
        std::future::poll_fn(|cx| self.poll_event(cx)).await
    }

    /// Queued events first; the terminal notice once the queue is closed.
    fn poll_event(&mut self, cx: &mut Context<'_>) -> Poll<Option<RelayEvent>> {
        if let Some(event) = ready!(self.rx.poll_recv(cx)) {
            return Poll::Ready(Some(event));
        }
        let Some(terminal) = self.terminal.as_mut() else {
            return Poll::Ready(None);
        };
        let event = ready!(Pin::new(terminal).poll(cx)).ok();
        self.terminal = None;
        Poll::Ready(event)
    }
}

impl Stream for Subscription {
    type Item = RelayEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.poll_event(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.closed_tx.send(ClosedSubscription {
            key: self.key.clone(),
            generation: self.generation,
        });
    }
}
