use crate::error::TransportError;
use crate::media::MediaTrack;
use crate::transport::{MediaSender, PeerTransport, StatsSource};
use async_trait::async_trait;
use dashmap::DashMap;
use parley_core::{EncoderParams, PeerId, StatsSample};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// One logical outbound track fanned out to every peer's sender. A sender
/// added later picks up the current encoding.
#[derive(Default)]
pub struct FanoutSender {
    senders: DashMap<PeerId, Arc<dyn MediaSender>>,
    current: Mutex<Option<MediaTrack>>,
    encoding: Mutex<Option<EncoderParams>>,
}

impl FanoutSender {
    pub fn new(initial: Option<MediaTrack>) -> Self {
        Self {
            senders: DashMap::new(),
            current: Mutex::new(initial),
            encoding: Mutex::new(None),
        }
    }

    pub async fn current(&self) -> Option<MediaTrack> {
        self.current.lock().await.clone()
    }

    pub async fn add(&self, peer: PeerId, sender: Arc<dyn MediaSender>) {
        let encoding = *self.encoding.lock().await;
        if encoding.is_some() {
            if let Err(e) = sender.set_encoding(encoding).await {
                warn!(peer = %peer, "Applying encoding to new sender failed: {}", e);
            }
        }
        self.senders.insert(peer, sender);
    }

    pub fn remove(&self, peer: &PeerId) {
        self.senders.remove(peer);
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    fn snapshot(&self) -> Vec<(PeerId, Arc<dyn MediaSender>)> {
        self.senders
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

#[async_trait]
impl MediaSender for FanoutSender {
    async fn replace_track(&self, track: Option<MediaTrack>) -> Result<(), TransportError> {
        *self.current.lock().await = track.clone();
        for (peer, sender) in self.snapshot() {
            if let Err(e) = sender.replace_track(track.clone()).await {
                warn!(peer = %peer, "Replacing track failed: {}", e);
            }
        }
        Ok(())
    }

    async fn set_encoding(&self, params: Option<EncoderParams>) -> Result<(), TransportError> {
        *self.encoding.lock().await = params;
        for (peer, sender) in self.snapshot() {
            if let Err(e) = sender.set_encoding(params).await {
                warn!(peer = %peer, "Setting encoding failed: {}", e);
            }
        }
        Ok(())
    }
}

/// Worst outbound statistics across all peer connections, so quality
/// follows the weakest link.
#[derive(Default)]
pub struct WorstStats {
    transports: DashMap<PeerId, Arc<dyn PeerTransport>>,
}

impl WorstStats {
    pub fn add(&self, peer: PeerId, transport: Arc<dyn PeerTransport>) {
        self.transports.insert(peer, transport);
    }

    pub fn remove(&self, peer: &PeerId) {
        self.transports.remove(peer);
    }
}

#[async_trait]
impl StatsSource for WorstStats {
    async fn sample(&self) -> Option<StatsSample> {
        let transports: Vec<_> = self
            .transports
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut worst: Option<StatsSample> = None;
        for transport in transports {
            let Some(sample) = transport.stats().await else {
                continue;
            };
            worst = Some(match worst {
                None => sample,
                Some(w) => StatsSample {
                    packet_loss_pct: w.packet_loss_pct.max(sample.packet_loss_pct),
                    rtt_ms: w.rtt_ms.max(sample.rtt_ms),
                },
            });
        }
        worst
    }
}
