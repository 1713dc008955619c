use crate::error::MediaError;
use crate::media::MediaTrack;
use crate::screen_share::{CaptureConstraints, QualityDecision, QualityPolicy, QualityState};
use crate::transport::{MediaSender, StatsSource};
use parley_core::EncoderParams;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShareState {
    Idle,
    Sharing(QualityState),
}

impl ShareState {
    pub fn is_sharing(&self) -> bool {
        matches!(self, Self::Sharing(_))
    }

    pub fn quality(&self) -> Option<&QualityState> {
        match self {
            Self::Sharing(quality) => Some(quality),
            Self::Idle => None,
        }
    }
}

/// Drives the encoder of the outbound video sender while a screen is shared.
pub struct ScreenShareController {
    policy: QualityPolicy,
    constraints: CaptureConstraints,
    sender: Arc<dyn MediaSender>,
    stats: Arc<dyn StatsSource>,
    quality: Option<QualityState>,
    state_tx: watch::Sender<ShareState>,
}

impl ScreenShareController {
    pub fn new(
        policy: QualityPolicy,
        constraints: CaptureConstraints,
        sender: Arc<dyn MediaSender>,
        stats: Arc<dyn StatsSource>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ShareState::Idle);
        Self {
            policy,
            constraints,
            sender,
            stats,
            quality: None,
            state_tx,
        }
    }

    pub fn state(&self) -> watch::Receiver<ShareState> {
        self.state_tx.subscribe()
    }

    pub fn is_sharing(&self) -> bool {
        self.quality.is_some()
    }

    fn publish(&self) {
        let state = match self.quality {
            Some(quality) => ShareState::Sharing(quality),
            None => ShareState::Idle,
        };
        self.state_tx.send_replace(state);
    }

    /// Puts `screen` on the sender. The encoding is set first so no frame
    /// is ever encoded above the capture envelope.
    pub async fn start(&mut self, screen: MediaTrack) -> Result<EncoderParams, MediaError> {
        let floor_scale = match (screen.width, screen.height) {
            (Some(w), Some(h)) => self.constraints.initial_scale(w, h),
            _ => 1.0,
        };
        if floor_scale > 1.0 {
            info!(
                width = ?screen.width,
                height = ?screen.height,
                scale = floor_scale,
                "Screen source above capture ceiling, downscaling"
            );
        }

        let quality = QualityState::new(&self.policy, floor_scale);
        let params = quality.params();
        self.sender.set_encoding(Some(params)).await?;
        self.sender.replace_track(Some(screen)).await?;

        self.quality = Some(quality);
        self.publish();
        info!(bitrate = params.max_bitrate_kbps, "Screen share started");
        Ok(params)
    }

    /// Reads one stats sample and moves at most one ladder step.
    pub async fn on_sample(&mut self) -> Result<QualityDecision, MediaError> {
        let Some(quality) = self.quality.as_mut() else {
            return Ok(QualityDecision::Hold);
        };
        let Some(sample) = self.stats.sample().await else {
            debug!("No outbound stats yet");
            return Ok(QualityDecision::Hold);
        };

        let decision = quality.evaluate(&self.policy, &sample);
        if decision != QualityDecision::Hold {
            let params = quality.params();
            info!(
                ?decision,
                level = quality.level(),
                bitrate = params.max_bitrate_kbps,
                scale = params.scale_resolution_down_by,
                loss = sample.packet_loss_pct,
                rtt = sample.rtt_ms,
                "Screen share quality step"
            );
            self.sender.set_encoding(Some(params)).await?;
        }
        self.publish();
        Ok(decision)
    }

    /// Puts `camera` back on the sender.
    pub async fn stop(&mut self, camera: Option<MediaTrack>) -> Result<(), MediaError> {
        if self.quality.take().is_none() {
            return Ok(());
        }
        self.publish();
        self.sender.replace_track(camera).await?;
        self.sender.set_encoding(None).await?;
        info!("Screen share stopped");
        Ok(())
    }

    /// Starts sharing and samples on the policy's cadence until the screen
    /// track ends or the handle stops it; either way the sender goes back to
    /// whatever `camera` holds at that moment.
    pub async fn spawn(
        mut self,
        screen: MediaTrack,
        camera: watch::Receiver<Option<MediaTrack>>,
        track_ended: oneshot::Receiver<()>,
    ) -> Result<ScreenShareHandle, MediaError> {
        self.start(screen).await?;

        let state = self.state();
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(camera, track_ended, stop_rx));

        Ok(ScreenShareHandle {
            stop_tx: Some(stop_tx),
            state,
            task,
        })
    }

    async fn run(
        mut self,
        camera: watch::Receiver<Option<MediaTrack>>,
        mut track_ended: oneshot::Receiver<()>,
        mut stop_rx: oneshot::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(self.policy.sample_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.on_sample().await {
                        warn!("Applying screen share encoding failed: {}", e);
                    }
                }
                Ok(()) = &mut track_ended => {
                    info!("Screen track ended, reverting to camera");
                    break;
                }
                _ = &mut stop_rx => break,
            }
        }

        let camera = camera.borrow().clone();
        if let Err(e) = self.stop(camera).await {
            warn!("Reverting to camera failed: {}", e);
        }
    }
}

pub struct ScreenShareHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    state: watch::Receiver<ShareState>,
    task: JoinHandle<()>,
}

impl ScreenShareHandle {
    pub fn state(&self) -> watch::Receiver<ShareState> {
        self.state.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops sharing and waits until the camera is back on the sender.
    pub async fn stop(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!("Screen share task failed: {}", e);
        }
    }
}
