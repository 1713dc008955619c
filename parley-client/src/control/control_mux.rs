use crate::error::ControlError;
use crate::transport::ControlChannel;
use parley_core::{ControlMessage, DeviceState, VbgSettings};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

/// Multiplexes all control traffic of one peer over a single ordered
/// channel. Chat and whiteboard frames wait for the channel; device state
/// and background settings are re-sent whenever it opens.
#[derive(Default)]
pub struct ControlMux {
    channel: Option<Arc<dyn ControlChannel>>,
    queue: VecDeque<ControlMessage>,
    device_state: Option<DeviceState>,
    background: VbgSettings,
    background_sent: bool,
}

impl ControlMux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mux for a channel that is not open yet; both values go out on open.
    pub fn with_state(device_state: DeviceState, background: VbgSettings) -> Self {
        Self {
            device_state: Some(device_state),
            background,
            ..Self::default()
        }
    }

    pub fn is_open(&self) -> bool {
        self.channel.as_ref().is_some_and(|ch| ch.is_open())
    }

    pub fn channel(&self) -> Option<&Arc<dyn ControlChannel>> {
        self.channel.as_ref().filter(|ch| ch.is_open())
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn decode(text: &str) -> Result<ControlMessage, ControlError> {
        Ok(ControlMessage::decode(text)?)
    }

    /// Publishes the current state, then flushes the queue in order.
    pub async fn on_open(&mut self, channel: Arc<dyn ControlChannel>) -> Result<(), ControlError> {
        info!(label = channel.label(), queued = self.queue.len(), "Control channel open");
        self.channel = Some(channel);

        if let Some(state) = self.device_state {
            self.send(&ControlMessage::DeviceState(state)).await?;
        }
        self.send(&ControlMessage::VbgSettings(self.background.clone()))
            .await?;
        self.background_sent = true;

        while let Some(msg) = self.queue.pop_front() {
            if let Err(e) = self.send(&msg).await {
                self.queue.push_front(msg);
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn on_closed(&mut self) {
        if self.channel.take().is_some() {
            debug!("Control channel closed");
        }
        self.background_sent = false;
    }

    /// Sends now, or queues until the channel opens.
    pub async fn send_or_queue(&mut self, msg: ControlMessage) -> Result<(), ControlError> {
        if !self.is_open() {
            debug!(tag = msg.tag(), "Queueing control message until open");
            self.queue.push_back(msg);
            return Ok(());
        }
        self.send(&msg).await
    }

    pub async fn set_device_state(&mut self, state: DeviceState) -> Result<(), ControlError> {
        self.device_state = Some(state);
        if self.is_open() {
            self.send(&ControlMessage::DeviceState(state)).await?;
        }
        Ok(())
    }

    /// Returns `false` when `settings` were already published.
    pub async fn set_background(&mut self, settings: VbgSettings) -> Result<bool, ControlError> {
        if settings == self.background && (self.background_sent || !self.is_open()) {
            return Ok(false);
        }
        self.background = settings;
        if self.is_open() {
            self.send(&ControlMessage::VbgSettings(self.background.clone()))
                .await?;
            self.background_sent = true;
        }
        Ok(true)
    }

    /// Sends immediately; fails when the channel is not open.
    pub async fn send(&self, msg: &ControlMessage) -> Result<(), ControlError> {
        let channel = self.channel().ok_or(ControlError::NotOpen)?;
        channel.send_text(msg.encode()?).await?;
        Ok(())
    }
}
