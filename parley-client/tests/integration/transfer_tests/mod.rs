mod test_backpressure;
mod test_exchange;

use parley_client::config::TransferConfig;
use parley_client::control::{ControlMux, TransferEvent, TransferManager};
use parley_core::ControlMessage;
use std::sync::Arc;

use crate::utils::MockChannel;

/// One side of a transfer: manager, mux and the channel it writes to.
pub struct Side {
    pub transfers: TransferManager,
    pub mux: ControlMux,
    pub channel: Arc<MockChannel>,
    /// Frames of `channel` already delivered to the other side.
    pub cursor: usize,
}

impl Side {
    pub async fn open(config: TransferConfig, channel: Arc<MockChannel>) -> Self {
        let mut mux = ControlMux::new();
        mux.on_open(channel.clone()).await.unwrap();
        let transfers = TransferManager::new(config);
        transfers.on_channel_open(&mux).await;
        let cursor = channel.sent().len();
        Self {
            transfers,
            mux,
            channel,
            cursor,
        }
    }

    /// File frames written since the last call.
    pub fn take_file_frames(&mut self) -> Vec<ControlMessage> {
        let frames = self.channel.frames_from(self.cursor);
        self.cursor += frames.len();
        frames
            .into_iter()
            .filter(|msg| msg.tag().starts_with("file-"))
            .collect()
    }

    pub async fn receive(&mut self, frames: Vec<ControlMessage>) -> Vec<TransferEvent> {
        let mut events = Vec::new();
        for frame in frames {
            events.extend(self.transfers.on_message(&self.mux, frame).await.unwrap());
        }
        events
    }
}

pub fn small_config() -> TransferConfig {
    TransferConfig {
        chunk_size: 1000,
        high_water_mark: 5000,
        low_water_mark: 1000,
        ..TransferConfig::default()
    }
}

pub fn payload(len: usize) -> bytes::Bytes {
    (0..len).map(|i| (i % 251) as u8).collect::<Vec<u8>>().into()
}
