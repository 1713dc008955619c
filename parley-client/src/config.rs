use parley_core::{IceServerConfig, MAX_CHUNK_SIZE};
use parley_core::utils::{DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::TransferError;
use crate::screen_share::{CaptureConstraints, QualityPolicy};

/// Recovery budget of one peer connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NegotiationConfig {
    /// How long a `disconnected` connection may take to come back on its own
    /// before an ICE restart is attempted.
    pub reconciliation_window_ms: u64,
    /// Automatic ICE restarts per connection attempt.
    pub max_ice_restarts: u32,
}

impl NegotiationConfig {
    pub fn reconciliation_window(&self) -> Duration {
        Duration::from_millis(self.reconciliation_window_ms)
    }
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            reconciliation_window_ms: 8_000,
            max_ice_restarts: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransferConfig {
    pub chunk_size: u32,
    /// Sending pauses while the channel buffer would exceed this.
    pub high_water_mark: usize,
    /// Sending resumes once the buffer drains below this.
    pub low_water_mark: usize,
    pub accept_timeout_ms: u64,
    /// Longest silence tolerated on an accepted transfer.
    pub idle_timeout_ms: u64,
    pub max_incoming_file_bytes: u64,
}

/// Room for the JSON around a chunk's base64 bytes.
const CHUNK_FRAME_OVERHEAD: usize = 256;

impl TransferConfig {
    /// Upper bound of one encoded `file-chunk` frame.
    pub fn max_frame_len(&self) -> usize {
        (self.chunk_size as usize).div_ceil(3) * 4 + CHUNK_FRAME_OVERHEAD
    }

    /// Watermarks must leave room for a whole chunk frame, otherwise the
    /// sender can never make progress.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(TransferError::InvalidConfig(format!(
                "chunk size {} outside 1..={}",
                self.chunk_size, MAX_CHUNK_SIZE
            )));
        }
        if self.low_water_mark >= self.high_water_mark {
            return Err(TransferError::InvalidConfig(format!(
                "low water mark {} is not below high water mark {}",
                self.low_water_mark, self.high_water_mark
            )));
        }
        if self.high_water_mark < self.max_frame_len() {
            return Err(TransferError::InvalidConfig(format!(
                "high water mark {} cannot hold a {} byte chunk frame",
                self.high_water_mark,
                self.max_frame_len()
            )));
        }
        Ok(())
    }

    pub fn accept_timeout(&self) -> Duration {
        Duration::from_millis(self.accept_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: 16 * 1024,
            high_water_mark: 1024 * 1024,
            low_water_mark: 256 * 1024,
            accept_timeout_ms: 60_000,
            idle_timeout_ms: 15_000,
            max_incoming_file_bytes: 512 * 1024 * 1024,
        }
    }
}

/// ICE servers used for every peer connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: vec![DEFAULT_STUN_ADDR.to_owned(), DEFAULT_STUN_ADDR_2.to_owned()],
                username: None,
                credential: None,
            }],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    pub negotiation: NegotiationConfig,
    pub transfer: TransferConfig,
    pub quality: QualityPolicy,
    pub capture: CaptureConstraints,
    pub transport: TransportConfig,
}
