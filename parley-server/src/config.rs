use parley_core::IceServerConfig;
use parley_core::utils::{DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RelayConfig {
    /// How long a dropped push channel may stay away before the peer is removed.
    pub disconnect_grace_ms: u64,
    pub max_peers_per_room: usize,
    /// Events buffered per subscriber; overflowing it closes the push channel.
    pub push_buffer: usize,
    pub room_command_buffer: usize,
    /// Handed to clients so they can build their peer connections.
    pub ice_servers: Vec<IceServerConfig>,
}

impl RelayConfig {
    /// Rejects settings the relay cannot run with: zero-sized queues panic
    /// on creation and a zero room cap admits nobody.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_peers_per_room == 0 {
            return Err(ConfigError::Zero("maxPeersPerRoom"));
        }
        if self.push_buffer == 0 {
            return Err(ConfigError::Zero("pushBuffer"));
        }
        if self.room_command_buffer == 0 {
            return Err(ConfigError::Zero("roomCommandBuffer"));
        }
        Ok(())
    }

    pub fn disconnect_grace(&self) -> Duration {
        Duration::from_millis(self.disconnect_grace_ms)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            disconnect_grace_ms: 5_000,
            max_peers_per_room: 8,
            push_buffer: 256,
            room_command_buffer: 100,
            ice_servers: vec![IceServerConfig {
                urls: vec![DEFAULT_STUN_ADDR.to_owned(), DEFAULT_STUN_ADDR_2.to_owned()],
                username: None,
                credential: None,
            }],
        }
    }
}
