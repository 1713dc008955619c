use crate::error::WireError;
use crate::model::background::VbgSettings;
use crate::model::transfer::{FileAck, FileChunk, FileOffer, FileReject};
use crate::model::whiteboard::{WhiteboardMessage, WhiteboardOp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound for a single chunk; keeps one frame well below SCTP limits.
pub const MAX_CHUNK_SIZE: u32 = 64 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub sender_display_name: String,
}

impl ChatMessage {
    pub fn new(text: impl Into<String>, sender_display_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            timestamp: Utc::now(),
            sender_display_name: sender_display_name.into(),
        }
    }
}

/// Local device toggles mirrored to the remote side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    pub camera_enabled: bool,
    pub mic_enabled: bool,
    pub virtual_background_enabled: bool,
}

/// Frame on the control channel: `{"tag": ..., "body": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "tag", content = "body", rename_all = "kebab-case")]
pub enum ControlMessage {
    Chat(ChatMessage),
    Whiteboard(WhiteboardMessage),
    DeviceState(DeviceState),
    VbgSettings(VbgSettings),
    FileOffer(FileOffer),
    FileChunk(FileChunk),
    FileAck(FileAck),
    FileReject(FileReject),
}

impl ControlMessage {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Chat(_) => "chat",
            Self::Whiteboard(_) => "whiteboard",
            Self::DeviceState(_) => "device-state",
            Self::VbgSettings(_) => "vbg-settings",
            Self::FileOffer(_) => "file-offer",
            Self::FileChunk(_) => "file-chunk",
            Self::FileAck(_) => "file-ack",
            Self::FileReject(_) => "file-reject",
        }
    }

    pub fn encode(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses and validates one frame.
    pub fn decode(text: &str) -> Result<Self, WireError> {
        let msg: Self = serde_json::from_str(text)?;
        msg.validate()?;
        Ok(msg)
    }

    fn validate(&self) -> Result<(), WireError> {
        match self {
            Self::FileOffer(offer) => {
                if offer.chunk_size == 0 || offer.chunk_size > MAX_CHUNK_SIZE {
                    return Err(WireError::invalid(
                        "chunkSize",
                        format!("{} outside 1..={}", offer.chunk_size, MAX_CHUNK_SIZE),
                    ));
                }
                if offer.name.trim().is_empty() {
                    return Err(WireError::Missing("name"));
                }
            }
            Self::FileChunk(chunk) => {
                if chunk.bytes.len() > MAX_CHUNK_SIZE as usize {
                    return Err(WireError::invalid("bytes", "chunk larger than limit"));
                }
            }
            Self::Whiteboard(WhiteboardMessage::Op {
                op: WhiteboardOp::Stroke { points, width, .. },
            }) => {
                if points.is_empty() {
                    return Err(WireError::invalid("points", "stroke without points"));
                }
                if !width.is_finite() || *width <= 0.0 {
                    return Err(WireError::invalid("width", width.to_string()));
                }
            }
            _ => {}
        }
        Ok(())
    }
}
