mod local_media;

pub use local_media::*;

use crate::error::MediaError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Camera,
    Microphone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSource {
    Camera,
    Microphone,
    Screen,
    /// Silent/black stand-in used while a device is unavailable.
    Placeholder,
    /// Output of a background transform.
    Processed,
    Remote,
}

/// Handle to a media track. Frames never pass through this crate; the host
/// resolves the handle to its capture or render pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaTrack {
    pub id: String,
    pub kind: TrackKind,
    pub source: TrackSource,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl MediaTrack {
    pub fn new(kind: TrackKind, source: TrackSource) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            source,
            width: None,
            height: None,
        }
    }

    pub fn placeholder(kind: TrackKind) -> Self {
        Self::new(kind, TrackSource::Placeholder)
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn is_placeholder(&self) -> bool {
        self.source == TrackSource::Placeholder
    }
}

/// Camera and microphone access. Every call may prompt the user.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn request(&self, kind: DeviceKind) -> Result<MediaTrack, MediaError>;
}
