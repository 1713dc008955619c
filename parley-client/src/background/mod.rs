use crate::error::MediaError;
use crate::media::MediaTrack;
use async_trait::async_trait;
use parley_core::VbgSettings;
use std::sync::Arc;
use tracing::{debug, info};

/// Runs a segmentation effect over a video track. The same implementation
/// serves the local camera and the tracks received from peers.
#[async_trait]
pub trait BackgroundTransform: Send + Sync {
    /// Starts processing `source` and returns the processed track.
    async fn apply(
        &self,
        source: &MediaTrack,
        settings: &VbgSettings,
    ) -> Result<MediaTrack, MediaError>;

    /// Stops producing `processed`.
    async fn release(&self, processed: &MediaTrack);
}

/// One video track and the effect currently applied to it.
pub struct BackgroundPipeline {
    transform: Arc<dyn BackgroundTransform>,
    source: MediaTrack,
    settings: VbgSettings,
    processed: Option<MediaTrack>,
}

impl BackgroundPipeline {
    pub fn new(transform: Arc<dyn BackgroundTransform>, source: MediaTrack) -> Self {
        Self {
            transform,
            source,
            settings: VbgSettings::none(),
            processed: None,
        }
    }

    pub fn settings(&self) -> &VbgSettings {
        &self.settings
    }

    pub fn source(&self) -> &MediaTrack {
        &self.source
    }

    /// Track to send or render: the processed one while an effect is active.
    pub fn output(&self) -> &MediaTrack {
        self.processed.as_ref().unwrap_or(&self.source)
    }

    pub fn is_active(&self) -> bool {
        self.processed.is_some()
    }

    /// Switches the effect. Returns the new output track, or `None` when
    /// nothing changed.
    pub async fn apply(&mut self, settings: VbgSettings) -> Result<Option<MediaTrack>, MediaError> {
        if settings == self.settings {
            return Ok(None);
        }

        if !settings.mode.is_active() {
            self.release().await;
            self.settings = settings;
            debug!(track = %self.source.id, "Background effect off");
            return Ok(Some(self.source.clone()));
        }

        let processed = self.transform.apply(&self.source, &settings).await?;
        if let Some(old) = self.processed.replace(processed.clone()) {
            self.transform.release(&old).await;
        }
        info!(track = %self.source.id, mode = ?settings.mode, "Background effect applied");
        self.settings = settings;
        Ok(Some(processed))
    }

    /// Swaps the raw input, e.g. after a camera permission is granted late.
    /// The active effect is carried over to the new source.
    pub async fn set_source(&mut self, source: MediaTrack) -> Result<MediaTrack, MediaError> {
        self.source = source;
        if !self.settings.mode.is_active() {
            return Ok(self.source.clone());
        }

        let processed = self.transform.apply(&self.source, &self.settings).await?;
        if let Some(old) = self.processed.replace(processed.clone()) {
            self.transform.release(&old).await;
        }
        Ok(processed)
    }

    pub async fn release(&mut self) {
        if let Some(processed) = self.processed.take() {
            self.transform.release(&processed).await;
        }
    }
}
