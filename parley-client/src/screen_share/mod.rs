mod controller;
mod quality_state;

pub use controller::*;
pub use quality_state::*;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Capture envelope requested from the screen picker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptureConstraints {
    pub max_width: u32,
    pub max_height: u32,
    pub min_frame_rate: u32,
    pub max_frame_rate: u32,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
            min_frame_rate: 15,
            max_frame_rate: 30,
        }
    }
}

impl CaptureConstraints {
    /// Downscale needed to fit a `width`×`height` source into the envelope.
    /// `1.0` when it already fits.
    pub fn initial_scale(&self, width: u32, height: u32) -> f64 {
        if self.max_width == 0 || self.max_height == 0 {
            return 1.0;
        }
        let ratio = (f64::from(width) / f64::from(self.max_width))
            .max(f64::from(height) / f64::from(self.max_height));
        ratio.max(1.0)
    }
}

/// One rung of the encoder ladder; index 0 is the best quality.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QualityStep {
    pub max_bitrate_kbps: u32,
    pub scale_resolution_down_by: f64,
}

impl QualityStep {
    pub const fn new(max_bitrate_kbps: u32, scale_resolution_down_by: f64) -> Self {
        Self {
            max_bitrate_kbps,
            scale_resolution_down_by,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QualityPolicy {
    pub sample_interval_ms: u64,
    /// A sample above either bound steps quality down.
    pub degrade_loss_pct: f64,
    pub degrade_rtt_ms: u32,
    /// A sample below both bounds counts as good.
    pub good_loss_pct: f64,
    pub good_rtt_ms: u32,
    /// Consecutive good samples before stepping back up.
    pub good_samples_to_relax: u32,
    pub ladder: Vec<QualityStep>,
}

impl QualityPolicy {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.max(1))
    }

    pub fn lowest_level(&self) -> usize {
        self.ladder.len().saturating_sub(1)
    }
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self {
            sample_interval_ms: 3_000,
            degrade_loss_pct: 5.0,
            degrade_rtt_ms: 300,
            good_loss_pct: 2.0,
            good_rtt_ms: 150,
            good_samples_to_relax: 3,
            ladder: vec![
                QualityStep::new(2_500, 1.0),
                QualityStep::new(1_500, 1.0),
                QualityStep::new(1_000, 1.5),
                QualityStep::new(600, 2.0),
                QualityStep::new(300, 3.0),
            ],
        }
    }
}
