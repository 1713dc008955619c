use serde::{Deserialize, Serialize};

/// Tri-state indicator exposed to the host UI.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionIndicator {
    Healthy,
    Degraded,
    Failed,
}

/// Encoder parameters applied to the outbound screen-share sender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EncoderParams {
    pub max_bitrate_kbps: u32,
    pub scale_resolution_down_by: f64,
}

/// One reading of the outbound transport statistics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatsSample {
    pub packet_loss_pct: f64,
    pub rtt_ms: u32,
}
