use crate::screen_share::QualityPolicy;
use parley_core::{EncoderParams, StatsSample};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityDecision {
    Hold,
    Degrade,
    Relax,
}

/// Where the screen-share encoder sits on the ladder, with the last stats
/// sample it reacted to. Moves at most one step per sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityState {
    level: usize,
    good_streak: u32,
    /// Downscale the source needs regardless of network conditions.
    floor_scale: f64,
    last_sample_at: Option<Instant>,
    packet_loss_pct: f64,
    rtt_ms: u32,
    current: EncoderParams,
}

impl QualityState {
    pub fn new(policy: &QualityPolicy, floor_scale: f64) -> Self {
        let floor_scale = floor_scale.max(1.0);
        Self {
            level: 0,
            good_streak: 0,
            floor_scale,
            last_sample_at: None,
            packet_loss_pct: 0.0,
            rtt_ms: 0,
            current: step_params(policy, 0, floor_scale),
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn good_streak(&self) -> u32 {
        self.good_streak
    }

    /// When the last sample was evaluated; `None` before the first one.
    pub fn last_sample_at(&self) -> Option<Instant> {
        self.last_sample_at
    }

    pub fn packet_loss_pct(&self) -> f64 {
        self.packet_loss_pct
    }

    pub fn rtt_ms(&self) -> u32 {
        self.rtt_ms
    }

    pub fn current_max_bitrate_kbps(&self) -> u32 {
        self.current.max_bitrate_kbps
    }

    pub fn current_scale_factor(&self) -> f64 {
        self.current.scale_resolution_down_by
    }

    /// Encoder parameters of the current step.
    pub fn params(&self) -> EncoderParams {
        self.current
    }

    pub fn evaluate(&mut self, policy: &QualityPolicy, sample: &StatsSample) -> QualityDecision {
        self.last_sample_at = Some(Instant::now());
        self.packet_loss_pct = sample.packet_loss_pct;
        self.rtt_ms = sample.rtt_ms;

        let decision = self.decide(policy, sample);
        if decision != QualityDecision::Hold {
            self.current = step_params(policy, self.level, self.floor_scale);
        }
        decision
    }

    fn decide(&mut self, policy: &QualityPolicy, sample: &StatsSample) -> QualityDecision {
        let bad = sample.packet_loss_pct > policy.degrade_loss_pct
            || sample.rtt_ms > policy.degrade_rtt_ms;
        let good = sample.packet_loss_pct < policy.good_loss_pct
            && sample.rtt_ms < policy.good_rtt_ms;

        if bad {
            self.good_streak = 0;
            if self.level < policy.lowest_level() {
                self.level += 1;
                return QualityDecision::Degrade;
            }
            return QualityDecision::Hold;
        }

        if !good {
            self.good_streak = 0;
            return QualityDecision::Hold;
        }

        self.good_streak += 1;
        if self.level > 0 && self.good_streak >= policy.good_samples_to_relax {
            self.level -= 1;
            self.good_streak = 0;
            return QualityDecision::Relax;
        }
        QualityDecision::Hold
    }
}

fn step_params(policy: &QualityPolicy, level: usize, floor_scale: f64) -> EncoderParams {
    let (bitrate, scale) = policy
        .ladder
        .get(level)
        .map(|step| (step.max_bitrate_kbps, step.scale_resolution_down_by))
        .unwrap_or((0, 1.0));
    EncoderParams {
        max_bitrate_kbps: bitrate,
        scale_resolution_down_by: scale.max(floor_scale),
    }
}
