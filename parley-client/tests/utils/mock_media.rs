use async_trait::async_trait;
use parley_client::MediaError;
use parley_client::background::BackgroundTransform;
use parley_client::media::{DeviceKind, MediaDevices, MediaTrack, TrackKind, TrackSource};
use parley_client::transport::StatsSource;
use parley_core::{StatsSample, VbgSettings};
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Devices whose permission can be flipped by the test.
#[derive(Default)]
pub struct MockDevices {
    granted: Mutex<HashSet<DeviceKind>>,
    requests: AtomicUsize,
}

impl MockDevices {
    pub fn granting_all() -> Self {
        let devices = Self::default();
        devices.grant(DeviceKind::Camera);
        devices.grant(DeviceKind::Microphone);
        devices
    }

    pub fn denying_all() -> Self {
        Self::default()
    }

    pub fn grant(&self, kind: DeviceKind) {
        self.granted.lock().unwrap().insert(kind);
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaDevices for MockDevices {
    async fn request(&self, kind: DeviceKind) -> Result<MediaTrack, MediaError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if !self.granted.lock().unwrap().contains(&kind) {
            return Err(MediaError::PermissionDenied(kind));
        }
        Ok(match kind {
            DeviceKind::Camera => {
                MediaTrack::new(TrackKind::Video, TrackSource::Camera).with_resolution(1280, 720)
            }
            DeviceKind::Microphone => MediaTrack::new(TrackKind::Audio, TrackSource::Microphone),
        })
    }
}

/// Transform that only records what it was asked to do.
#[derive(Default)]
pub struct MockTransform {
    applied: Mutex<Vec<(String, VbgSettings)>>,
    released: Mutex<Vec<String>>,
}

impl MockTransform {
    pub fn applied(&self) -> Vec<(String, VbgSettings)> {
        self.applied.lock().unwrap().clone()
    }

    pub fn released(&self) -> Vec<String> {
        self.released.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackgroundTransform for MockTransform {
    async fn apply(
        &self,
        source: &MediaTrack,
        settings: &VbgSettings,
    ) -> Result<MediaTrack, MediaError> {
        self.applied
            .lock()
            .unwrap()
            .push((source.id.clone(), settings.clone()));
        let mut processed = MediaTrack::new(source.kind, TrackSource::Processed);
        processed.width = source.width;
        processed.height = source.height;
        Ok(processed)
    }

    async fn release(&self, processed: &MediaTrack) {
        self.released.lock().unwrap().push(processed.id.clone());
    }
}

/// Stats source returning whatever the test last set.
#[derive(Default)]
pub struct MockStats {
    sample: Mutex<Option<StatsSample>>,
}

impl MockStats {
    pub fn set(&self, packet_loss_pct: f64, rtt_ms: u32) {
        *self.sample.lock().unwrap() = Some(StatsSample {
            packet_loss_pct,
            rtt_ms,
        });
    }
}

#[async_trait]
impl StatsSource for MockStats {
    async fn sample(&self) -> Option<StatsSample> {
        *self.sample.lock().unwrap()
    }
}
