use crate::error::MediaError;
use crate::media::{DeviceKind, MediaDevices, MediaTrack, TrackKind};
use parley_core::DeviceState;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
struct DeviceSlot {
    track: MediaTrack,
    enabled: bool,
}

impl DeviceSlot {
    fn acquired(result: Result<MediaTrack, MediaError>, kind: DeviceKind) -> Self {
        match result {
            Ok(track) => Self {
                track,
                enabled: true,
            },
            Err(e) => {
                // Joining continues on a placeholder; the toggle asks again.
                warn!("{:?} unavailable, using placeholder: {}", kind, e);
                Self {
                    track: MediaTrack::placeholder(track_kind(kind)),
                    enabled: false,
                }
            }
        }
    }
}

fn track_kind(kind: DeviceKind) -> TrackKind {
    match kind {
        DeviceKind::Camera => TrackKind::Video,
        DeviceKind::Microphone => TrackKind::Audio,
    }
}

/// Result of a device toggle the caller has to propagate.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceToggle {
    pub kind: DeviceKind,
    pub enabled: bool,
    /// Set when a real track replaced the placeholder.
    pub new_track: Option<MediaTrack>,
}

/// Local camera and microphone.
pub struct LocalMedia {
    devices: Arc<dyn MediaDevices>,
    camera: DeviceSlot,
    microphone: DeviceSlot,
}

impl LocalMedia {
    /// Requests both devices. Denials never fail this call.
    pub async fn acquire(devices: Arc<dyn MediaDevices>) -> Self {
        let camera = DeviceSlot::acquired(devices.request(DeviceKind::Camera).await, DeviceKind::Camera);
        let microphone = DeviceSlot::acquired(
            devices.request(DeviceKind::Microphone).await,
            DeviceKind::Microphone,
        );

        Self {
            devices,
            camera,
            microphone,
        }
    }

    fn slot(&self, kind: DeviceKind) -> &DeviceSlot {
        match kind {
            DeviceKind::Camera => &self.camera,
            DeviceKind::Microphone => &self.microphone,
        }
    }

    fn slot_mut(&mut self, kind: DeviceKind) -> &mut DeviceSlot {
        match kind {
            DeviceKind::Camera => &mut self.camera,
            DeviceKind::Microphone => &mut self.microphone,
        }
    }

    pub fn track(&self, kind: DeviceKind) -> &MediaTrack {
        &self.slot(kind).track
    }

    pub fn is_enabled(&self, kind: DeviceKind) -> bool {
        self.slot(kind).enabled
    }

    pub fn device_state(&self, virtual_background_enabled: bool) -> DeviceState {
        DeviceState {
            camera_enabled: self.camera.enabled,
            mic_enabled: self.microphone.enabled,
            virtual_background_enabled,
        }
    }

    /// Turns a device on or off. Enabling a device that never got a real
    /// track asks for permission again, right now.
    pub async fn set_enabled(
        &mut self,
        kind: DeviceKind,
        enabled: bool,
    ) -> Result<DeviceToggle, MediaError> {
        let mut new_track = None;

        if enabled && self.slot(kind).track.is_placeholder() {
            let track = self.devices.request(kind).await?;
            info!("{:?} granted on retry", kind);
            self.slot_mut(kind).track = track.clone();
            new_track = Some(track);
        }

        self.slot_mut(kind).enabled = enabled;
        Ok(DeviceToggle {
            kind,
            enabled,
            new_track,
        })
    }
}
