mod test_share_lifecycle;

use parley_client::media::{MediaTrack, TrackKind, TrackSource};
use parley_client::screen_share::{CaptureConstraints, QualityPolicy, ScreenShareController};
use std::sync::Arc;

use crate::utils::{MockSender, MockStats};

pub fn controller() -> (ScreenShareController, Arc<MockSender>, Arc<MockStats>) {
    let sender = Arc::new(MockSender::default());
    let stats = Arc::new(MockStats::default());
    let controller = ScreenShareController::new(
        QualityPolicy::default(),
        CaptureConstraints::default(),
        sender.clone(),
        stats.clone(),
    );
    (controller, sender, stats)
}

pub fn screen(width: u32, height: u32) -> MediaTrack {
    MediaTrack::new(TrackKind::Video, TrackSource::Screen).with_resolution(width, height)
}

pub fn camera() -> MediaTrack {
    MediaTrack::new(TrackKind::Video, TrackSource::Camera).with_resolution(1280, 720)
}
