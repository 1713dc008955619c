use parley_client::screen_share::ShareState;
use std::time::Duration;
use tokio::sync::{oneshot, watch};

use super::{camera, controller, screen};
use crate::integration::init_tracing;
use crate::utils::{SenderOp, WAIT_TIMEOUT_MS, eventually};

#[tokio::test]
async fn test_track_end_reverts_to_camera() {
    init_tracing();

    let (controller, sender, _stats) = controller();
    let cam = camera();
    let (_camera_tx, camera_rx) = watch::channel(Some(cam.clone()));
    let (ended_tx, ended_rx) = oneshot::channel();

    let handle = controller
        .spawn(screen(1920, 1080), camera_rx, ended_rx)
        .await
        .unwrap();
    assert!(handle.state().borrow().is_sharing());

    ended_tx.send(()).unwrap();
    assert!(eventually(|| handle.is_finished()).await);

    assert_eq!(sender.last_track(), Some(cam));
    assert_eq!(sender.ops().last(), Some(&SenderOp::Encoding(None)));
    assert_eq!(*handle.state().borrow(), ShareState::Idle);
}

#[tokio::test]
async fn test_stop_uses_current_camera() {
    init_tracing();

    let (controller, sender, _stats) = controller();
    let (camera_tx, camera_rx) = watch::channel(None);
    let (_ended_tx, ended_rx) = oneshot::channel();

    let handle = controller
        .spawn(screen(1920, 1080), camera_rx, ended_rx)
        .await
        .unwrap();

    // Permission granted while sharing.
    let granted = camera();
    camera_tx.send_replace(Some(granted.clone()));

    handle.stop().await;
    assert_eq!(sender.last_track(), Some(granted));
    assert_eq!(sender.ops().last(), Some(&SenderOp::Encoding(None)));
}

#[tokio::test(start_paused = true)]
async fn test_samples_on_interval() {
    init_tracing();

    let (controller, _sender, stats) = controller();
    let (_camera_tx, camera_rx) = watch::channel(Some(camera()));
    let (_ended_tx, ended_rx) = oneshot::channel();
    stats.set(12.0, 80);

    let handle = controller
        .spawn(screen(1920, 1080), camera_rx, ended_rx)
        .await
        .unwrap();
    let mut state = handle.state();

    let degraded = tokio::time::timeout(
        Duration::from_millis(WAIT_TIMEOUT_MS * 5),
        state.wait_for(|s| s.quality().is_some_and(|q| q.level() == 1)),
    )
    .await
    .is_ok_and(|changed| changed.is_ok());
    assert!(degraded);

    handle.stop().await;
}
