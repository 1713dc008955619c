use parley_client::config::TransferConfig;
use parley_client::control::TransferEvent;
use parley_core::utils::CONTROL_CHANNEL_LABEL;

use super::{Side, payload, small_config};
use crate::integration::init_tracing;
use crate::utils::MockChannel;

#[tokio::test]
async fn test_sender_never_exceeds_high_water_mark() {
    init_tracing();

    let config = small_config();
    let high_water = config.high_water_mark;
    let mut alice = Side::open(config.clone(), MockChannel::slow(CONTROL_CHANNEL_LABEL)).await;
    let mut bob = Side::open(config, MockChannel::new(CONTROL_CHANNEL_LABEL)).await;
    assert_eq!(alice.channel.low_water(), 1000);

    let data = payload(20_000);
    let file_id = alice
        .transfers
        .offer(&alice.mux, "video.mp4", None, data.clone())
        .await
        .unwrap();
    bob.receive(alice.take_file_frames()).await;
    bob.transfers.accept(&bob.mux, &file_id).await.unwrap();
    alice.receive(bob.take_file_frames()).await;

    // The first burst stops well before the whole file.
    let first_burst = alice.take_file_frames();
    assert!(!first_burst.is_empty());
    assert!(first_burst.len() < 20);
    assert!(alice.channel.peak() <= high_water);

    let mut received = bob.receive(first_burst).await;
    let mut rounds = 0;
    while !received
        .iter()
        .any(|e| matches!(e, TransferEvent::Received(_)))
    {
        rounds += 1;
        assert!(rounds < 50, "transfer did not finish");

        // Buffered-amount-low fires and the pump resumes.
        alice.channel.drain_all();
        alice.transfers.pump(&alice.mux).await.unwrap();
        assert!(alice.channel.peak() <= high_water);
        received = bob.receive(alice.take_file_frames()).await;
    }

    assert!(rounds > 1);
    let Some(TransferEvent::Received(artifact)) = received.last() else {
        unreachable!();
    };
    assert_eq!(artifact.bytes, data);
}

#[tokio::test]
async fn test_frame_above_high_water_still_progresses() {
    init_tracing();

    // Each encoded chunk is bigger than the high water mark.
    let config = TransferConfig {
        chunk_size: 1000,
        high_water_mark: 500,
        low_water_mark: 100,
        ..TransferConfig::default()
    };
    assert!(config.validate().is_err());

    let mut alice = Side::open(config.clone(), MockChannel::slow(CONTROL_CHANNEL_LABEL)).await;
    let mut bob = Side::open(config, MockChannel::new(CONTROL_CHANNEL_LABEL)).await;

    let data = payload(3_000);
    let file_id = alice
        .transfers
        .offer(&alice.mux, "notes.pdf", None, data.clone())
        .await
        .unwrap();
    bob.receive(alice.take_file_frames()).await;
    bob.transfers.accept(&bob.mux, &file_id).await.unwrap();
    alice.receive(bob.take_file_frames()).await;

    // One frame per drained buffer.
    let mut received = Vec::new();
    for _ in 0..3 {
        let burst = alice.take_file_frames();
        assert_eq!(burst.len(), 1);
        received = bob.receive(burst).await;
        alice.channel.drain_all();
        alice.transfers.pump(&alice.mux).await.unwrap();
    }

    let Some(TransferEvent::Received(artifact)) = received.last() else {
        panic!("file not delivered: {:?}", received);
    };
    assert_eq!(artifact.bytes, data);
}
