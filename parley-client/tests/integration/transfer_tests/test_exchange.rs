use parley_client::control::{Direction, TransferEvent};
use parley_core::{ControlMessage, TransferStatus};
use parley_core::utils::CONTROL_CHANNEL_LABEL;

use super::{Side, payload, small_config};
use crate::integration::init_tracing;
use crate::utils::MockChannel;

#[tokio::test]
async fn test_file_arrives_intact() {
    init_tracing();

    let mut alice = Side::open(small_config(), MockChannel::new(CONTROL_CHANNEL_LABEL)).await;
    let mut bob = Side::open(small_config(), MockChannel::new(CONTROL_CHANNEL_LABEL)).await;

    let data = payload(2500);
    let file_id = alice
        .transfers
        .offer(&alice.mux, "notes.txt", Some("text/plain".into()), data.clone())
        .await
        .unwrap();
    assert_eq!(alice.transfers.status(&file_id), Some(TransferStatus::Offered));

    let events = bob.receive(alice.take_file_frames()).await;
    let [TransferEvent::Offered(offer)] = events.as_slice() else {
        panic!("expected an offer, got {events:?}");
    };
    assert_eq!(offer.size, 2500);
    assert_eq!(offer.total_chunks(), 3);

    bob.transfers.accept(&bob.mux, &file_id).await.unwrap();
    let sent = alice.receive(bob.take_file_frames()).await;
    assert_eq!(
        sent.last(),
        Some(&TransferEvent::Progress {
            file_id: file_id.clone(),
            direction: Direction::Outgoing,
            chunks_done: 3,
            total_chunks: 3,
        })
    );

    let received = bob.receive(alice.take_file_frames()).await;
    let Some(TransferEvent::Received(artifact)) = received.last() else {
        panic!("expected the file, got {received:?}");
    };
    assert_eq!(artifact.name, "notes.txt");
    assert_eq!(artifact.mime_type.as_deref(), Some("text/plain"));
    assert_eq!(artifact.bytes, data);
    assert!(bob.transfers.is_idle());

    let done = alice.receive(bob.take_file_frames()).await;
    assert_eq!(done, vec![TransferEvent::Sent(file_id)]);
    assert!(alice.transfers.is_idle());
}

#[tokio::test]
async fn test_declined_offer_reaches_sender() {
    init_tracing();

    let mut alice = Side::open(small_config(), MockChannel::new(CONTROL_CHANNEL_LABEL)).await;
    let mut bob = Side::open(small_config(), MockChannel::new(CONTROL_CHANNEL_LABEL)).await;

    let file_id = alice
        .transfers
        .offer(&alice.mux, "big.iso", None, payload(10))
        .await
        .unwrap();
    bob.receive(alice.take_file_frames()).await;
    bob.transfers
        .reject(&bob.mux, &file_id, "no thanks")
        .await
        .unwrap();

    let events = alice.receive(bob.take_file_frames()).await;
    assert_eq!(
        events,
        vec![TransferEvent::Rejected {
            file_id,
            direction: Direction::Outgoing,
            reason: "no thanks".to_owned(),
        }]
    );
    assert!(alice.transfers.is_idle());
}

#[tokio::test]
async fn test_cancel_mid_transfer_aborts_receiver() {
    init_tracing();

    let mut alice = Side::open(small_config(), MockChannel::slow(CONTROL_CHANNEL_LABEL)).await;
    let mut bob = Side::open(small_config(), MockChannel::new(CONTROL_CHANNEL_LABEL)).await;

    let file_id = alice
        .transfers
        .offer(&alice.mux, "video.mp4", None, payload(20_000))
        .await
        .unwrap();
    bob.receive(alice.take_file_frames()).await;
    bob.transfers.accept(&bob.mux, &file_id).await.unwrap();
    alice.receive(bob.take_file_frames()).await;
    bob.receive(alice.take_file_frames()).await;

    let cancelled = alice.transfers.cancel(&alice.mux, &file_id).await.unwrap();
    assert!(matches!(
        cancelled,
        TransferEvent::Aborted { direction: Direction::Outgoing, .. }
    ));

    let frames = alice.take_file_frames();
    assert!(matches!(frames.as_slice(), [ControlMessage::FileReject(_)]));
    let events = bob.receive(frames).await;
    assert_eq!(
        events,
        vec![TransferEvent::Aborted {
            file_id,
            direction: Direction::Incoming,
            reason: "cancelled".to_owned(),
        }]
    );
}
