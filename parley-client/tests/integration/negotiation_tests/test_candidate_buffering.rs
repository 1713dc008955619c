use parley_client::negotiation::Negotiator;
use parley_core::{IceCandidate, PeerId, SessionDescription};

use crate::integration::init_tracing;
use crate::utils::{MockTransport, TEST_SDP};

fn candidate(n: u8) -> IceCandidate {
    IceCandidate {
        candidate: format!("candidate:{n} 1 udp 2122260223 10.0.0.{n} 5000 typ host"),
        sdp_mid: Some("0".to_owned()),
        sdp_m_line_index: Some(0),
        username_fragment: None,
    }
}

#[tokio::test]
async fn test_early_candidates_wait_for_remote_description() {
    init_tracing();

    let transport = MockTransport::detached("a");
    let mut b = Negotiator::new(PeerId::from("b"), PeerId::from("a"), transport.clone());

    b.on_remote_candidate(candidate(1)).await;
    b.on_remote_candidate(candidate(2)).await;
    assert_eq!(b.pending_candidates(), 2);
    assert!(transport.candidates().is_empty());

    let answer = b
        .on_remote_description(SessionDescription::offer(TEST_SDP))
        .await
        .unwrap();
    assert!(answer.is_some());

    assert_eq!(b.pending_candidates(), 0);
    assert_eq!(transport.candidates(), vec![candidate(1), candidate(2)]);

    // Later candidates go straight through.
    b.on_remote_candidate(candidate(3)).await;
    assert_eq!(transport.candidates().len(), 3);
}
