pub mod mock_channel;
pub mod mock_media;

pub use mock_channel::*;
pub use mock_media::*;
pub use mock_signal::*;
pub use mock_transport::*;

use std::time::Duration;

/// Timeout for anything the tests wait on (ms).
pub const WAIT_TIMEOUT_MS: u64 = 2000;

pub const TEST_SDP: &str = "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n";

/// Polls `check` until it holds or the timeout passes.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(WAIT_TIMEOUT_MS);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
