pub mod control_tests;
pub mod negotiation_tests;
pub mod screen_share_tests;
pub mod transfer_tests;

use tracing::Level;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}
