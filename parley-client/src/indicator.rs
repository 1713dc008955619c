use crate::transport::PeerConnectionState;
use parley_core::ConnectionIndicator;

/// Colour shown for one connection state. `None` means the connection is
/// gone and should not count towards the aggregate.
pub fn indicator_for(state: PeerConnectionState) -> Option<ConnectionIndicator> {
    match state {
        PeerConnectionState::Connected => Some(ConnectionIndicator::Healthy),
        PeerConnectionState::New
        | PeerConnectionState::Connecting
        | PeerConnectionState::Disconnected => Some(ConnectionIndicator::Degraded),
        PeerConnectionState::Failed => Some(ConnectionIndicator::Failed),
        PeerConnectionState::Closed => None,
    }
}

fn severity(indicator: ConnectionIndicator) -> u8 {
    match indicator {
        ConnectionIndicator::Healthy => 0,
        ConnectionIndicator::Degraded => 1,
        ConnectionIndicator::Failed => 2,
    }
}

/// Worst state across all sessions; healthy when there are none.
pub fn aggregate<I>(indicators: I) -> ConnectionIndicator
where
    I: IntoIterator<Item = ConnectionIndicator>,
{
    indicators
        .into_iter()
        .max_by_key(|i| severity(*i))
        .unwrap_or(ConnectionIndicator::Healthy)
}
