use crate::control::{ControlEvent, ControlMux, TransferEvent};
use crate::session::{PeerSession, SessionEvent};
use crate::transport::{PeerConnectionState, TransportEvent};
use parley_core::{ControlMessage, SignalPayload};
use std::ops::ControlFlow;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

impl PeerSession {
    pub(super) async fn on_transport_event(&mut self, event: TransportEvent) -> ControlFlow<()> {
        match event {
            TransportEvent::NegotiationNeeded => return self.negotiate(false).await,
            TransportEvent::LocalCandidate(candidate) => {
                self.send_signal(SignalPayload::Ice(candidate)).await;
            }
            TransportEvent::ConnectionState(state) => return self.on_connection_state(state),
            TransportEvent::ControlOpen(channel) => {
                if let Err(e) = self.mux.on_open(channel).await {
                    warn!(peer = %self.remote, "Publishing state on open failed: {}", e);
                }
                self.transfers.on_channel_open(&self.mux).await;
                self.emit(SessionEvent::Control(ControlEvent::Opened));
            }
            TransportEvent::ControlMessage(text) => self.on_control_message(&text).await,
            TransportEvent::ControlClosed => {
                self.mux.on_closed();
                let events = self.transfers.abort_all("control channel closed");
                self.emit_transfers(events);
            }
            TransportEvent::BufferedAmountLow => match self.transfers.pump(&self.mux).await {
                Ok(events) => self.emit_transfers(events),
                Err(e) => warn!(peer = %self.remote, "Resuming transfer failed: {}", e),
            },
            TransportEvent::RemoteTrack(track) => {
                debug!(peer = %self.remote, track = %track.id, "Remote track");
                self.emit(SessionEvent::RemoteTrack(track));
            }
        }
        ControlFlow::Continue(())
    }

    fn on_connection_state(&mut self, state: PeerConnectionState) -> ControlFlow<()> {
        if state == self.connection {
            return ControlFlow::Continue(());
        }
        let previous = self.connection;
        self.connection = state;

        match state {
            PeerConnectionState::Connected => {
                info!(peer = %self.remote, "Peer connected");
                self.reconcile_deadline = None;
                self.ice_restarts = 0;
            }
            PeerConnectionState::Disconnected => {
                let window = self.config.negotiation.reconciliation_window();
                warn!(peer = %self.remote, ?window, "Peer disconnected, waiting for recovery");
                self.reconcile_deadline = Some(Instant::now() + window);
            }
            PeerConnectionState::Failed => {
                error!(peer = %self.remote, ?previous, "Peer connection failed");
                self.reconcile_deadline = None;
            }
            PeerConnectionState::Closed => {
                info!(peer = %self.remote, "Peer connection closed by transport");
                self.emit(SessionEvent::ConnectionState(state));
                return ControlFlow::Break(());
            }
            PeerConnectionState::New | PeerConnectionState::Connecting => {}
        }

        self.emit(SessionEvent::ConnectionState(state));
        ControlFlow::Continue(())
    }

    async fn on_control_message(&mut self, text: &str) {
        let msg = match ControlMux::decode(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(peer = %self.remote, "Dropping invalid control frame: {}", e);
                return;
            }
        };

        let event = match msg {
            ControlMessage::Chat(chat) => ControlEvent::Chat(chat),
            ControlMessage::DeviceState(state) => ControlEvent::DeviceState(state),
            ControlMessage::Whiteboard(wb) => ControlEvent::Whiteboard(wb),
            ControlMessage::VbgSettings(settings) => ControlEvent::Background(settings),
            transfer => {
                match self.transfers.on_message(&self.mux, transfer).await {
                    Ok(events) => self.emit_transfers(events),
                    Err(e) => warn!(peer = %self.remote, "Transfer frame failed: {}", e),
                }
                return;
            }
        };
        self.emit(SessionEvent::Control(event));
    }

    pub(super) fn emit_transfers(&self, events: Vec<TransferEvent>) {
        for event in events {
            self.emit(SessionEvent::Control(ControlEvent::Transfer(event)));
        }
    }
}
