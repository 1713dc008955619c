use crate::error::NegotiationError;
use crate::session::{PeerSession, SessionEvent};
use crate::transport::PeerConnectionState;
use parley_core::{SignalEnvelope, SignalPayload};
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

/// How often transfer deadlines are checked.
const TRANSFER_TICK: Duration = Duration::from_secs(1);

impl PeerSession {
    pub(super) async fn run(mut self) {
        let mut transfer_tick = tokio::time::interval(TRANSFER_TICK);
        transfer_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let deadline = self.reconcile_deadline;
            let flow = tokio::select! {
                Some(event) = self.transport_rx.recv() => self.on_transport_event(event).await,
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.on_command(cmd).await,
                    None => ControlFlow::Break(()),
                },
                _ = sleep_until(deadline), if deadline.is_some() => self.on_reconcile_timeout().await,
                _ = transfer_tick.tick(), if !self.transfers.is_idle() => {
                    let events = self.transfers.check_timeouts(&self.mux, Instant::now()).await;
                    self.emit_transfers(events);
                    ControlFlow::Continue(())
                }
            };

            if flow.is_break() {
                break;
            }

            if let Some(deferred) = self.negotiator.take_deferred() {
                if self.negotiate(deferred.ice_restart).await.is_break() {
                    break;
                }
            }
        }

        self.shutdown().await;
    }

    pub(super) async fn negotiate(&mut self, ice_restart: bool) -> ControlFlow<()> {
        match self.negotiator.on_negotiation_needed(ice_restart).await {
            Ok(Some(offer)) => {
                self.send_signal(SignalPayload::Offer(offer)).await;
                ControlFlow::Continue(())
            }
            Ok(None) => ControlFlow::Continue(()),
            Err(e) => self.abandon(e),
        }
    }

    /// Gives up on this connection attempt and asks the host to rejoin.
    pub(super) fn abandon(&mut self, e: NegotiationError) -> ControlFlow<()> {
        error!(peer = %self.remote, "Negotiation failed, abandoning connection: {}", e);
        self.emit(SessionEvent::RejoinRequired(e.to_string()));
        ControlFlow::Break(())
    }

    pub(super) async fn send_signal(&self, payload: SignalPayload) {
        let envelope = SignalEnvelope::new(self.room_id.clone(), self.local.clone(), payload)
            .to(self.remote.clone());
        if let Err(e) = self.signal.signal(envelope).await {
            warn!(peer = %self.remote, "Signal not delivered: {}", e);
        }
    }

    /// The reconciliation window passed without the connection recovering.
    async fn on_reconcile_timeout(&mut self) -> ControlFlow<()> {
        self.reconcile_deadline = None;
        if self.connection != PeerConnectionState::Disconnected {
            return ControlFlow::Continue(());
        }

        let budget = self.config.negotiation.max_ice_restarts;
        if self.ice_restarts < budget {
            self.ice_restarts += 1;
            info!(
                peer = %self.remote,
                attempt = self.ice_restarts,
                budget,
                "Connection did not recover, restarting ICE"
            );
            self.reconcile_deadline =
                Some(Instant::now() + self.config.negotiation.reconciliation_window());
            return self.negotiate(true).await;
        }

        error!(peer = %self.remote, "Connection did not recover, giving up");
        self.connection = PeerConnectionState::Failed;
        self.emit(SessionEvent::ConnectionState(PeerConnectionState::Failed));
        self.emit(SessionEvent::RejoinRequired(format!(
            "connection did not recover after {} ICE restarts",
            budget
        )));
        ControlFlow::Break(())
    }

    async fn shutdown(mut self) {
        let events = self.transfers.abort_all("session closed");
        self.emit_transfers(events);

        if let Some(channel) = self.mux.channel() {
            channel.close().await;
        }
        self.mux.on_closed();

        if let Err(e) = self.transport.close().await {
            warn!(peer = %self.remote, "Closing peer connection failed: {}", e);
        }

        info!(peer = %self.remote, "Peer session closed");
        self.emit(SessionEvent::Closed);
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
