use crate::call::{CallEngine, CallEvent};
use parley_core::{SignalEnvelope, SignalPayload};
use std::ops::ControlFlow;
use tracing::{info, warn};

impl CallEngine {
    pub(super) async fn run(mut self) {
        info!(room = %self.room_id, peer = %self.local, "Call engine started");

        loop {
            let flow = tokio::select! {
                event = self.relay_rx.recv(), if self.relay_open => match event {
                    Some(event) => self.on_relay_event(event).await,
                    None => {
                        warn!(room = %self.room_id, "Relay connection lost");
                        self.relay_open = false;
                        self.emit(CallEvent::RelayDisconnected);
                        ControlFlow::Continue(())
                    }
                },
                Some(update) = self.session_rx.recv() => self.on_session_update(update).await,
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.on_command(cmd).await,
                    None => {
                        self.leave_room().await;
                        ControlFlow::Break(())
                    }
                },
            };

            if flow.is_break() {
                break;
            }
        }

        info!(room = %self.room_id, peer = %self.local, "Call engine finished");
    }

    /// Stops sharing, closes every session and tells the relay.
    pub(super) async fn leave_room(&mut self) {
        self.teardown().await;
        let leave = SignalEnvelope::new(self.room_id.clone(), self.local.clone(), SignalPayload::Leave);
        if let Err(e) = self.deps.signal.signal(leave).await {
            warn!(room = %self.room_id, "Leave not delivered: {}", e);
        }
        self.emit(CallEvent::Left);
    }

    pub(super) async fn teardown(&mut self) {
        if let Some(share) = self.screen_share.take() {
            share.stop().await;
        }
        self.close_all_sessions().await;
        self.camera_pipeline.release().await;
    }
}
