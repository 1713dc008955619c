use crate::background::BackgroundPipeline;
use crate::call::{CallEngine, CallEvent};
use crate::control::ControlEvent;
use crate::indicator::indicator_for;
use crate::media::{MediaTrack, TrackKind};
use crate::session::{SessionCommand, SessionEvent, SessionUpdate};
use parley_core::{PeerId, VbgSettings, WhiteboardMessage};
use std::ops::ControlFlow;
use tracing::{debug, warn};

impl CallEngine {
    pub(super) async fn on_session_update(&mut self, update: SessionUpdate) -> ControlFlow<()> {
        let SessionUpdate { remote, event } = update;
        match event {
            SessionEvent::ConnectionState(state) => {
                if self.sessions.contains_key(&remote) {
                    self.set_indicator(&remote, indicator_for(state));
                }
                self.emit(CallEvent::PeerConnection {
                    peer_id: remote,
                    state,
                });
            }
            SessionEvent::Control(event) => self.on_control_event(remote, event).await,
            SessionEvent::RemoteTrack(track) => match track.kind {
                TrackKind::Video => self.on_remote_video(remote, track).await,
                TrackKind::Audio => self.emit(CallEvent::RemoteAudio {
                    peer_id: remote,
                    track,
                }),
            },
            SessionEvent::RejoinRequired(reason) => {
                self.close_session(&remote).await;
                self.emit(CallEvent::RejoinRequired {
                    peer_id: remote,
                    reason,
                });
            }
            SessionEvent::Closed => {
                if self.sessions.get(&remote).is_some_and(|s| s.is_finished()) {
                    debug!(peer = %remote, "Session ended on its own");
                    self.close_session(&remote).await;
                }
            }
        }
        ControlFlow::Continue(())
    }

    async fn on_control_event(&mut self, remote: PeerId, event: ControlEvent) {
        match event {
            ControlEvent::Opened => {
                // Catch up on a board that was drawn on before we arrived.
                if self.whiteboard.is_empty() {
                    self.send_to(&remote, SessionCommand::Whiteboard(WhiteboardMessage::SnapshotRequest))
                        .await;
                }
            }
            ControlEvent::Chat(message) => self.emit(CallEvent::Chat {
                from: remote,
                message,
            }),
            ControlEvent::DeviceState(state) => self.emit(CallEvent::RemoteDeviceState {
                peer_id: remote,
                state,
            }),
            ControlEvent::Whiteboard(msg) => self.on_whiteboard(remote, msg).await,
            ControlEvent::Background(settings) => self.on_remote_background(remote, settings).await,
            ControlEvent::Transfer(event) => self.emit(CallEvent::Transfer {
                peer_id: remote,
                event,
            }),
        }
    }

    async fn on_whiteboard(&mut self, remote: PeerId, msg: WhiteboardMessage) {
        match msg {
            WhiteboardMessage::Op { op } => {
                self.whiteboard.apply(&op);
                self.emit(CallEvent::Whiteboard(op));
            }
            WhiteboardMessage::SnapshotRequest => {
                let ops = self.whiteboard.snapshot();
                self.send_to(&remote, SessionCommand::Whiteboard(WhiteboardMessage::Snapshot { ops }))
                    .await;
            }
            WhiteboardMessage::Snapshot { ops } => {
                if !self.whiteboard.is_empty() || ops.is_empty() {
                    return;
                }
                self.whiteboard.load(&ops);
                self.emit(CallEvent::WhiteboardReset(self.whiteboard.snapshot()));
            }
        }
    }

    async fn on_remote_video(&mut self, remote: PeerId, track: MediaTrack) {
        let mut pipeline = BackgroundPipeline::new(self.deps.transform.clone(), track);
        if let Some(settings) = self.remote_backgrounds.get(&remote).cloned() {
            if let Err(e) = pipeline.apply(settings).await {
                warn!(peer = %remote, "Remote background effect failed: {}", e);
            }
        }

        let output = pipeline.output().clone();
        if let Some(mut old) = self.remote_pipelines.insert(remote.clone(), pipeline) {
            old.release().await;
        }
        self.emit(CallEvent::RemoteVideo {
            peer_id: remote,
            track: output,
        });
    }

    /// Mirrors the effect the remote peer applies to its own camera onto the
    /// track we render for it.
    async fn on_remote_background(&mut self, remote: PeerId, settings: VbgSettings) {
        self.remote_backgrounds.insert(remote.clone(), settings.clone());
        let Some(pipeline) = self.remote_pipelines.get_mut(&remote) else {
            return;
        };

        match pipeline.apply(settings).await {
            Ok(Some(track)) => self.emit(CallEvent::RemoteVideo {
                peer_id: remote,
                track,
            }),
            Ok(None) => debug!(peer = %remote, "Remote background unchanged"),
            Err(e) => warn!(peer = %remote, "Remote background effect failed: {}", e),
        }
    }

    pub(super) async fn send_to(&self, remote: &PeerId, cmd: SessionCommand) {
        let Some(session) = self.sessions.get(remote) else {
            return;
        };
        if let Err(e) = session.send(cmd).await {
            warn!(peer = %remote, "Session unavailable: {}", e);
        }
    }
}
